use coaching_tracker::config::AppConfig;
use coaching_tracker::env::load_environment;
use coaching_tracker::telemetry::init_tracing;
use coaching_tracker::{Error, init_rocket};
use tracing::{info, warn};

#[rocket::main]
async fn main() -> Result<(), Error> {
    let env_files = load_environment();
    let _telemetry = init_tracing();

    match env_files {
        Ok(files) => {
            for file in &files.loaded {
                info!("Loaded environment from: {}", file.display());
            }
            for file in &files.missing {
                warn!("Environment file not found, skipping: {}", file.display());
            }
        }
        Err(e) => warn!("Failed to load environment files: {}", e),
    }

    let config = AppConfig::from_env()?;

    // Lazy: an unreachable store surfaces in the schema initializer, not here.
    let pool = config.connect_pool()?;

    init_rocket(config, pool)?.launch().await?;

    Ok(())
}
