use anyhow::{Context, bail};
use coaching_tracker::config::AppConfig;
use coaching_tracker::database::{ensure_schema, verify_schema};
use coaching_tracker::env::load_environment;
use sqlx::PgPool;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_environment().context("Failed to load environment files")?;
    let _telemetry = coaching_tracker::telemetry::init_tracing();

    let init = std::env::args().skip(1).any(|arg| arg == "--init");

    let config = AppConfig::from_env().context("Failed to read configuration")?;
    let pool = PgPool::connect_with(config.connect_options()?)
        .await
        .context("Failed to connect to the database")?;

    if init {
        let outcome = ensure_schema(&pool).await;
        println!("Schema initialization: {:?}", outcome);
    }

    let report = verify_schema(&pool).await?;
    pool.close().await;

    for table in &report.tables_found {
        println!("    Table present: {}", table);
    }

    if report.is_complete() {
        println!("Schema matches ✓");
        return Ok(());
    }

    println!("Schema problems detected:");
    for problem in &report.problems {
        println!("    {}", problem);
    }

    bail!("{} schema problem(s) found", report.problems.len())
}
