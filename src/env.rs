use std::path::{Path, PathBuf};

/// Env files found and skipped by [`load_environment`], in precedence order.
#[derive(Debug, Default)]
pub struct EnvFiles {
    pub loaded: Vec<PathBuf>,
    pub missing: Vec<PathBuf>,
}

/// Loads the layered env files from the working directory.
///
/// Runs before tracing is initialised so that `RUST_LOG` and the OTLP
/// variables can come from these files; the caller logs the result.
pub fn load_environment() -> Result<EnvFiles, dotenvy::Error> {
    load_environment_from(Path::new("."))
}

/// Precedence, highest first: the process environment, `.secrets.env`,
/// the per-environment file, `config/common.env`. A file never replaces a
/// variable that is already set.
pub fn load_environment_from(root: &Path) -> Result<EnvFiles, dotenvy::Error> {
    let is_production =
        dotenvy::var("APP_ENV").unwrap_or("development".to_string()) == "production";

    let env_files = if is_production {
        [".secrets.env", "config/prod.env", "config/common.env"]
    } else {
        [".secrets.env", "config/dev.env", "config/common.env"]
    };

    let mut files = EnvFiles::default();
    for env_file in env_files {
        let path = root.join(env_file);
        if load_env_file(&path)? {
            files.loaded.push(path);
        } else {
            files.missing.push(path);
        }
    }

    Ok(files)
}

fn load_env_file(path: &Path) -> Result<bool, dotenvy::Error> {
    if !path.exists() {
        return Ok(false);
    }

    dotenvy::from_filename(path)?;
    Ok(true)
}
