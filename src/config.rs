use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;
use std::time::Duration;

use rocket::figment::{Figment, providers::Env};
use serde::Deserialize;
use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};
use tracing::warn;

use crate::error::AppError;

/// Rocket derives its cookie key from at least this many bytes.
pub const MIN_SESSION_SECRET_LEN: usize = 32;

const ENV_KEYS: &[&str] = &[
    "database_url",
    "app_env",
    "session_secret",
    "port",
    "address",
    "static_dir",
    "schema_init",
    "db_max_connections",
    "db_acquire_timeout_secs",
];

/// When the schema initializer runs relative to the listener.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaInitTiming {
    /// Spawned once the listener is accepting connections. Requests can
    /// arrive before the tables exist.
    #[default]
    AfterListen,
    /// Awaited during ignition, before the listener binds.
    BeforeListen,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    #[serde(default = "default_app_env")]
    pub app_env: String,
    #[serde(default)]
    pub session_secret: Option<String>,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_address")]
    pub address: IpAddr,
    #[serde(default = "default_static_dir")]
    pub static_dir: String,
    #[serde(default)]
    pub schema_init: SchemaInitTiming,
    #[serde(default = "default_max_connections")]
    pub db_max_connections: u32,
    #[serde(default = "default_acquire_timeout_secs")]
    pub db_acquire_timeout_secs: u64,
}

fn default_app_env() -> String {
    "development".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_address() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_static_dir() -> String {
    "static".to_string()
}

fn default_max_connections() -> u32 {
    10
}

fn default_acquire_timeout_secs() -> u64 {
    5
}

impl AppConfig {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self, rocket::figment::Error> {
        Figment::new().merge(Env::raw().only(ENV_KEYS)).extract()
    }

    pub fn is_production(&self) -> bool {
        self.app_env == "production"
    }

    pub fn connect_options(&self) -> Result<PgConnectOptions, sqlx::Error> {
        // Production stores terminate TLS without a verifiable certificate chain.
        let ssl_mode = if self.is_production() {
            PgSslMode::Require
        } else {
            PgSslMode::Disable
        };

        Ok(PgConnectOptions::from_str(&self.database_url)?.ssl_mode(ssl_mode))
    }

    /// Builds the pool without connecting. Must be called inside a Tokio runtime.
    pub fn connect_pool(&self) -> Result<PgPool, sqlx::Error> {
        let options = self.connect_options()?;

        Ok(PgPoolOptions::new()
            .max_connections(self.db_max_connections)
            .acquire_timeout(Duration::from_secs(self.db_acquire_timeout_secs))
            .connect_lazy_with(options))
    }

    /// Rocket refuses to ignite without a provided `secret_key` outside its
    /// debug profile, so a secret is required there as well as in production.
    pub fn rocket_figment(&self) -> Result<Figment, AppError> {
        let mut figment = rocket::Config::figment()
            .merge(("port", self.port))
            .merge(("address", self.address));

        let profile = figment.profile().clone();
        let requires_secret = self.is_production() || profile != rocket::Config::DEBUG_PROFILE;

        match self.session_secret.as_deref() {
            Some(secret) if secret.len() >= MIN_SESSION_SECRET_LEN => {
                figment = figment.merge(("secret_key", secret.as_bytes().to_vec()));
            }
            _ if requires_secret => {
                return Err(AppError::Configuration(format!(
                    "SESSION_SECRET must be at least {} bytes (app env {}, rocket profile {})",
                    MIN_SESSION_SECRET_LEN, self.app_env, profile
                )));
            }
            _ => {
                warn!("SESSION_SECRET missing or too short, session cookies use an ephemeral key");
            }
        }

        Ok(figment)
    }
}
