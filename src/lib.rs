#[macro_use]
extern crate rocket;

pub mod config;
pub mod database;
pub mod env;
pub mod error;
pub mod models;
pub mod routes;
pub mod session;
pub mod telemetry;
pub mod validation;
#[cfg(test)]
mod test;

use std::path::Path;

use config::{AppConfig, SchemaInitTiming};
use database::ensure_schema;
use error::AppError;
use rocket::fairing::AdHoc;
use rocket::fs::FileServer;
use rocket::{Build, Rocket};
use routes::{api_test, index};
use sqlx::PgPool;
use telemetry::TelemetryFairing;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Figment(rocket::figment::Error),
    #[error("{0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("Application error: {0}")]
    App(#[from] AppError),
    #[error("Launch error: {0}")]
    Launch(String),
}

impl From<rocket::figment::Error> for Error {
    fn from(value: rocket::figment::Error) -> Self {
        Error::Figment(value)
    }
}

impl From<rocket::Error> for Error {
    fn from(value: rocket::Error) -> Self {
        Error::Launch(value.to_string())
    }
}

fn schema_initializer(timing: SchemaInitTiming) -> AdHoc {
    match timing {
        SchemaInitTiming::BeforeListen => AdHoc::on_ignite("Schema Initializer", |rocket| async move {
            match rocket.state::<PgPool>().cloned() {
                Some(pool) => {
                    ensure_schema(&pool).await;
                }
                None => warn!("No database pool managed, skipping schema initialization"),
            }
            rocket
        }),
        SchemaInitTiming::AfterListen => AdHoc::on_liftoff("Schema Initializer", |rocket| {
            Box::pin(async move {
                info!(port = rocket.config().port, "Server running");

                // Fire and forget: requests may arrive before the tables exist.
                match rocket.state::<PgPool>().cloned() {
                    Some(pool) => {
                        rocket::tokio::spawn(async move {
                            ensure_schema(&pool).await;
                        });
                    }
                    None => warn!("No database pool managed, skipping schema initialization"),
                }
            })
        }),
    }
}

pub fn init_rocket(config: AppConfig, pool: PgPool) -> Result<Rocket<Build>, AppError> {
    info!(
        environment = %config.app_env,
        schema_init = ?config.schema_init,
        "Starting coaching tracker"
    );

    let figment = config.rocket_figment()?;
    let static_dir = config.static_dir.clone();
    let timing = config.schema_init;

    let mut rocket = rocket::custom(figment)
        .manage(pool)
        .manage(config)
        .mount("/", routes![index])
        .mount("/api", routes![api_test])
        .attach(TelemetryFairing)
        .attach(schema_initializer(timing));

    if Path::new(&static_dir).is_dir() {
        rocket = rocket.mount("/", FileServer::from(&static_dir));
    } else {
        warn!("Static directory {} not found, serving API only", static_dir);
    }

    Ok(rocket)
}
