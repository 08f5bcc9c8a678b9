use std::path::Path;

use rocket::State;
use rocket::fs::NamedFile;
use rocket::serde::json::Json;
use serde_json::{Value, json};

use crate::config::AppConfig;
use crate::error::AppError;

#[get("/")]
pub async fn index(config: &State<AppConfig>) -> Result<NamedFile, AppError> {
    let path = Path::new(&config.static_dir).join("index.html");

    NamedFile::open(&path)
        .await
        .map_err(|e| AppError::NotFound(format!("{}: {}", path.display(), e)))
}

#[get("/test")]
pub fn api_test() -> Json<Value> {
    Json(json!({ "message": "API is working!" }))
}
