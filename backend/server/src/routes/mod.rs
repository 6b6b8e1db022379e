use axum::{Json, response::IntoResponse};
use chrono::Utc;
use serde_json::json;

pub mod auth;
pub mod game;
pub mod progress;
pub mod users;

pub async fn health_handler() -> impl IntoResponse {
    Json(json!({ "status": "ok", "timestamp": Utc::now() }))
}
