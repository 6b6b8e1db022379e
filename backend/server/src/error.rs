use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use bank::BankError;
use canvas::CanvasError;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Malformed payload")]
    MalformedPayload,

    #[error("Validation failed")]
    Validation(Vec<FieldError>),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(&'static str),

    #[error("Access denied. Insufficient permissions.")]
    Forbidden,

    #[error("{0}")]
    NotFound(&'static str),

    #[error("{0} already in use")]
    Duplicate(&'static str),

    #[error("Redis error: {0}")]
    Database(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Hashing error: {0}")]
    Hash(#[from] bcrypt::BcryptError),

    #[error("Token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error(transparent)]
    Canvas(#[from] CanvasError),

    #[error(transparent)]
    Bank(#[from] BankError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Timed out waiting for the lock on account {0}")]
    LockTimeout(uuid::Uuid),
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        warn!("Rejected payload: {rejection}");

        AppError::MalformedPayload
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        warn!("Rejected path: {rejection}");

        AppError::BadRequest("Invalid path parameter".to_string())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        warn!("Rejected query: {rejection}");

        AppError::BadRequest("Invalid query string".to_string())
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::MalformedPayload
            | AppError::Validation(_)
            | AppError::BadRequest(_)
            | AppError::Duplicate(_)
            | AppError::Canvas(CanvasError::Decode(_)) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            error!("{self}");

            let body = json!({ "status": "error", "message": "Server error" });
            return (status, Json(body)).into_response();
        }

        let body = match &self {
            AppError::Validation(errors) => json!({
                "status": "error",
                "message": self.to_string(),
                "errors": errors,
            }),
            AppError::Canvas(CanvasError::Decode(_)) => json!({
                "status": "error",
                "message": "Drawing must be a PNG image",
            }),
            _ => json!({ "status": "error", "message": self.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}
