//! Helpers for driving the router in tests.
use std::{path::PathBuf, sync::Arc};

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{
        Method, Request, StatusCode,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
};
use bank::get_bank;
use serde_json::{Value, json};
use tower::ServiceExt;

use crate::{
    app,
    config::Config,
    database::{Database, MEMORY_URL},
    state::AppState,
};

pub fn test_config() -> Config {
    Config {
        port: 0,
        redis_url: MEMORY_URL.to_string(),
        frontend_url: "http://localhost:3000".to_string(),
        static_dir: PathBuf::from("public"),
        jwt_secret: "test-secret".to_string(),
        jwt_expire_days: 7,
        bcrypt_cost: 4,
        default_student_password: "Student@123".to_string(),
        environment: "test".to_string(),
    }
}

pub fn test_app() -> Router {
    test_app_with(test_config())
}

pub fn test_app_with(config: Config) -> Router {
    app(Arc::new(AppState {
        bank: get_bank().unwrap(),
        config,
        database: Database::memory(),
    }))
}

async fn read(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();

    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);

    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
    }

    let body = match body {
        Some(json) => {
            builder = builder.header(CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    read(app, builder.body(body).unwrap()).await
}

pub async fn send_bytes(
    app: &Router,
    uri: &str,
    token: &str,
    bytes: Vec<u8>,
) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(AUTHORIZATION, format!("Bearer {token}"))
        .header(CONTENT_TYPE, "image/png")
        .body(Body::from(bytes))
        .unwrap();

    read(app, request).await
}

/// Registers and returns the token and the public user.
pub async fn register(app: &Router, body: Value) -> (String, Value) {
    let (status, response) = send(app, Method::POST, "/api/auth/register", None, Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "{response}");

    let token = response["token"].as_str().unwrap().to_string();
    (token, response["user"].clone())
}

pub async fn register_student(app: &Router, email: &str, student_id: &str) -> (String, Value) {
    register(
        app,
        json!({
            "firstName": "Test",
            "lastName": "Student",
            "email": email,
            "password": "password123",
            "role": "student",
            "studentId": student_id,
        }),
    )
    .await
}

pub async fn register_teacher(app: &Router, email: &str) -> (String, Value) {
    register(
        app,
        json!({
            "firstName": "Tess",
            "lastName": "Teacher",
            "email": email,
            "password": "password123",
            "role": "teacher",
            "department": "Special Education",
        }),
    )
    .await
}
