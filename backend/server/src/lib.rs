//! Documentation of a learning-difficulty screening platform.
//!
//! Students play short quizzes and copy words onto a drawing canvas; teachers
//! (consultants) manage their students and read the results on a dashboard.
//!
//!
//!
//! # General Infrastructure
//! - One axum server serves both the JSON API under `/api` and the static frontend
//! - Every other path is a file in `STATIC_DIR`, falling back to `index.html`
//! - Redis holds accounts and exercise history, see [`database`]
//! - The challenge bank is compiled into the binary, see the `bank` crate
//!
//!
//!
//! # API
//!
//! | Prefix          | Purpose                                            |
//! |-----------------|----------------------------------------------------|
//! | `/api/auth`     | register, login, student login, password changes   |
//! | `/api/users`    | own profile, and student management for teachers   |
//! | `/api/progress` | exercise history and drawing submissions           |
//! | `/api/game`     | quiz challenges and server-side scoring of a round |
//! | `/api/health`   | liveness                                           |
//!
//! Every response body is JSON with a `status` of `success` or `error`.
//!
//!
//!
//! # Students Without Email
//!
//! Young students log in with their student id plus their consultant's id
//! (`CNS` and six digits, generated when a teacher registers). Older teacher
//! accounts still carry an employee id, which is accepted in its place.
//!
//!
//!
//! # Scoring Drawings
//!
//! The canvas uploads a PNG at device resolution. The server scales it to the
//! 900x360 logical canvas and compares it to the prompt rendered with the built-in
//! font. Scoring runs on the blocking pool, see the `canvas` crate.
//!
//!
//!
//! # Setup
//!
//! View current docs.
//! ```sh
//! cargo doc --open
//! ```
//!
//! Run against a throwaway in-memory store.
//! ```sh
//! REDIS_URL=memory JWT_SECRET=dev RUST_LOG=info cargo run -p screening
//! ```
//!
//!
//!
//! # Environment
//!
//! | Variable                   | Default                  |
//! |----------------------------|--------------------------|
//! | `RUST_PORT`                | `5000`                   |
//! | `REDIS_URL`                | `redis://127.0.0.1:6379` |
//! | `FRONTEND_URL`             | `http://localhost:3000`  |
//! | `STATIC_DIR`               | `public`                 |
//! | `JWT_EXPIRE_DAYS`          | `7`                      |
//! | `BCRYPT_COST`              | `12`                     |
//! | `DEFAULT_STUDENT_PASSWORD` | `Student@123`            |
//! | `APP_ENV`                  | `development`            |
//!
//! `JWT_SECRET` is read from `/run/secrets/JWT_SECRET`, then from the environment.
use std::{future::pending, sync::Arc, time::Duration};

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{
        HeaderName, HeaderValue, Method,
        header::{AUTHORIZATION, CONTENT_TYPE, X_CONTENT_TYPE_OPTIONS, X_FRAME_OPTIONS},
    },
    routing::get,
};

use signal::{
    ctrl_c,
    unix::{SignalKind, signal},
};
use tokio::{net::TcpListener, signal};
use tower_http::{
    cors::CorsLayer,
    services::{ServeDir, ServeFile},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

pub mod analytics;
pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod models;
pub mod routes;
pub mod state;
pub mod utils;

#[cfg(test)]
mod testing;

use error::AppError;
use routes::health_handler;
use state::AppState;

const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

fn cors_layer(frontend_url: &str) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_credentials(true)
        .max_age(Duration::from_secs(60 * 60));

    match HeaderValue::from_str(frontend_url) {
        Ok(origin) => cors.allow_origin(origin),
        Err(e) => {
            warn!("Invalid FRONTEND_URL {frontend_url}: {e}, cross-origin requests disabled");
            cors
        }
    }
}

fn response_header(name: HeaderName, value: &'static str) -> SetResponseHeaderLayer<HeaderValue> {
    SetResponseHeaderLayer::overriding(name, HeaderValue::from_static(value))
}

pub fn app(state: Arc<AppState>) -> Router {
    let static_dir = &state.config.static_dir;
    let index = ServeFile::new(static_dir.join("index.html"));
    let frontend = ServeDir::new(static_dir).fallback(index);

    Router::new()
        .nest("/api/auth", routes::auth::router())
        .nest("/api/users", routes::users::router())
        .nest("/api/progress", routes::progress::router())
        .nest("/api/game", routes::game::router())
        .route("/api/health", get(health_handler))
        .fallback_service(frontend)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(response_header(X_CONTENT_TYPE_OPTIONS, "nosniff"))
        .layer(response_header(X_FRAME_OPTIONS, "DENY"))
        .layer(cors_layer(&state.config.frontend_url))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn start_server() -> Result<(), AppError> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Initializing state...");
    let state = AppState::new().await?;

    info!("Starting server in {} mode...", state.config.environment);

    let address = format!("0.0.0.0:{}", state.config.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address).await?;
    info!("Server running on {address}");

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                error!("Failed to install Ctrl+C handler: {e}");
                pending::<()>().await
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                terminate.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Failed to install signal handler: {e}");
                pending::<()>().await
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
