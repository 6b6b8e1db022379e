use std::{env, fmt::Display, fs::read_to_string, path::PathBuf, str::FromStr};

use tracing::{info, warn};

use crate::error::AppError;

pub struct Config {
    pub port: u16,
    pub redis_url: String,
    pub frontend_url: String,
    pub static_dir: PathBuf,
    pub jwt_secret: String,
    pub jwt_expire_days: i64,
    pub bcrypt_cost: u32,
    pub default_student_password: String,
    pub environment: String,
}

impl Config {
    pub fn load() -> Result<Self, AppError> {
        Ok(Self {
            port: try_load("RUST_PORT", "5000")?,
            redis_url: try_load("REDIS_URL", "redis://127.0.0.1:6379")?,
            frontend_url: try_load("FRONTEND_URL", "http://localhost:3000")?,
            static_dir: try_load("STATIC_DIR", "public")?,
            jwt_secret: read_secret("JWT_SECRET")?,
            jwt_expire_days: try_load("JWT_EXPIRE_DAYS", "7")?,
            bcrypt_cost: try_load("BCRYPT_COST", "12")?,
            default_student_password: try_load("DEFAULT_STUDENT_PASSWORD", "Student@123")?,
            environment: try_load("APP_ENV", "development")?,
        })
    }
}

fn var(key: &str) -> Result<String, ()> {
    env::var(key).map_err(|_| {
        warn!("Environment variable {key} not found, using default");
    })
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T, AppError>
where
    T::Err: Display,
{
    var(key)
        .unwrap_or_else(|_| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e| {
            warn!("Invalid {key} value: {e}");
            AppError::Config(format!("Invalid {key} value: {e}"))
        })
}

/// Docker secret first, then the plain environment.
fn read_secret(secret_name: &str) -> Result<String, AppError> {
    let path = format!("/run/secrets/{secret_name}");

    match read_to_string(&path) {
        Ok(secret) => Ok(secret.trim().to_string()),
        Err(e) => {
            warn!("Failed to read {secret_name} from file: {e}, trying environment");

            env::var(secret_name)
                .map(|secret| secret.trim().to_string())
                .ok()
                .filter(|secret| !secret.is_empty())
                .ok_or_else(|| AppError::Config(format!("Secret {secret_name} is not set")))
        }
    }
}
