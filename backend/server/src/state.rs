use std::sync::Arc;

use bank::{Bank, get_bank};

use super::{
    config::Config,
    database::{Database, init_database},
    error::AppError,
};

pub struct AppState {
    pub bank: Bank,
    pub config: Config,
    pub database: Database,
}

impl AppState {
    pub async fn new() -> Result<Arc<Self>, AppError> {
        let bank = get_bank()?;

        let config = Config::load()?;

        let database = init_database(&config.redis_url).await?;

        Ok(Arc::new(Self {
            bank,
            config,
            database,
        }))
    }
}
