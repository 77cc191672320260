//! Shared application state.

use std::sync::Arc;

use sqlx::PgPool;

use dealdesk_config::ServerConfig;
use dealdesk_engine::Engine;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
    pub config: Arc<ServerConfig>,
    pub pool: PgPool,
}

impl AppState {
    pub fn new(engine: Engine, config: ServerConfig, pool: PgPool) -> Self {
        Self {
            engine: Arc::new(engine),
            config: Arc::new(config),
            pool,
        }
    }
}
