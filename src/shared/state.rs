use std::sync::Arc;

use redis::Client as RedisClient;
use tracing::warn;

use crate::config::AppConfig;
use crate::shared::error::ApiError;
use crate::shared::utils::{create_conn, DbConn, DbPool};

/// Process-wide application state. Constructed once in `main` and handed to
/// every handler as `State<Arc<AppState>>`; nothing here is lazily created
/// behind a module-level static.
pub struct AppState {
    pub conn: DbPool,
    pub cache: Option<Arc<RedisClient>>,
    pub config: AppConfig,
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(config: AppConfig) -> anyhow::Result<Self> {
        let conn = create_conn(&config.database_url())?;

        let cache = match &config.cache.url {
            Some(url) => match RedisClient::open(url.as_str()) {
                Ok(client) => Some(Arc::new(client)),
                Err(e) => {
                    warn!("cache disabled, invalid REDIS_URL: {}", e);
                    None
                }
            },
            None => None,
        };

        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(15))
            .build()?;

        Ok(Self {
            conn,
            cache,
            config,
            http,
        })
    }

    /// Checked-out pooled connection, with pool exhaustion reported as an
    /// internal error rather than a panic.
    pub fn db(&self) -> Result<DbConn, ApiError> {
        self.conn.get().map_err(ApiError::from)
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("conn", &"DbPool")
            .field("cache", &self.cache.is_some())
            .field("config", &self.config)
            .finish()
    }
}
