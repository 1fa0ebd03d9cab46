use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::app::error::Result;
use crate::config::Config;
use crate::fetcher::{Fetcher, HttpFetcher};
use crate::store::SqliteStore;
use crate::transport::{ChatTransport, MatrixClient};

pub struct AppContext {
    pub config: Config,
    pub store: Arc<SqliteStore>,
    pub fetcher: Arc<dyn Fetcher + Send + Sync>,
    pub transport: Arc<dyn ChatTransport + Send + Sync>,
}

impl AppContext {
    /// Open the store (creating its schema) and connect to the homeserver.
    pub async fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let db_path = config.database_path()?;
        let store = Arc::new(SqliteStore::new(&db_path)?);
        info!("Using database {}", db_path.display());

        let fetcher: Arc<dyn Fetcher + Send + Sync> = Arc::new(HttpFetcher::new(
            Duration::from_secs(config.feed.request_timeout_secs),
        )?);

        let matrix = MatrixClient::connect(&config.matrix.homeserver, &config.matrix.access_token)
            .await?;
        info!("Logged in as {}", matrix.user_id());
        let transport: Arc<dyn ChatTransport + Send + Sync> = Arc::new(matrix);

        Ok(Self {
            config,
            store,
            fetcher,
            transport,
        })
    }

    pub fn from_parts(
        config: Config,
        store: Arc<SqliteStore>,
        fetcher: Arc<dyn Fetcher + Send + Sync>,
        transport: Arc<dyn ChatTransport + Send + Sync>,
    ) -> Self {
        Self {
            config,
            store,
            fetcher,
            transport,
        }
    }

    /// Close the store. Skipped with a warning while a task still holds it.
    pub fn shutdown(self) -> Result<()> {
        match Arc::try_unwrap(self.store) {
            Ok(store) => store.close(),
            Err(_) => {
                warn!("Store still in use at shutdown; leaving it to close on drop");
                Ok(())
            }
        }
    }
}
