use std::sync::Arc;

use tracing::warn;

use crate::config::AppConfig;
use crate::store::{MarketStore, MemoryStore, PgStore};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn MarketStore>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let store = match &config.db {
            Some(db) => Arc::new(PgStore::connect(db).await?) as Arc<dyn MarketStore>,
            None => {
                warn!("DATABASE_URL not set; using in-memory store, data is lost on exit");
                Arc::new(MemoryStore::new()) as Arc<dyn MarketStore>
            }
        };

        Ok(Self { store, config })
    }

    /// State backed by a fresh in-memory store.
    #[cfg(test)]
    pub fn fake() -> Self {
        Self::fake_with_store().0
    }

    /// Like [`AppState::fake`], also handing back the concrete store.
    #[cfg(test)]
    pub fn fake_with_store() -> (Self, Arc<MemoryStore>) {
        let config = Arc::new(AppConfig {
            db: None,
            host: "127.0.0.1".into(),
            port: 0,
        });
        let store = Arc::new(MemoryStore::new());
        let state = Self {
            store: store.clone(),
            config,
        };
        (state, store)
    }
}
