use std::sync::Arc;

use tracing::info;

use crate::config::AppConfig;
use crate::db;
use crate::users::{memory::MemoryUserStore, repo::PgUserStore, store::UserStore};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn UserStore>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let config = Arc::new(config);

        let store = if config.uses_memory_store() {
            info!("using in-memory user store");
            Arc::new(MemoryUserStore::new()) as Arc<dyn UserStore>
        } else {
            let pool = db::connect(&config).await?;
            if config.run_migrations {
                db::run_migrations(&pool).await;
            }
            Arc::new(PgUserStore::new(pool)) as Arc<dyn UserStore>
        };

        Ok(Self::from_parts(store, config))
    }

    pub fn from_parts(store: Arc<dyn UserStore>, config: Arc<AppConfig>) -> Self {
        Self { store, config }
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        let config = AppConfig::from_lookup(|key| match key {
            "APP_ENV" => Some("testing".into()),
            _ => None,
        })
        .expect("testing config");

        Self::from_parts(Arc::new(MemoryUserStore::new()), Arc::new(config))
    }
}
