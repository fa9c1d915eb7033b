use std::sync::Arc;

use anyhow::Context;

use salesdate_infra::{
    InMemorySalesStore, OrderUnitOfWork, OrderWriter, PostgresSalesStore, PredictionEngine,
    SalesQuery, StoreBackend, StoreConfig,
};

/// Store with both the read and the transactional write capability.
pub trait SalesStore: SalesQuery + OrderUnitOfWork {}

impl<T> SalesStore for T where T: SalesQuery + OrderUnitOfWork {}

pub type SharedStore = Arc<dyn SalesStore>;

/// Services shared by all handlers.
pub struct AppServices {
    pub predictions: PredictionEngine<SharedStore>,
    pub orders: OrderWriter<SharedStore>,
    pub query: SharedStore,
}

impl AppServices {
    pub fn from_store(store: SharedStore) -> Self {
        Self {
            predictions: PredictionEngine::new(Arc::clone(&store)),
            orders: OrderWriter::new(Arc::clone(&store)),
            query: store,
        }
    }
}

pub async fn build_services() -> anyhow::Result<AppServices> {
    let config = StoreConfig::from_env().context("invalid store configuration")?;
    build_services_from(config).await
}

pub async fn build_services_from(config: StoreConfig) -> anyhow::Result<AppServices> {
    let store: SharedStore = match config.backend {
        StoreBackend::InMemory => {
            tracing::warn!("USE_PERSISTENT_STORES is not set; using an empty in-memory store");
            Arc::new(InMemorySalesStore::new())
        }
        StoreBackend::Postgres(db) => {
            tracing::info!(?db, "connecting to postgres");
            let store = PostgresSalesStore::connect(&db)
                .await
                .context("failed to connect to Postgres")?;
            Arc::new(store)
        }
    };

    Ok(AppServices::from_store(store))
}
