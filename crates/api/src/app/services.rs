use std::sync::Arc;

use anyhow::Context;

use packship_infra::{InMemoryStore, OrderService, OrderStore, PackCatalogStore, PostgresStore};

use crate::config::{ApiConfig, StoreBackend};

/// Order service over whichever backend the process was configured with.
pub type DynOrderService = OrderService<Arc<dyn PackCatalogStore>, Arc<dyn OrderStore>>;

/// Shared handler state, injected into routes as an `Extension`.
pub struct AppServices {
    pub orders: DynOrderService,
}

impl AppServices {
    pub fn new(orders: DynOrderService) -> Self {
        Self { orders }
    }

    /// In-memory backend seeded with `pack_sizes`.
    pub async fn in_memory(pack_sizes: &[u64], max_order_items: u64) -> anyhow::Result<Self> {
        let store = Arc::new(InMemoryStore::new());
        let services = Self::from_store(store, max_order_items);
        services
            .orders
            .seed_pack_sizes(pack_sizes, true)
            .await
            .context("failed to seed pack catalog")?;
        Ok(services)
    }

    /// In-memory backend with an empty catalog.
    pub fn in_memory_unseeded(max_order_items: u64) -> Self {
        Self::from_store(Arc::new(InMemoryStore::new()), max_order_items)
    }

    fn from_store<S>(store: Arc<S>, max_order_items: u64) -> Self
    where
        S: PackCatalogStore + OrderStore + 'static,
    {
        let catalog: Arc<dyn PackCatalogStore> = store.clone();
        let orders: Arc<dyn OrderStore> = store;
        Self::new(OrderService::new(catalog, orders).with_max_order_items(max_order_items))
    }
}

/// Connect the configured backend, run migrations and install the catalog.
pub async fn build_services(config: &ApiConfig) -> anyhow::Result<AppServices> {
    let services = match &config.store {
        StoreBackend::Memory => {
            tracing::info!("using in-memory store");
            AppServices::from_store(Arc::new(InMemoryStore::new()), config.max_order_items)
        }
        StoreBackend::Postgres(db) => {
            let store = PostgresStore::connect_with(db.connect_options()?)
                .await
                .context("failed to connect to Postgres")?;
            store
                .migrate()
                .await
                .context("failed to run database migrations")?;
            tracing::info!("using postgres store");
            AppServices::from_store(Arc::new(store), config.max_order_items)
        }
    };

    let installed = services
        .orders
        .seed_pack_sizes(&config.pack_sizes, config.pack_sizes_explicit)
        .await
        .context("failed to install pack catalog")?;
    tracing::info!(
        pack_sizes = ?installed.iter().map(|s| s.items()).collect::<Vec<_>>(),
        "pack catalog ready"
    );

    Ok(services)
}
