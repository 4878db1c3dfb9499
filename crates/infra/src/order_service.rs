//! Order creation pipeline (application-level orchestration).
//!
//! ```text
//! number_of_items
//!   ↓
//! 1. Validate the quantity (positive, within the configured ceiling)
//!   ↓
//! 2. Load the current pack catalog
//!   ↓
//! 3. Select packs (surplus first, then pack count)
//!   ↓
//! 4. Assemble the order and its shipping lines
//!   ↓
//! 5. Persist order + lines atomically
//! ```
//!
//! The service composes the `PackCatalogStore` and `OrderStore` traits, so it
//! runs unchanged over the in-memory and Postgres backends.

use chrono::Utc;
use thiserror::Error;
use tracing::{info, instrument, warn};

use packship_core::{DomainError, OrderId};
use packship_orders::{CreateOrder, Order, ShippingLine};
use packship_packing::{PackCatalog, PackSize, SolveError};

use crate::store::{OrderStore, PackCatalogStore, StoreError};

/// Largest order accepted unless configured otherwise. Bounds the selector's
/// search table for a single request.
pub const DEFAULT_MAX_ORDER_ITEMS: u64 = 1_000_000;

#[derive(Debug, Error)]
pub enum OrderServiceError {
    /// Caller input was rejected.
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("order {0} not found")]
    NotFound(OrderId),

    /// The catalog is empty, so nothing can be shipped.
    #[error("no packs to ship")]
    NoPacksAvailable,

    #[error(transparent)]
    Solve(#[from] SolveError),

    /// Assembled or stored data broke a domain invariant.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for OrderServiceError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Conflict(msg) => OrderServiceError::Conflict(msg),
            StoreError::Unavailable(msg) => OrderServiceError::Unavailable(msg),
            other => OrderServiceError::Store(other),
        }
    }
}

impl From<DomainError> for OrderServiceError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => {
                OrderServiceError::Validation(msg)
            }
            DomainError::InvariantViolation(msg) => OrderServiceError::InvariantViolation(msg),
            DomainError::Conflict(msg) => OrderServiceError::Conflict(msg),
            DomainError::NotFound => OrderServiceError::InvariantViolation(
                "unexpected not-found from domain layer".to_string(),
            ),
        }
    }
}

/// Creates and reads orders over a pack catalog and an order store.
#[derive(Debug, Clone)]
pub struct OrderService<C, O> {
    catalog: C,
    orders: O,
    max_order_items: u64,
}

impl<C, O> OrderService<C, O>
where
    C: PackCatalogStore,
    O: OrderStore,
{
    pub fn new(catalog: C, orders: O) -> Self {
        Self {
            catalog,
            orders,
            max_order_items: DEFAULT_MAX_ORDER_ITEMS,
        }
    }

    pub fn with_max_order_items(mut self, max_order_items: u64) -> Self {
        self.max_order_items = max_order_items;
        self
    }

    pub fn max_order_items(&self) -> u64 {
        self.max_order_items
    }

    /// Select packs for `number_of_items`, then store the resulting order.
    #[instrument(skip(self), err)]
    pub async fn create_order(&self, number_of_items: u64) -> Result<Order, OrderServiceError> {
        if number_of_items == 0 {
            return Err(OrderServiceError::Validation(
                "number_of_items must be positive".to_string(),
            ));
        }
        if number_of_items > self.max_order_items {
            return Err(OrderServiceError::Validation(format!(
                "number_of_items {number_of_items} exceeds the maximum of {}",
                self.max_order_items
            )));
        }

        let sizes = self.catalog.list_pack_sizes().await?;
        if sizes.is_empty() {
            warn!("order rejected: pack catalog is empty");
            return Err(OrderServiceError::NoPacksAvailable);
        }

        let catalog = PackCatalog::from_pack_sizes(sizes)?;
        if let Some(size) = self.oversized_pack(&catalog) {
            warn!(pack_size = size.items(), "order rejected: stored pack exceeds order ceiling");
            return Err(OrderServiceError::InvariantViolation(format!(
                "stored pack size {size} exceeds the maximum of {}",
                self.max_order_items
            )));
        }
        let assignment = catalog.solve(number_of_items)?;

        let cmd = CreateOrder {
            order_id: OrderId::new(),
            number_of_items,
            occurred_at: Utc::now(),
        };
        let order = Order::assemble(&cmd, &assignment)?;
        self.orders.create_order(&order).await?;

        info!(
            order_id = %order.id_typed(),
            number_of_items,
            surplus = order.surplus(),
            pack_count = order.pack_count(),
            "order created"
        );
        Ok(order)
    }

    #[instrument(skip(self), fields(order_id = %id), err)]
    pub async fn get_order(&self, id: OrderId) -> Result<Order, OrderServiceError> {
        self.orders
            .get_order(id)
            .await?
            .ok_or(OrderServiceError::NotFound(id))
    }

    /// All orders, newest first.
    pub async fn list_orders(&self) -> Result<Vec<Order>, OrderServiceError> {
        Ok(self.orders.list_orders().await?)
    }

    /// All shipping lines, newest first.
    pub async fn list_shipping(&self) -> Result<Vec<ShippingLine>, OrderServiceError> {
        Ok(self.orders.list_shipping().await?)
    }

    /// Current pack catalog, largest first.
    pub async fn pack_sizes(&self) -> Result<Vec<PackSize>, OrderServiceError> {
        Ok(self.catalog.list_pack_sizes().await?)
    }

    /// Install `sizes` as the pack catalog.
    ///
    /// With `overwrite == false` an existing non-empty catalog is left alone,
    /// which lets startup seed defaults without clobbering stored data.
    /// Returns the catalog in effect afterwards, largest first.
    #[instrument(skip(self), err)]
    pub async fn seed_pack_sizes(
        &self,
        sizes: &[u64],
        overwrite: bool,
    ) -> Result<Vec<PackSize>, OrderServiceError> {
        let catalog = PackCatalog::new(sizes.iter().copied())?;
        if let Some(size) = self.oversized_pack(&catalog) {
            return Err(OrderServiceError::Validation(format!(
                "pack size {size} exceeds the maximum of {}",
                self.max_order_items
            )));
        }

        if !overwrite {
            let existing = self.catalog.list_pack_sizes().await?;
            if !existing.is_empty() {
                info!(pack_count = existing.len(), "keeping stored pack catalog");
                return Ok(existing);
            }
        }

        let desc: Vec<PackSize> = catalog.sizes_desc().collect();
        self.catalog.replace_pack_sizes(&desc).await?;
        info!(pack_sizes = ?sizes, "pack catalog installed");
        Ok(desc)
    }

    pub async fn health(&self) -> Result<(), OrderServiceError> {
        self.orders.health().await?;
        Ok(())
    }

    /// The selector searches up to `number_of_items + largest pack`. Both
    /// terms stay within `max_order_items`, so its table is bounded by twice
    /// the ceiling.
    fn oversized_pack(&self, catalog: &PackCatalog) -> Option<PackSize> {
        catalog
            .largest()
            .filter(|size| size.items() > self.max_order_items)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::store::InMemoryStore;

    const CATALOG: [u64; 5] = [250, 500, 1000, 2000, 5000];

    fn setup(sizes: &[u64]) -> OrderService<Arc<InMemoryStore>, Arc<InMemoryStore>> {
        let store = Arc::new(InMemoryStore::with_pack_sizes(
            sizes.iter().map(|s| PackSize::new(*s).unwrap()),
        ));
        OrderService::new(store.clone(), store)
    }

    fn lines(order: &Order) -> Vec<(u64, u64)> {
        order
            .shipping()
            .iter()
            .map(|l| (l.pack_size.items(), l.quantity))
            .collect()
    }

    #[tokio::test]
    async fn create_order_persists_optimal_shipping() {
        let service = setup(&CATALOG);

        let order = service.create_order(12001).await.unwrap();
        assert_eq!(lines(&order), vec![(5000, 2), (2000, 1), (250, 1)]);
        assert_eq!(order.surplus(), 249);

        let loaded = service.get_order(order.id_typed()).await.unwrap();
        assert_eq!(loaded, order);
    }

    #[tokio::test]
    async fn reference_quantities() {
        let service = setup(&CATALOG);
        let cases: [(u64, Vec<(u64, u64)>); 6] = [
            (1, vec![(250, 1)]),
            (250, vec![(250, 1)]),
            (251, vec![(500, 1)]),
            (501, vec![(500, 1), (250, 1)]),
            (13001, vec![(5000, 2), (2000, 1), (1000, 1), (250, 1)]),
            (2390, vec![(2000, 1), (500, 1)]),
        ];

        for (requested, expected) in cases {
            let order = service.create_order(requested).await.unwrap();
            assert_eq!(lines(&order), expected, "requested {requested}");
        }
        assert_eq!(service.list_orders().await.unwrap().len(), 6);
    }

    #[tokio::test]
    async fn rejects_zero_and_oversized_quantities() {
        let service = setup(&CATALOG).with_max_order_items(10_000);

        assert!(matches!(
            service.create_order(0).await,
            Err(OrderServiceError::Validation(_))
        ));
        match service.create_order(10_001).await {
            Err(OrderServiceError::Validation(msg)) => assert!(msg.contains("maximum of 10000")),
            other => panic!("expected Validation, got {other:?}"),
        }
        service.create_order(10_000).await.unwrap();
        assert_eq!(service.list_orders().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn empty_catalog_means_no_packs() {
        let service = setup(&[]);
        assert!(matches!(
            service.create_order(10).await,
            Err(OrderServiceError::NoPacksAvailable)
        ));
        assert!(service.list_orders().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_order_is_not_found() {
        let service = setup(&CATALOG);
        let id = OrderId::new();
        match service.get_order(id).await {
            Err(OrderServiceError::NotFound(missing)) => assert_eq!(missing, id),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn shipping_lists_lines_across_orders() {
        let service = setup(&CATALOG);
        let first = service.create_order(501).await.unwrap();
        let second = service.create_order(12001).await.unwrap();

        let shipping = service.list_shipping().await.unwrap();
        assert_eq!(shipping.len(), first.shipping().len() + second.shipping().len());
        assert!(shipping.iter().any(|l| l.order_id == first.id_typed()));
        assert!(shipping.iter().any(|l| l.order_id == second.id_typed()));
    }

    #[tokio::test]
    async fn seeding_respects_existing_catalog() {
        let service = setup(&[]);

        let installed = service.seed_pack_sizes(&[31, 23, 53], false).await.unwrap();
        let installed: Vec<u64> = installed.into_iter().map(PackSize::items).collect();
        assert_eq!(installed, vec![53, 31, 23]);

        let kept = service.seed_pack_sizes(&CATALOG, false).await.unwrap();
        assert_eq!(kept.len(), 3);

        let replaced = service.seed_pack_sizes(&CATALOG, true).await.unwrap();
        assert_eq!(replaced.first().map(|s| s.items()), Some(5000));

        let order = service.create_order(263).await.unwrap();
        assert_eq!(lines(&order), vec![(500, 1)]);
    }

    #[tokio::test]
    async fn seeding_rejects_invalid_catalogs() {
        let service = setup(&CATALOG);
        assert!(matches!(
            service.seed_pack_sizes(&[250, 250], true).await,
            Err(OrderServiceError::Solve(SolveError::DuplicatePackSize(250)))
        ));
        assert!(matches!(
            service.seed_pack_sizes(&[], true).await,
            Err(OrderServiceError::Solve(SolveError::EmptyCatalog))
        ));
        assert_eq!(service.pack_sizes().await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn seeding_rejects_packs_above_the_ceiling() {
        let service = setup(&CATALOG).with_max_order_items(10_000);

        match service.seed_pack_sizes(&[250, 1 << 33], true).await {
            Err(OrderServiceError::Validation(msg)) => {
                assert!(msg.contains("exceeds the maximum of 10000"))
            }
            other => panic!("expected Validation, got {other:?}"),
        }
        service.seed_pack_sizes(&[250, 10_000], true).await.unwrap();
    }

    #[tokio::test]
    async fn stored_pack_above_the_ceiling_is_refused_before_solving() {
        // Catalog written straight to the store, bypassing seeding.
        let service = setup(&[250, 1 << 33]).with_max_order_items(10_000);

        match service.create_order(1).await {
            Err(OrderServiceError::InvariantViolation(msg)) => {
                assert!(msg.contains("stored pack size 8589934592"))
            }
            other => panic!("expected InvariantViolation, got {other:?}"),
        }
        assert!(service.list_orders().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn in_memory_store_is_healthy() {
        setup(&CATALOG).health().await.unwrap();
    }
}
