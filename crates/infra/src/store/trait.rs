use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use packship_core::OrderId;
use packship_orders::{Order, ShippingLine};
use packship_packing::PackSize;

/// Store operation error.
///
/// These are **infrastructure errors** (connectivity, constraint violations,
/// undecodable rows) as opposed to domain errors (validation, invariants).
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store cannot be reached (pool closed, connection refused,
    /// poisoned lock).
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A write collided with existing data (e.g. duplicate order id).
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("query failed: {0}")]
    Query(String),

    #[error("migration failed: {0}")]
    Migration(String),

    /// A stored row could not be turned back into a domain value.
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

/// Source of the pack sizes currently available for shipping.
#[async_trait]
pub trait PackCatalogStore: Send + Sync {
    /// All available pack sizes, largest first.
    async fn list_pack_sizes(&self) -> Result<Vec<PackSize>, StoreError>;

    /// Replace the whole catalog in one step.
    async fn replace_pack_sizes(&self, sizes: &[PackSize]) -> Result<(), StoreError>;
}

/// Persistence for orders and their shipping lines.
///
/// ## Atomicity
///
/// `create_order` stores the order together with all of its shipping lines,
/// or nothing at all. Readers never observe an order with only part of its
/// lines.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn create_order(&self, order: &Order) -> Result<(), StoreError>;

    /// Load one order; shipping lines come back largest pack size first.
    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, StoreError>;

    /// All orders, newest first.
    async fn list_orders(&self) -> Result<Vec<Order>, StoreError>;

    /// All shipping lines across orders, newest first.
    async fn list_shipping(&self) -> Result<Vec<ShippingLine>, StoreError>;

    /// Cheap liveness probe.
    async fn health(&self) -> Result<(), StoreError>;
}

#[async_trait]
impl<S> PackCatalogStore for Arc<S>
where
    S: PackCatalogStore + ?Sized,
{
    async fn list_pack_sizes(&self) -> Result<Vec<PackSize>, StoreError> {
        (**self).list_pack_sizes().await
    }

    async fn replace_pack_sizes(&self, sizes: &[PackSize]) -> Result<(), StoreError> {
        (**self).replace_pack_sizes(sizes).await
    }
}

#[async_trait]
impl<S> OrderStore for Arc<S>
where
    S: OrderStore + ?Sized,
{
    async fn create_order(&self, order: &Order) -> Result<(), StoreError> {
        (**self).create_order(order).await
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        (**self).get_order(id).await
    }

    async fn list_orders(&self) -> Result<Vec<Order>, StoreError> {
        (**self).list_orders().await
    }

    async fn list_shipping(&self) -> Result<Vec<ShippingLine>, StoreError> {
        (**self).list_shipping().await
    }

    async fn health(&self) -> Result<(), StoreError> {
        (**self).health().await
    }
}
