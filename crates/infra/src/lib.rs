//! Infrastructure layer: persistence backends and the order service that
//! drives them.

pub mod order_service;
pub mod store;

pub use order_service::{OrderService, OrderServiceError, DEFAULT_MAX_ORDER_ITEMS};
pub use store::{InMemoryStore, OrderStore, PackCatalogStore, PostgresStore, StoreError};
