//! Catalog and order persistence boundary.
//!
//! Two backends implement the traits: [`InMemoryStore`] for tests and
//! single-process deployments, [`PostgresStore`] for durable storage.

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use in_memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use r#trait::{OrderStore, PackCatalogStore, StoreError};
