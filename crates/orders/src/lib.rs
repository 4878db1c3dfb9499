//! Customer orders domain module.
//!
//! Turns a pack assignment into an order with one shipping line per pack size.
//! Pure domain logic (no IO, no HTTP, no storage); persisting the order and
//! its lines atomically is the store's job.

pub mod order;

pub use order::{CreateOrder, Order, ShippingLine};
