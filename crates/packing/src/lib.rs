//! Pack selection domain module.
//!
//! Picks the whole shipping packs for an ordered quantity: fewest surplus items
//! first, then fewest packs. Pure and synchronous (no IO, no logging, no shared
//! state); every call builds its own search table.

pub mod assignment;
pub mod pack;
pub mod selector;

pub use assignment::PackAssignment;
pub use pack::{PackCatalog, PackSize};
pub use selector::{solve, SolveError};
