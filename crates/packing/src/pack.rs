use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use packship_core::{DomainError, DomainResult, ValueObject};

use crate::selector::{self, SolveError};
use crate::PackAssignment;

/// Fixed item capacity of one shippable pack. Always positive.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct PackSize(u64);

impl PackSize {
    pub fn new(items: u64) -> DomainResult<Self> {
        if items == 0 {
            return Err(DomainError::validation("pack size must be positive"));
        }
        Ok(Self(items))
    }

    pub fn items(self) -> u64 {
        self.0
    }
}

impl ValueObject for PackSize {}

impl core::fmt::Display for PackSize {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl TryFrom<u64> for PackSize {
    type Error = DomainError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PackSize> for u64 {
    fn from(value: PackSize) -> Self {
        value.0
    }
}

/// A validated catalog of distinct pack sizes.
///
/// Sizes are kept in ascending order internally; callers may supply them in
/// any order and nothing downstream depends on the order they arrived in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackCatalog {
    sizes: Vec<PackSize>,
}

impl PackCatalog {
    /// Validate raw sizes: non-empty, every size positive, no duplicates.
    pub fn new(sizes: impl IntoIterator<Item = u64>) -> Result<Self, SolveError> {
        let mut seen = BTreeSet::new();
        for items in sizes {
            let size = PackSize::new(items).map_err(|_| SolveError::ZeroPackSize)?;
            if !seen.insert(size) {
                return Err(SolveError::DuplicatePackSize(items));
            }
        }

        if seen.is_empty() {
            return Err(SolveError::EmptyCatalog);
        }

        Ok(Self {
            sizes: seen.into_iter().collect(),
        })
    }

    pub fn from_pack_sizes(sizes: impl IntoIterator<Item = PackSize>) -> Result<Self, SolveError> {
        Self::new(sizes.into_iter().map(PackSize::items))
    }

    /// Sizes in ascending order.
    pub fn sizes(&self) -> &[PackSize] {
        &self.sizes
    }

    /// Sizes in descending order (how catalogs are presented to users).
    pub fn sizes_desc(&self) -> impl Iterator<Item = PackSize> + '_ {
        self.sizes.iter().rev().copied()
    }

    /// Largest size, scanned from the contents. `None` only for an empty
    /// catalog, which `new` never builds.
    pub fn largest(&self) -> Option<PackSize> {
        self.sizes.iter().max().copied()
    }

    /// Compute the surplus-minimal, then pack-count-minimal assignment for
    /// `requested` items.
    pub fn solve(&self, requested: u64) -> Result<PackAssignment, SolveError> {
        selector::solve_catalog(self, requested)
    }
}
