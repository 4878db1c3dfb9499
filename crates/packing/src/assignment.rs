use std::collections::BTreeMap;

use serde::Serialize;

use packship_core::{DomainError, DomainResult, ValueObject};

use crate::PackSize;

/// The chosen multiset of packs for one request: `pack size -> count`.
///
/// Invariants (enforced on construction):
/// - every entry has a count of at least 1;
/// - the packs hold at least `requested` items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackAssignment {
    requested: u64,
    packs: BTreeMap<PackSize, u64>,
}

impl PackAssignment {
    /// Build an assignment from explicit entries, validating the invariants.
    ///
    /// Repeated sizes are merged.
    pub fn new(
        requested: u64,
        entries: impl IntoIterator<Item = (PackSize, u64)>,
    ) -> DomainResult<Self> {
        if requested == 0 {
            return Err(DomainError::validation("requested quantity must be positive"));
        }

        let mut packs = BTreeMap::new();
        for (size, count) in entries {
            if count == 0 {
                return Err(DomainError::invariant(format!(
                    "pack size {size} has a zero count"
                )));
            }
            *packs.entry(size).or_insert(0) += count;
        }

        let assignment = Self { requested, packs };
        if assignment.total_items() < requested {
            return Err(DomainError::invariant(format!(
                "packs hold {} items but {} were requested",
                assignment.total_items(),
                requested
            )));
        }
        Ok(assignment)
    }

    /// Tally produced by the selector's path reconstruction. Counts are
    /// already positive and coverage holds by construction of the search.
    pub(crate) fn from_tally(requested: u64, packs: BTreeMap<PackSize, u64>) -> Self {
        debug_assert!(packs.values().all(|count| *count > 0));
        let assignment = Self { requested, packs };
        debug_assert!(assignment.total_items() >= requested);
        assignment
    }

    pub fn requested(&self) -> u64 {
        self.requested
    }

    /// Number of packs of `size` used (0 when the size is not part of the
    /// assignment).
    pub fn count_of(&self, size: PackSize) -> u64 {
        self.packs.get(&size).copied().unwrap_or(0)
    }

    /// Entries, largest pack size first.
    pub fn iter(&self) -> impl Iterator<Item = (PackSize, u64)> + '_ {
        self.packs.iter().rev().map(|(size, count)| (*size, *count))
    }

    /// Number of distinct pack sizes used.
    pub fn len(&self) -> usize {
        self.packs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packs.is_empty()
    }

    /// Items actually shipped: `sum(size * count)`.
    pub fn total_items(&self) -> u64 {
        self.packs
            .iter()
            .map(|(size, count)| size.items() * count)
            .sum()
    }

    /// Items shipped beyond the request.
    pub fn surplus(&self) -> u64 {
        self.total_items() - self.requested
    }

    /// Physical packs shipped: `sum(count)`.
    pub fn pack_count(&self) -> u64 {
        self.packs.values().sum()
    }
}

impl ValueObject for PackAssignment {}
