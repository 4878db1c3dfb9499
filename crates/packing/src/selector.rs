//! Optimal pack selection.
//!
//! Given a catalog of pack sizes and a requested quantity, pick the multiset of
//! whole packs that
//!
//! 1. covers the request,
//! 2. ships the fewest surplus items,
//! 3. and, among those, uses the fewest packs.
//!
//! ## Algorithm
//!
//! Reachability dynamic program over item sums. Every sum `x` in `0..=H` gets
//! the fewest packs that add up to exactly `x`, plus a back-pointer (the pack
//! added last and the sum it was added to). Sums are only ever extended
//! forwards, so the table is filled in a single ascending pass.
//!
//! The horizon is `H = requested + max(pack size)`. A minimal covering
//! multiset never exceeds it: dropping any one pack from a multiset that sums
//! past `H` still covers the request.
//!
//! After the pass, sums `requested..=H` are scanned for the smallest surplus.
//! Each sum is its own surplus, and its entry already carries the fewest packs
//! reaching it, so the count tie-break is settled by the table itself. The
//! winning multiset is recovered by walking back-pointers down to 0.
//!
//! Cost is `O(H * |catalog|)` time and `O(H)` space; the table lives only for
//! the duration of one call.
//!
//! When several multisets tie on both surplus and pack count, the first one
//! reached by the forward pass wins (sizes are tried smallest first). No other
//! property depends on which of them is returned.

use std::collections::BTreeMap;

use thiserror::Error;

use packship_core::DomainError;

use crate::{PackAssignment, PackCatalog, PackSize};

/// Pack selection failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SolveError {
    #[error("invalid input: pack catalog is empty")]
    EmptyCatalog,

    #[error("invalid input: pack sizes must be positive")]
    ZeroPackSize,

    #[error("invalid input: pack size {0} appears more than once")]
    DuplicatePackSize(u64),

    #[error("invalid input: requested quantity must be positive")]
    ZeroQuantity,

    /// `requested + max(pack size)` does not fit the search table.
    #[error("search horizon too large: {requested} requested with largest pack {largest}")]
    HorizonOverflow { requested: u64, largest: u64 },

    /// No reachable sum in `requested..=horizon`. Only possible with an empty
    /// catalog, which is rejected earlier.
    #[error("no feasible assignment within horizon {horizon}")]
    NoFeasibleAssignment { horizon: u64 },
}

impl SolveError {
    /// Caller errors: the inputs violated a precondition.
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            SolveError::EmptyCatalog
                | SolveError::ZeroPackSize
                | SolveError::DuplicatePackSize(_)
                | SolveError::ZeroQuantity
        )
    }
}

impl From<SolveError> for DomainError {
    fn from(value: SolveError) -> Self {
        if value.is_invalid_input() || matches!(value, SolveError::HorizonOverflow { .. }) {
            DomainError::validation(value.to_string())
        } else {
            DomainError::invariant(value.to_string())
        }
    }
}

/// Solve for raw pack sizes, in any order.
///
/// Validates the catalog (non-empty, positive, distinct) and the request
/// (positive) before searching.
pub fn solve(pack_sizes: &[u64], requested: u64) -> Result<PackAssignment, SolveError> {
    let catalog = PackCatalog::new(pack_sizes.iter().copied())?;
    solve_catalog(&catalog, requested)
}

/// Best way found so far to reach one exact sum.
#[derive(Debug, Clone, Copy)]
struct Reach {
    packs: u64,
    from: usize,
    pack: usize,
}

pub(crate) fn solve_catalog(
    catalog: &PackCatalog,
    requested: u64,
) -> Result<PackAssignment, SolveError> {
    if requested == 0 {
        return Err(SolveError::ZeroQuantity);
    }

    // Always derived from the catalog contents, never from caller ordering.
    let largest = catalog.largest().ok_or(SolveError::EmptyCatalog)?.items();

    let overflow = || SolveError::HorizonOverflow { requested, largest };
    let horizon = requested
        .checked_add(largest)
        .and_then(|h| usize::try_from(h).ok())
        .filter(|h| *h < usize::MAX)
        .ok_or_else(overflow)?;
    let target = requested as usize;

    // Ascending; every size fits in usize because it is <= horizon.
    let sizes: Vec<usize> = catalog.sizes().iter().map(|s| s.items() as usize).collect();

    // Fallible allocation: a horizon whose table cannot be addressed is an
    // error, not a panic.
    let mut table: Vec<Option<Reach>> = Vec::new();
    table
        .try_reserve_exact(horizon + 1)
        .map_err(|_| overflow())?;
    table.resize(horizon + 1, None);
    table[0] = Some(Reach {
        packs: 0,
        from: 0,
        pack: 0,
    });

    for x in 0..=horizon {
        let Some(here) = table[x] else { continue };
        let packs = here.packs + 1;

        for &size in &sizes {
            let next = x + size;
            if next > horizon {
                break;
            }
            match table[next] {
                Some(existing) if existing.packs <= packs => {}
                _ => {
                    table[next] = Some(Reach {
                        packs,
                        from: x,
                        pack: size,
                    })
                }
            }
        }
    }

    // Surplus is `sum - requested`, so each sum is its own surplus class and
    // its table entry already holds the fewest packs for it. The first
    // reachable sum at or above the request is the answer.
    let best_sum = table
        .iter()
        .enumerate()
        .skip(target)
        .find_map(|(sum, reach)| reach.is_some().then_some(sum));

    debug_assert!(best_sum.is_some(), "non-empty catalog always reaches the horizon");
    let Some(best_sum) = best_sum else {
        return Err(SolveError::NoFeasibleAssignment {
            horizon: horizon as u64,
        });
    };

    let mut tally: BTreeMap<PackSize, u64> = BTreeMap::new();
    let mut current = best_sum;
    while current > 0 {
        let Some(step) = table[current] else {
            return Err(SolveError::NoFeasibleAssignment {
                horizon: horizon as u64,
            });
        };
        let size = PackSize::new(step.pack as u64).map_err(|_| SolveError::ZeroPackSize)?;
        *tally.entry(size).or_insert(0) += 1;
        current = step.from;
    }

    Ok(PackAssignment::from_tally(requested, tally))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const CATALOG: [u64; 5] = [250, 500, 1000, 2000, 5000];

    fn counts(assignment: &PackAssignment) -> Vec<(u64, u64)> {
        assignment.iter().map(|(s, c)| (s.items(), c)).collect()
    }

    fn assert_solution(requested: u64, expected: &[(u64, u64)]) {
        let assignment = solve(&CATALOG, requested).unwrap();
        assert_eq!(counts(&assignment), expected, "requested = {requested}");
    }

    #[test]
    fn single_item_ships_smallest_pack() {
        assert_solution(1, &[(250, 1)]);
        let a = solve(&CATALOG, 1).unwrap();
        assert_eq!(a.surplus(), 249);
        assert_eq!(a.pack_count(), 1);
    }

    #[test]
    fn exact_fit_has_no_surplus() {
        assert_solution(250, &[(250, 1)]);
        assert_eq!(solve(&CATALOG, 250).unwrap().surplus(), 0);
    }

    #[test]
    fn one_larger_pack_beats_two_smaller() {
        // 250 + 250 also ships 500 items, but with two packs.
        assert_solution(251, &[(500, 1)]);
    }

    #[test]
    fn mixes_sizes_when_needed() {
        assert_solution(501, &[(500, 1), (250, 1)]);
    }

    #[test]
    fn large_orders() {
        assert_solution(12001, &[(5000, 2), (2000, 1), (250, 1)]);
        assert_solution(13001, &[(5000, 2), (2000, 1), (1000, 1), (250, 1)]);
    }

    #[test]
    fn surplus_wins_over_pack_count() {
        assert_solution(2390, &[(2000, 1), (500, 1)]);
        assert_eq!(solve(&CATALOG, 2390).unwrap().surplus(), 110);
    }

    #[test]
    fn ascending_and_descending_catalogs_agree() {
        let ascending = [23, 31, 53];
        let descending = [53, 31, 23];
        for requested in [1, 263, 500, 501, 12001] {
            let a = solve(&ascending, requested).unwrap();
            let b = solve(&descending, requested).unwrap();
            assert_eq!(a.surplus(), b.surplus(), "requested = {requested}");
            assert_eq!(a.pack_count(), b.pack_count(), "requested = {requested}");
        }
    }

    #[test]
    fn largest_pack_listed_last_still_bounds_the_search() {
        // 263 = 23*2 + 31*7 exactly.
        let a = solve(&[23, 31, 53], 263).unwrap();
        assert_eq!(a.surplus(), 0);
        assert_eq!(a.total_items(), 263);
    }

    #[test]
    fn coprime_sizes_reach_exact_totals() {
        let a = solve(&[3, 5], 7).unwrap();
        assert_eq!(a.total_items(), 8);
        assert_eq!(counts(&a), vec![(5, 1), (3, 1)]);
    }

    #[test]
    fn single_size_catalog() {
        let a = solve(&[7], 15).unwrap();
        assert_eq!(counts(&a), vec![(7, 3)]);
        assert_eq!(a.surplus(), 6);
    }

    #[test]
    fn invalid_input_is_rejected() {
        assert_eq!(solve(&[], 10), Err(SolveError::EmptyCatalog));
        assert_eq!(solve(&[250, 0], 10), Err(SolveError::ZeroPackSize));
        assert_eq!(solve(&[250, 250], 10), Err(SolveError::DuplicatePackSize(250)));
        assert_eq!(solve(&CATALOG, 0), Err(SolveError::ZeroQuantity));
        assert!(SolveError::ZeroQuantity.is_invalid_input());
    }

    #[test]
    fn horizon_overflow_is_reported() {
        let err = solve(&[u64::MAX], 2).unwrap_err();
        assert_eq!(
            err,
            SolveError::HorizonOverflow {
                requested: 2,
                largest: u64::MAX
            }
        );
        assert!(!err.is_invalid_input());
    }

    #[test]
    fn unaddressable_table_is_reported_not_panicked() {
        // The horizon fits u64 and usize, but its table does not fit memory.
        let err = solve(&[1 << 62], 1).unwrap_err();
        assert_eq!(
            err,
            SolveError::HorizonOverflow {
                requested: 1,
                largest: 1 << 62
            }
        );
    }

    #[test]
    fn solve_errors_map_to_domain_errors() {
        assert!(matches!(
            DomainError::from(SolveError::EmptyCatalog),
            DomainError::Validation(_)
        ));
        assert!(matches!(
            DomainError::from(SolveError::NoFeasibleAssignment { horizon: 10 }),
            DomainError::InvariantViolation(_)
        ));
    }

    #[test]
    fn repeated_calls_are_identical() {
        let first = solve(&CATALOG, 9_999).unwrap();
        let second = solve(&CATALOG, 9_999).unwrap();
        assert_eq!(first, second);
    }

    /// Exhaustive search over every multiset whose total stays within
    /// `requested + max`. Returns the lexicographically smallest
    /// `(surplus, pack_count)`.
    fn brute_force(sizes: &[u64], requested: u64) -> (u64, u64) {
        fn walk(
            sizes: &[u64],
            idx: usize,
            total: u64,
            packs: u64,
            requested: u64,
            limit: u64,
            best: &mut Option<(u64, u64)>,
        ) {
            if idx == sizes.len() {
                if total >= requested {
                    let candidate = (total - requested, packs);
                    if best.is_none_or(|b| candidate < b) {
                        *best = Some(candidate);
                    }
                }
                return;
            }
            let mut count = 0;
            loop {
                let sum = total + count * sizes[idx];
                if sum > limit {
                    break;
                }
                walk(sizes, idx + 1, sum, packs + count, requested, limit, best);
                count += 1;
            }
        }

        let limit = requested + sizes.iter().copied().max().unwrap_or(0);
        let mut best = None;
        walk(sizes, 0, 0, 0, requested, limit, &mut best);
        best.expect("non-empty catalog has a covering multiset")
    }

    fn catalog_strategy() -> impl Strategy<Value = Vec<u64>> {
        prop::collection::btree_set(3u64..40, 1..=3).prop_map(|s| s.into_iter().collect())
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: the result covers the request, has no zero-count entries
        /// and matches the exhaustive optimum on (surplus, pack count).
        #[test]
        fn matches_exhaustive_optimum(
            sizes in catalog_strategy(),
            requested in 1u64..120,
        ) {
            let assignment = solve(&sizes, requested).unwrap();

            prop_assert!(assignment.total_items() >= requested);
            prop_assert!(assignment.iter().all(|(_, count)| count >= 1));
            prop_assert!(assignment.iter().all(|(size, _)| sizes.contains(&size.items())));

            let (surplus, packs) = brute_force(&sizes, requested);
            prop_assert_eq!(assignment.surplus(), surplus);
            prop_assert_eq!(assignment.pack_count(), packs);
        }

        /// Property: catalog order never changes surplus or pack count.
        #[test]
        fn independent_of_catalog_order(
            sizes in catalog_strategy(),
            requested in 1u64..2_000,
        ) {
            let mut reversed = sizes.clone();
            reversed.reverse();

            let a = solve(&sizes, requested).unwrap();
            let b = solve(&reversed, requested).unwrap();
            prop_assert_eq!(a.surplus(), b.surplus());
            prop_assert_eq!(a.pack_count(), b.pack_count());
        }
    }
}
