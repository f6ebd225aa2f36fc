//! Core traits and result types for ALNS operators.

use rand::Rng;

use crate::engine::SearchContext;
use crate::ledger::CapacityLedger;
use crate::network::PackageId;
use crate::route::Route;
use crate::solution::Solution;

/// How much a destroy operator may remove.
///
/// Each operator applies [`destroy_count`](super::destroy_count) to the
/// size of its own candidate set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DestroyBudget {
    pub rate: f64,
    pub min: usize,
    pub max: usize,
}

impl DestroyBudget {
    #[inline]
    pub fn count(&self, size: usize) -> usize {
        super::config::destroy_count(size, self.rate, self.min, self.max)
    }

    /// Smallest candidate set worth acting on for a solution of `size`.
    #[inline]
    pub fn min_candidates(&self, size: usize) -> usize {
        self.min.min(size).max(1)
    }
}

/// Outcome of a destroy step: the shrunken solution and what was taken
/// out of it, with the routes the removed packages had.
#[derive(Debug, Clone)]
pub struct DestroyResult {
    pub partial: Solution,
    pub removed: Vec<(PackageId, Route)>,
}

impl DestroyResult {
    /// Nothing removed.
    pub fn unchanged(solution: &Solution) -> Self {
        Self {
            partial: solution.clone(),
            removed: Vec::new(),
        }
    }

    /// Removes `ids` (in order) from a copy of `solution`.
    pub fn take(solution: &Solution, ids: impl IntoIterator<Item = PackageId>) -> Self {
        let mut partial = solution.clone();
        let removed = ids
            .into_iter()
            .filter_map(|id| partial.remove(id).map(|route| (id, route)))
            .collect();
        Self { partial, removed }
    }
}

/// Outcome of a repair step.
#[derive(Debug, Clone)]
pub struct RepairResult {
    pub solution: Solution,
    /// Packages that were offered to the repair but remain unassigned.
    pub unassigned: Vec<PackageId>,
    pub inserted: usize,
}

/// A destroy operator removes assignments from a solution.
///
/// The ledger is read-only here (for utilization); the driver releases
/// the removed bookings afterwards. Operators must cope with an empty or
/// tiny solution by returning an unchanged result.
pub trait DestroyOperator: Send + Sync {
    fn name(&self) -> &str;

    fn destroy<R: Rng>(
        &self,
        ctx: &SearchContext<'_>,
        ledger: &CapacityLedger,
        solution: &Solution,
        budget: DestroyBudget,
        rng: &mut R,
    ) -> DestroyResult;
}

/// A repair operator reinserts pending packages.
///
/// `ledger` holds exactly the bookings of `partial`; the operator books
/// every package it inserts and nothing else.
pub trait RepairOperator: Send + Sync {
    fn name(&self) -> &str;

    fn repair<R: Rng>(
        &self,
        ctx: &SearchContext<'_>,
        ledger: &mut CapacityLedger,
        partial: Solution,
        pending: Vec<PackageId>,
        rng: &mut R,
    ) -> RepairResult;
}
