//! Package-to-route assignments, fitness and diagnostics.

mod fitness;
mod report;

pub use fitness::{evaluate, ScoreBreakdown};
pub use report::{RouteKind, RouteKindCounts, RouteHistogram, SolutionReport, SourceDelivery, WarehousePeak};

use std::collections::{BTreeMap, BTreeSet};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::engine::SearchContext;
use crate::ledger::CapacityLedger;
use crate::network::PackageId;
use crate::route::Route;

/// A (partial) assignment of packages to routes.
///
/// Every package is either assigned or unassigned, never both:
/// `assigned_count() + unassigned_count() == total()` after every
/// mutation. The score is a cache cleared by any mutation.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Solution {
    assignments: BTreeMap<PackageId, Route>,
    unassigned: BTreeSet<PackageId>,
    total: usize,
    #[cfg_attr(feature = "serde", serde(skip))]
    score: Option<f64>,
}

impl Solution {
    /// A solution over `total` packages with nothing assigned.
    pub fn new(total: usize) -> Self {
        Self {
            assignments: BTreeMap::new(),
            unassigned: (0..total).map(PackageId).collect(),
            total,
            score: None,
        }
    }

    #[inline]
    pub fn assignments(&self) -> &BTreeMap<PackageId, Route> {
        &self.assignments
    }

    #[inline]
    pub fn unassigned(&self) -> &BTreeSet<PackageId> {
        &self.unassigned
    }

    #[inline]
    pub fn route_of(&self, id: PackageId) -> Option<&Route> {
        self.assignments.get(&id)
    }

    #[inline]
    pub fn is_assigned(&self, id: PackageId) -> bool {
        self.assignments.contains_key(&id)
    }

    #[inline]
    pub fn assigned_count(&self) -> usize {
        self.assignments.len()
    }

    #[inline]
    pub fn unassigned_count(&self) -> usize {
        self.unassigned.len()
    }

    #[inline]
    pub fn total(&self) -> usize {
        self.total
    }

    /// Assigns `id` to `route`, returning the route it replaced.
    pub fn insert(&mut self, id: PackageId, route: Route) -> Option<Route> {
        debug_assert!(id.index() < self.total);
        self.score = None;
        self.unassigned.remove(&id);
        self.assignments.insert(id, route)
    }

    /// Unassigns `id`, returning its route if it had one.
    pub fn remove(&mut self, id: PackageId) -> Option<Route> {
        let route = self.assignments.remove(&id)?;
        self.score = None;
        self.unassigned.insert(id);
        Some(route)
    }

    /// Replaces the route of an assigned package. Unassigned packages are
    /// left alone and `None` is returned.
    pub fn reassign(&mut self, id: PackageId, route: Route) -> Option<Route> {
        let slot = self.assignments.get_mut(&id)?;
        self.score = None;
        Some(std::mem::replace(slot, route))
    }

    /// Exchanges the routes of two assigned packages.
    pub fn swap(&mut self, a: PackageId, b: PackageId) -> bool {
        if a == b || !self.is_assigned(a) || !self.is_assigned(b) {
            return false;
        }
        let (Some(ra), Some(rb)) = (self.assignments.remove(&a), self.assignments.remove(&b)) else {
            return false;
        };
        self.assignments.insert(a, rb);
        self.assignments.insert(b, ra);
        self.score = None;
        true
    }

    /// Marks every package as unassigned.
    pub fn clear(&mut self) {
        self.assignments.clear();
        self.unassigned = (0..self.total).map(PackageId).collect();
        self.score = None;
    }

    /// Validates, checks warehouse stock and books `route` for `id`, then
    /// records the assignment. Nothing changes when any step fails.
    pub fn try_assign(
        &mut self,
        ctx: &SearchContext<'_>,
        ledger: &mut CapacityLedger,
        id: PackageId,
        route: Route,
    ) -> bool {
        let package = ctx.package(id);
        let units = package.unit_count();
        let Some(dest) = ctx.network.airport_of_city(package.destination) else {
            return false;
        };
        if !ctx.validator.is_valid(ledger, package, &route, units)
            || !ledger.has_warehouse_capacity(dest, units)
            || !ledger.reserve_assignment(ctx.network, package, &route)
        {
            return false;
        }
        self.insert(id, route);
        true
    }

    /// Releases the booking of `id` and unassigns it.
    pub fn unassign(
        &mut self,
        ctx: &SearchContext<'_>,
        ledger: &mut CapacityLedger,
        id: PackageId,
    ) -> Option<Route> {
        let route = self.remove(id)?;
        let released = ledger.release_assignment(ctx.network, ctx.package(id), &route);
        debug_assert!(released, "ledger lost the booking of {id}");
        Some(route)
    }

    /// Cached score, if still fresh.
    #[inline]
    pub fn cached_score(&self) -> Option<f64> {
        self.score
    }

    /// Score of this solution, recomputed only after a mutation.
    ///
    /// `ledger` must reflect exactly this solution's bookings.
    pub fn score(&mut self, ctx: &SearchContext<'_>, ledger: &CapacityLedger) -> f64 {
        if let Some(s) = self.score {
            return s;
        }
        let s = evaluate(ctx, ledger, self).total;
        self.score = Some(s);
        s
    }

    /// Whether assigned and unassigned partition all packages.
    pub fn is_conserved(&self) -> bool {
        self.assignments.len() + self.unassigned.len() == self.total
            && self.assignments.keys().all(|id| !self.unassigned.contains(id))
    }

    /// Re-verifies the solution from scratch: conservation, route
    /// structure and timing for every pair, and that a fresh ledger can
    /// hold all bookings.
    pub fn check(&self, ctx: &SearchContext<'_>) -> Result<(), String> {
        if !self.is_conserved() {
            return Err(format!(
                "{} assigned + {} unassigned != {} packages",
                self.assignments.len(),
                self.unassigned.len(),
                self.total
            ));
        }
        let mut ledger = ctx.new_ledger();
        for (&id, route) in &self.assignments {
            let package = ctx.package(id);
            if !ctx.validator.is_well_formed(package, route)
                || !ctx.validator.meets_deadline(package, route)
            {
                return Err(format!("{id} is assigned an invalid route"));
            }
            if !ledger.reserve_assignment(ctx.network, package, route) {
                return Err(format!("{id} does not fit the capacity left by earlier packages"));
            }
        }
        Ok(())
    }
}
