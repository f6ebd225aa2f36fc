//! Diagnostic counters for callers that print or log a solution.

use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::fitness::evaluate;
use super::Solution;
use crate::engine::SearchContext;
use crate::ledger::CapacityLedger;
use crate::network::{AirportId, Continent, PackageId};
use crate::route::Route;

/// Shape of an assigned route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum RouteKind {
    AtDestination,
    Direct,
    OneStop,
    TwoStop,
}

impl RouteKind {
    pub fn of(route: &Route) -> Self {
        match route.hops() {
            0 => RouteKind::AtDestination,
            1 => RouteKind::Direct,
            2 => RouteKind::OneStop,
            _ => RouteKind::TwoStop,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RouteKindCounts {
    pub at_destination: usize,
    pub direct: usize,
    pub one_stop: usize,
    pub two_stop: usize,
}

impl RouteKindCounts {
    fn bump(&mut self, kind: RouteKind) {
        match kind {
            RouteKind::AtDestination => self.at_destination += 1,
            RouteKind::Direct => self.direct += 1,
            RouteKind::OneStop => self.one_stop += 1,
            RouteKind::TwoStop => self.two_stop += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.at_destination + self.direct + self.one_stop + self.two_stop
    }
}

/// Route shapes for packages leaving one continent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RouteHistogram {
    pub same_continent: RouteKindCounts,
    pub cross_continent: RouteKindCounts,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WarehousePeak {
    pub airport: AirportId,
    pub capacity: u32,
    /// Minute after T0 at which the peak is first reached.
    pub minute: usize,
    pub occupancy: u32,
}

/// Units delivered for a package before unitization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SourceDelivery {
    pub delivered_units: u32,
    pub total_units: u32,
}

/// Summary of a solution.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SolutionReport {
    pub total_packages: usize,
    pub assigned: usize,
    pub unassigned: usize,
    pub on_time: usize,
    pub delivered_units: u64,
    pub score: f64,
    /// Keyed by origin continent.
    pub routes: BTreeMap<Continent, RouteHistogram>,
    pub warehouse_peaks: Vec<WarehousePeak>,
    pub mean_flight_utilization: f64,
    pub mean_warehouse_utilization: f64,
    /// Keyed by the package each record reports under.
    pub by_source: BTreeMap<PackageId, SourceDelivery>,
}

impl SolutionReport {
    /// Builds the report. `ledger` must hold exactly this solution's
    /// bookings.
    pub fn build(ctx: &SearchContext<'_>, ledger: &CapacityLedger, solution: &Solution) -> Self {
        let breakdown = evaluate(ctx, ledger, solution);
        let mut routes: BTreeMap<Continent, RouteHistogram> = BTreeMap::new();
        for (&id, route) in solution.assignments() {
            let package = ctx.package(id);
            let hist = routes
                .entry(ctx.network.continent(package.origin))
                .or_default();
            let counts = if ctx.validator.same_continent(package) {
                &mut hist.same_continent
            } else {
                &mut hist.cross_continent
            };
            counts.bump(RouteKind::of(route));
        }

        let mut by_source: BTreeMap<PackageId, SourceDelivery> = BTreeMap::new();
        for package in ctx.packages {
            let entry = by_source.entry(package.report_id()).or_default();
            entry.total_units += package.unit_count();
            if solution.is_assigned(package.id) {
                entry.delivered_units += package.unit_count();
            }
        }

        let warehouse_peaks = ctx
            .network
            .airports()
            .iter()
            .filter_map(|a| {
                let (minute, occupancy) = ledger.peak_occupancy(a.id)?;
                Some(WarehousePeak {
                    airport: a.id,
                    capacity: ledger.warehouse_max(a.id),
                    minute,
                    occupancy,
                })
            })
            .collect();

        Self {
            total_packages: solution.total(),
            assigned: breakdown.assigned,
            unassigned: solution.unassigned_count(),
            on_time: breakdown.on_time,
            delivered_units: breakdown.units,
            score: breakdown.total,
            routes,
            warehouse_peaks,
            mean_flight_utilization: ledger.mean_active_flight_utilization(),
            mean_warehouse_utilization: breakdown.warehouse_utilization,
            by_source,
        }
    }

    /// The warehouse with the highest peak relative to its capacity.
    pub fn busiest_warehouse(&self) -> Option<&WarehousePeak> {
        self.warehouse_peaks
            .iter()
            .filter(|p| p.capacity > 0)
            .max_by(|a, b| {
                let ra = a.occupancy as f64 / a.capacity as f64;
                let rb = b.occupancy as f64 / b.capacity as f64;
                ra.total_cmp(&rb)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::unitize;
    use crate::test_fixtures::{corridor, package};

    #[test]
    fn test_report_counts() {
        let fx = corridor();
        let packages = vec![
            package(0, fx.lima, fx.quito, 48, 2),
            package(1, fx.lima, fx.brussels, 72, 1),
            package(2, fx.quito, fx.quito, 24, 1),
            package(3, fx.bogota, fx.quito, 48, 1),
        ];
        let ctx = SearchContext::new(&fx.network, &packages, &fx.params);
        let mut ledger = ctx.new_ledger();
        let mut s = Solution::new(4);
        assert!(s.try_assign(&ctx, &mut ledger, PackageId(0), Route::direct(fx.ac)));
        assert!(s.try_assign(&ctx, &mut ledger, PackageId(1), Route::new(vec![fx.ac, fx.cd])));
        assert!(s.try_assign(&ctx, &mut ledger, PackageId(2), Route::empty()));

        let report = SolutionReport::build(&ctx, &ledger, &s);
        assert_eq!(report.assigned, 3);
        assert_eq!(report.unassigned, 1);
        assert_eq!(report.on_time, 3);
        assert_eq!(report.delivered_units, 4);
        let america = &report.routes[&Continent::America];
        assert_eq!(america.same_continent.direct, 1);
        assert_eq!(america.cross_continent.one_stop, 1);
        assert_eq!(report.routes[&Continent::America].same_continent.at_destination, 1);
        assert_eq!(report.warehouse_peaks.len(), 4);
        let quito = report
            .warehouse_peaks
            .iter()
            .find(|p| p.airport == fx.c)
            .unwrap();
        assert_eq!(quito.occupancy, 3);
    }

    #[test]
    fn test_report_groups_units_by_source() {
        let fx = corridor();
        let originals = vec![package(0, fx.lima, fx.quito, 48, 3)];
        let packages = unitize(&originals);
        let ctx = SearchContext::new(&fx.network, &packages, &fx.params);
        let mut ledger = ctx.new_ledger();
        let mut s = Solution::new(packages.len());
        assert!(s.try_assign(&ctx, &mut ledger, PackageId(0), Route::direct(fx.ac)));
        assert!(s.try_assign(&ctx, &mut ledger, PackageId(2), Route::direct(fx.ac)));

        let report = SolutionReport::build(&ctx, &ledger, &s);
        assert_eq!(
            report.by_source[&PackageId(0)],
            SourceDelivery {
                delivered_units: 2,
                total_units: 3
            }
        );
    }
}
