//! Solution fitness. Higher is better.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::Solution;
use crate::engine::SearchContext;
use crate::ledger::CapacityLedger;
use crate::network::Package;
use crate::route::Route;

const W_ASSIGNED: f64 = 100_000.0;
const W_UNITS: f64 = 10_000.0;
const W_ON_TIME: f64 = 5_000.0;
const W_MARGIN: f64 = 50.0;
const MARGIN_CAP: f64 = 1_000.0;
const W_CONTINENTAL: f64 = 500.0;
const W_FLIGHT_UTIL: f64 = 200.0;
const W_WAREHOUSE_UTIL: f64 = 100.0;
const W_DELIVERY_TIME: f64 = 20.0;
const W_COMPLEXITY: f64 = 50.0;
const W_PRIORITY: f64 = 1_000.0;
/// Priority counted per package; keeps one package's priority below the
/// worth of assigning another.
const PRIORITY_CAP: f64 = 10.0;

const LOW_ON_TIME: f64 = 0.8;
const HIGH_ON_TIME: f64 = 0.95;
const HIGH_VOLUME: usize = 1000;
/// Flights below this utilization count against multi-hop routes.
const UNDERUSED_FLIGHT: f64 = 0.3;

/// Every term that went into a score.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ScoreBreakdown {
    pub assigned: usize,
    pub units: u64,
    /// Sum of the (capped) priorities of assigned packages.
    pub priority: f64,
    pub on_time: usize,
    pub on_time_rate: f64,
    /// Mean unused hours over on-time deliveries.
    pub avg_margin_hours: f64,
    pub continental_efficiency: f64,
    pub avg_flight_utilization: f64,
    pub warehouse_utilization: f64,
    pub avg_delivery_hours: f64,
    pub routing_complexity: f64,
    /// Product of the global modifiers that were applied.
    pub modifier: f64,
    pub total: f64,
}

/// How well a route's hop count fits its continental pairing.
fn continental_efficiency(route: &Route, same_continent: bool) -> f64 {
    match (same_continent, route.hops()) {
        (_, 0) => 1.0,
        (true, 1) => 1.0,
        (true, 2) => 0.8,
        (false, 1) => 1.2,
        (false, 2) => 1.0,
        _ => -0.5,
    }
}

/// Extra hops over the expected count, doubled, plus one per underused
/// flight on multi-hop routes.
fn routing_complexity(route: &Route, same_continent: bool, ledger: &CapacityLedger) -> f64 {
    let expected = if same_continent { 1 } else { 2 };
    let extra = route.hops().saturating_sub(expected) as f64 * 2.0;
    let underused = if route.hops() > 1 {
        route
            .flights()
            .iter()
            .filter(|&&f| ledger.flight_utilization(f) < UNDERUSED_FLIGHT)
            .count() as f64
    } else {
        0.0
    };
    extra + underused
}

/// Scores `solution` against the bookings in `ledger`.
///
/// Coverage dominates: each assigned package and each delivered unit
/// outweighs every quality term combined. Among assigned packages,
/// higher priority scores higher. The sum is then halved when
/// fewer than 80% of deliveries are on time, and raised by 10% above 95%
/// (more than ten packages) and by 15% past a thousand packages.
pub fn evaluate(
    ctx: &SearchContext<'_>,
    ledger: &CapacityLedger,
    solution: &Solution,
) -> ScoreBreakdown {
    let mut b = ScoreBreakdown {
        modifier: 1.0,
        ..Default::default()
    };
    let mut margin_sum = 0.0;
    let mut hours_sum = 0.0;
    let mut efficiency_sum = 0.0;
    let mut complexity_sum = 0.0;
    let mut util_sum = 0.0;
    let mut legs = 0usize;

    for (&id, route) in solution.assignments() {
        let package: &Package = ctx.package(id);
        let same = ctx.validator.same_continent(package);
        let hours = ctx.validator.route_hours(route) + route.delay_hours();
        b.assigned += 1;
        b.units += package.unit_count() as u64;
        b.priority += package.priority.min(PRIORITY_CAP);
        hours_sum += hours;
        if ctx.validator.is_on_time(package, route) {
            b.on_time += 1;
            margin_sum += package.budget_hours() - hours;
        }
        efficiency_sum += continental_efficiency(route, same);
        complexity_sum += routing_complexity(route, same, ledger);
        for &f in route.flights() {
            util_sum += ledger.flight_utilization(f);
            legs += 1;
        }
    }

    if b.assigned > 0 {
        let n = b.assigned as f64;
        b.on_time_rate = b.on_time as f64 / n;
        b.avg_delivery_hours = hours_sum / n;
        b.continental_efficiency = efficiency_sum / n;
        b.routing_complexity = complexity_sum / n;
    }
    if b.on_time > 0 {
        b.avg_margin_hours = margin_sum / b.on_time as f64;
    }
    if legs > 0 {
        b.avg_flight_utilization = util_sum / legs as f64;
    }
    b.warehouse_utilization = ledger.mean_warehouse_utilization();

    let mut total = b.assigned as f64 * W_ASSIGNED
        + b.units as f64 * W_UNITS
        + b.priority * W_PRIORITY
        + b.on_time_rate * W_ON_TIME
        + (b.avg_margin_hours * W_MARGIN).clamp(0.0, MARGIN_CAP)
        + b.continental_efficiency * W_CONTINENTAL
        + b.avg_flight_utilization * W_FLIGHT_UTIL
        + b.warehouse_utilization * W_WAREHOUSE_UTIL
        - b.avg_delivery_hours * W_DELIVERY_TIME
        - b.routing_complexity * W_COMPLEXITY;

    if b.on_time_rate < LOW_ON_TIME {
        b.modifier *= 0.5;
    }
    if b.on_time_rate >= HIGH_ON_TIME && b.assigned > 10 {
        b.modifier *= 1.1;
    }
    if b.assigned > HIGH_VOLUME {
        b.modifier *= 1.15;
    }
    total *= b.modifier;
    b.total = total;
    b
}
