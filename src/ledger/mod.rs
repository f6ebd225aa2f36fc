//! Capacity ledger: flight seats, warehouse stock and per-minute warehouse
//! occupancy for one trial solution.
//!
//! The network itself is immutable; every search run owns its own ledger.
//! Rollback is value-based: [`CapacityLedger::snapshot`] copies every
//! counter and [`CapacityLedger::restore`] puts the copy back.

mod temporal;

pub use temporal::OccupancyWindow;

use crate::network::{AirportId, FlightId, Network, NetworkParams, Package};
use crate::route::Route;
use crate::solution::Solution;

use temporal::TemporalGrid;

/// Frozen copy of every mutable counter of a [`CapacityLedger`].
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerState {
    flight_used: Vec<u32>,
    warehouse_used: Vec<u32>,
    temporal: TemporalGrid,
}

/// Mutable capacity bookkeeping over a read-only [`Network`].
///
/// # Examples
///
/// ```
/// use u_airfreight::ledger::CapacityLedger;
/// use u_airfreight::network::{Continent, NetworkBuilder, NetworkParams};
/// use u_airfreight::route::Route;
///
/// let mut b = NetworkBuilder::new();
/// let lima = b.add_city("Lima", Continent::America).unwrap();
/// let cusco = b.add_city("Cusco", Continent::America).unwrap();
/// let lim = b.add_airport(lima, Some(50));
/// let cuz = b.add_airport(cusco, Some(50));
/// let f = b.add_flight(lim, cuz, 1.5, 2);
/// let network = b.build().unwrap();
///
/// let mut ledger = CapacityLedger::new(&network, &NetworkParams::default(), 0);
/// let before = ledger.snapshot();
/// assert!(ledger.reserve(&Route::direct(f), 2));
/// assert!(!ledger.reserve(&Route::direct(f), 1));
/// ledger.restore(before);
/// assert_eq!(ledger.flight_used(f), 0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct CapacityLedger {
    flight_used: Vec<u32>,
    flight_max: Vec<u32>,
    warehouse_used: Vec<u32>,
    warehouse_max: Vec<u32>,
    temporal: TemporalGrid,
    params: NetworkParams,
    t0: i64,
}

impl CapacityLedger {
    /// Creates an empty ledger whose temporal horizon starts at `t0`.
    pub fn new(network: &Network, params: &NetworkParams, t0: i64) -> Self {
        let airports = network.airports();
        Self {
            flight_used: vec![0; network.flights().len()],
            flight_max: network.flights().iter().map(|f| f.max_capacity).collect(),
            warehouse_used: vec![0; airports.len()],
            warehouse_max: airports
                .iter()
                .map(|a| a.warehouse.map_or(0, |w| w.max_capacity))
                .collect(),
            temporal: TemporalGrid::new(
                airports.iter().map(|a| a.warehouse.map(|w| w.max_capacity)),
                params.horizon_minutes(),
            ),
            params: params.clone(),
            t0,
        }
    }

    #[inline]
    pub fn t0(&self) -> i64 {
        self.t0
    }

    #[inline]
    pub fn params(&self) -> &NetworkParams {
        &self.params
    }

    #[inline]
    pub fn flight_used(&self, flight: FlightId) -> u32 {
        self.flight_used[flight.index()]
    }

    #[inline]
    pub fn flight_max(&self, flight: FlightId) -> u32 {
        self.flight_max[flight.index()]
    }

    #[inline]
    pub fn flight_utilization(&self, flight: FlightId) -> f64 {
        let max = self.flight_max[flight.index()];
        if max == 0 {
            return 0.0;
        }
        self.flight_used[flight.index()] as f64 / max as f64
    }

    /// True when every flight of `route` can take `units` more.
    pub fn fits(&self, route: &Route, units: u32) -> bool {
        route.flights().iter().all(|&f| {
            self.flight_used[f.index()] as u64 + units as u64 <= self.flight_max[f.index()] as u64
        })
    }

    /// Adds `units` to every flight of `route`. All or nothing.
    pub fn reserve(&mut self, route: &Route, units: u32) -> bool {
        if !self.fits(route, units) {
            return false;
        }
        for &f in route.flights() {
            self.flight_used[f.index()] += units;
        }
        true
    }

    /// Removes `units` from every flight of `route`. Refuses, without
    /// mutating, if any counter would go negative.
    pub fn release(&mut self, route: &Route, units: u32) -> bool {
        if route
            .flights()
            .iter()
            .any(|&f| self.flight_used[f.index()] < units)
        {
            return false;
        }
        for &f in route.flights() {
            self.flight_used[f.index()] -= units;
        }
        true
    }

    #[inline]
    pub fn warehouse_used(&self, airport: AirportId) -> u32 {
        self.warehouse_used[airport.index()]
    }

    #[inline]
    pub fn warehouse_max(&self, airport: AirportId) -> u32 {
        self.warehouse_max[airport.index()]
    }

    /// Whether the warehouse at `airport` can store `units` more.
    /// Airports without a warehouse never can.
    pub fn has_warehouse_capacity(&self, airport: AirportId, units: u32) -> bool {
        let i = airport.index();
        self.warehouse_max[i] > 0
            && self.warehouse_used[i] as u64 + units as u64 <= self.warehouse_max[i] as u64
    }

    pub fn reserve_warehouse(&mut self, airport: AirportId, units: u32) -> bool {
        if !self.has_warehouse_capacity(airport, units) {
            return false;
        }
        self.warehouse_used[airport.index()] += units;
        true
    }

    pub fn release_warehouse(&mut self, airport: AirportId, units: u32) -> bool {
        let used = &mut self.warehouse_used[airport.index()];
        if *used < units {
            return false;
        }
        *used -= units;
        true
    }

    /// Occupies `units` at `airport` for every minute of
    /// `[start, start + duration)`, clamped to the horizon. Fails without
    /// touching any slot if one would exceed the warehouse capacity.
    pub fn reserve_temporal(
        &mut self,
        airport: AirportId,
        start_minute: i64,
        duration_minutes: i64,
        units: u32,
    ) -> bool {
        let window = OccupancyWindow {
            airport,
            start: start_minute,
            end: start_minute.saturating_add(duration_minutes),
        };
        self.temporal.reserve_all(&[window], units)
    }

    /// Occupancy of `airport` at `minute` (relative to T0).
    pub fn occupancy_at(&self, airport: AirportId, minute: usize) -> u32 {
        self.temporal.at(airport, minute)
    }

    /// Peak per-minute occupancy of `airport` as `(minute, units)`, or
    /// `None` for airports without a warehouse.
    pub fn peak_occupancy(&self, airport: AirportId) -> Option<(usize, u32)> {
        self.temporal.peak(airport)
    }

    /// Warehouse windows a package holds while travelling along `route`.
    ///
    /// Windows start `route.delay_minutes()` after the order. Departure
    /// stock waits `processing_minutes` before each flight,
    /// every arrival holds `connection_minutes` (or `pickup_minutes` at
    /// the final stop). An empty route only holds the pickup window at
    /// the destination.
    pub fn occupancy_windows(
        &self,
        network: &Network,
        package: &Package,
        route: &Route,
    ) -> Option<Vec<OccupancyWindow>> {
        let p = &self.params;
        let mut cur = package.order_minute - self.t0 + route.delay_minutes();
        if route.is_empty() {
            let airport = network.airport_of_city(package.destination)?;
            return Some(vec![OccupancyWindow {
                airport,
                start: cur,
                end: cur + p.pickup_minutes,
            }]);
        }
        let mut windows = Vec::with_capacity(route.hops() * 2);
        let last = route.hops() - 1;
        for (i, &fid) in route.flights().iter().enumerate() {
            let flight = network.flight(fid);
            windows.push(OccupancyWindow {
                airport: flight.origin,
                start: cur,
                end: cur + p.processing_minutes,
            });
            cur += p.processing_minutes + flight.transport_minutes();
            let hold = if i == last {
                p.pickup_minutes
            } else {
                p.connection_minutes
            };
            windows.push(OccupancyWindow {
                airport: flight.destination,
                start: cur,
                end: cur + hold,
            });
            if i != last {
                cur += p.connection_minutes;
            }
        }
        Some(windows)
    }

    /// Books everything a (package, route) assignment consumes: flight
    /// seats, destination warehouse stock and the temporal windows.
    ///
    /// All or nothing: on failure the ledger is unchanged.
    pub fn reserve_assignment(&mut self, network: &Network, package: &Package, route: &Route) -> bool {
        let units = package.unit_count();
        let Some(dest) = network.airport_of_city(package.destination) else {
            return false;
        };
        let Some(windows) = self.occupancy_windows(network, package, route) else {
            return false;
        };
        if !self.fits(route, units)
            || !self.has_warehouse_capacity(dest, units)
            || !self.temporal.can_reserve(&windows, units)
        {
            return false;
        }
        self.reserve(route, units);
        self.reserve_warehouse(dest, units);
        self.temporal.reserve_all(&windows, units);
        true
    }

    /// Reverses [`reserve_assignment`](Self::reserve_assignment).
    pub fn release_assignment(&mut self, network: &Network, package: &Package, route: &Route) -> bool {
        let units = package.unit_count();
        let Some(dest) = network.airport_of_city(package.destination) else {
            return false;
        };
        let Some(windows) = self.occupancy_windows(network, package, route) else {
            return false;
        };
        if route
            .flights()
            .iter()
            .any(|&f| self.flight_used[f.index()] < units)
            || self.warehouse_used[dest.index()] < units
        {
            return false;
        }
        self.release(route, units);
        self.release_warehouse(dest, units);
        self.temporal.release_all(&windows, units);
        true
    }

    /// Copies every mutable counter.
    pub fn snapshot(&self) -> LedgerState {
        LedgerState {
            flight_used: self.flight_used.clone(),
            warehouse_used: self.warehouse_used.clone(),
            temporal: self.temporal.clone(),
        }
    }

    /// Replaces every mutable counter with the snapshot's.
    pub fn restore(&mut self, state: LedgerState) {
        debug_assert_eq!(state.flight_used.len(), self.flight_used.len());
        debug_assert_eq!(state.warehouse_used.len(), self.warehouse_used.len());
        self.flight_used = state.flight_used;
        self.warehouse_used = state.warehouse_used;
        self.temporal = state.temporal;
    }

    /// Zeroes every counter.
    pub fn clear(&mut self) {
        self.flight_used.iter_mut().for_each(|u| *u = 0);
        self.warehouse_used.iter_mut().for_each(|u| *u = 0);
        self.temporal.clear();
    }

    /// Zeroes every counter and replays the reservations of `solution`.
    ///
    /// Returns `false` if some assignment no longer fits; the remaining
    /// assignments are still replayed.
    #[tracing::instrument(level = "trace", skip_all, fields(assigned = solution.assigned_count()))]
    pub fn rebuild_from(&mut self, network: &Network, packages: &[Package], solution: &Solution) -> bool {
        self.clear();
        let mut ok = true;
        for (pid, route) in solution.assignments() {
            if !self.reserve_assignment(network, &packages[pid.index()], route) {
                tracing::warn!(package = %pid, hops = route.hops(), "assignment does not fit during rebuild");
                ok = false;
            }
        }
        ok
    }

    /// Mean of used/max over flights that carry anything.
    pub fn mean_active_flight_utilization(&self) -> f64 {
        let (sum, n) = self
            .flight_used
            .iter()
            .zip(&self.flight_max)
            .filter(|(&u, &m)| u > 0 && m > 0)
            .fold((0.0, 0usize), |(s, n), (&u, &m)| (s + u as f64 / m as f64, n + 1));
        if n == 0 {
            0.0
        } else {
            sum / n as f64
        }
    }

    /// Mean of used/max over all warehouses.
    pub fn mean_warehouse_utilization(&self) -> f64 {
        let (sum, n) = self
            .warehouse_used
            .iter()
            .zip(&self.warehouse_max)
            .filter(|(_, &m)| m > 0)
            .fold((0.0, 0usize), |(s, n), (&u, &m)| (s + u as f64 / m as f64, n + 1));
        if n == 0 {
            0.0
        } else {
            sum / n as f64
        }
    }

    /// Checks every counter against its bound.
    pub fn within_bounds(&self) -> bool {
        self.flight_used
            .iter()
            .zip(&self.flight_max)
            .all(|(u, m)| u <= m)
            && self
                .warehouse_used
                .iter()
                .zip(&self.warehouse_max)
                .all(|(u, m)| u <= m)
            && self.temporal.within_bounds()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::PackageId;
    use crate::test_fixtures::{corridor, package};
    use proptest::prelude::*;

    #[test]
    fn test_reserve_release_flights() {
        let fx = corridor();
        let mut ledger = CapacityLedger::new(&fx.network, &fx.params, 0);
        let route = Route::new(vec![fx.ab, fx.bc]);
        assert!(ledger.reserve(&route, 60));
        assert_eq!(ledger.flight_used(fx.ab), 60);
        assert!(!ledger.reserve(&route, 41));
        assert_eq!(ledger.flight_used(fx.ab), 60);
        assert!(ledger.release(&route, 60));
        assert!(!ledger.release(&route, 1));
        assert_eq!(ledger.flight_used(fx.bc), 0);
    }

    #[test]
    fn test_warehouse_without_storage_never_fits() {
        let fx = corridor();
        let mut ledger = CapacityLedger::new(&fx.network, &fx.params, 0);
        assert!(!ledger.has_warehouse_capacity(fx.e, 1));
        assert!(!ledger.reserve_warehouse(fx.e, 1));
        assert!(!ledger.reserve_temporal(fx.e, 0, 10, 1));
    }

    #[test]
    fn test_reserve_temporal_is_atomic() {
        let fx = corridor();
        let mut ledger = CapacityLedger::new(&fx.network, &fx.params, 0);
        assert!(ledger.reserve_temporal(fx.a, 100, 10, 995));
        let before = ledger.clone();
        // overlaps minutes 100..110 where only 5 units remain
        assert!(!ledger.reserve_temporal(fx.a, 50, 100, 6));
        assert_eq!(ledger, before);
        assert!(ledger.reserve_temporal(fx.a, 50, 100, 5));
        assert_eq!(ledger.occupancy_at(fx.a, 105), 1000);
        assert_eq!(ledger.occupancy_at(fx.a, 50), 5);
        assert_eq!(ledger.occupancy_at(fx.a, 150), 0);
    }

    #[test]
    fn test_temporal_clamped_to_horizon() {
        let fx = corridor();
        let mut ledger = CapacityLedger::new(&fx.network, &fx.params, 0);
        let horizon = fx.params.horizon_minutes() as i64;
        assert!(ledger.reserve_temporal(fx.a, horizon - 5, 60, 3));
        assert_eq!(ledger.occupancy_at(fx.a, horizon as usize - 1), 3);
        // entirely past the horizon books nothing but succeeds
        assert!(ledger.reserve_temporal(fx.a, horizon + 10, 60, 3));
    }

    #[test]
    fn test_occupancy_windows_follow_route() {
        let fx = corridor();
        let ledger = CapacityLedger::new(&fx.network, &fx.params, 0);
        let pkg = package(0, fx.lima, fx.quito, 48, 1);
        let route = Route::new(vec![fx.ab, fx.bc]);
        let windows = ledger.occupancy_windows(&fx.network, &pkg, &route).unwrap();
        let spans: Vec<_> = windows.iter().map(|w| (w.airport, w.start, w.end)).collect();
        assert_eq!(
            spans,
            vec![
                (fx.a, 0, 120),
                (fx.b, 360, 480),
                (fx.b, 480, 600),
                (fx.c, 900, 1020),
            ]
        );
    }

    #[test]
    fn test_reserve_assignment_rolls_back_on_warehouse_shortage() {
        let fx = corridor();
        let mut ledger = CapacityLedger::new(&fx.network, &fx.params, 0);
        assert!(ledger.reserve_warehouse(fx.c, 999));
        let before = ledger.clone();
        let pkg = package(0, fx.lima, fx.quito, 48, 2);
        assert!(!ledger.reserve_assignment(&fx.network, &pkg, &Route::direct(fx.ac)));
        assert_eq!(ledger, before);
    }

    #[test]
    fn test_assignment_round_trip() {
        let fx = corridor();
        let mut ledger = CapacityLedger::new(&fx.network, &fx.params, 0);
        let empty = ledger.clone();
        let pkg = package(0, fx.lima, fx.quito, 48, 4);
        let route = Route::new(vec![fx.ab, fx.bc]);
        assert!(ledger.reserve_assignment(&fx.network, &pkg, &route));
        assert_eq!(ledger.flight_used(fx.ab), 4);
        assert_eq!(ledger.warehouse_used(fx.c), 4);
        assert_eq!(ledger.peak_occupancy(fx.b).map(|p| p.1), Some(4));
        assert!(ledger.release_assignment(&fx.network, &pkg, &route));
        assert_eq!(ledger, empty);
    }

    #[test]
    fn test_empty_route_holds_destination_only() {
        let fx = corridor();
        let mut ledger = CapacityLedger::new(&fx.network, &fx.params, 0);
        let pkg = package(0, fx.quito, fx.quito, 24, 3);
        assert!(ledger.reserve_assignment(&fx.network, &pkg, &Route::empty()));
        assert!(fx.network.flights().iter().all(|f| ledger.flight_used(f.id) == 0));
        assert_eq!(ledger.occupancy_at(fx.c, 0), 3);
        assert_eq!(ledger.occupancy_at(fx.c, 120), 0);
    }

    #[test]
    fn test_rebuild_from_matches_incremental() {
        let fx = corridor();
        let packages = vec![
            package(0, fx.lima, fx.quito, 48, 2),
            package(1, fx.bogota, fx.quito, 48, 5),
        ];
        let mut solution = Solution::new(packages.len());
        let mut incremental = CapacityLedger::new(&fx.network, &fx.params, 0);
        let r0 = Route::new(vec![fx.ab, fx.bc]);
        let r1 = Route::direct(fx.bc);
        assert!(incremental.reserve_assignment(&fx.network, &packages[0], &r0));
        assert!(incremental.reserve_assignment(&fx.network, &packages[1], &r1));
        solution.insert(PackageId(0), r0);
        solution.insert(PackageId(1), r1);

        let mut rebuilt = CapacityLedger::new(&fx.network, &fx.params, 0);
        rebuilt.reserve(&Route::direct(fx.cd), 7);
        assert!(rebuilt.rebuild_from(&fx.network, &packages, &solution));
        assert_eq!(rebuilt, incremental);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Reserve(usize, u32),
        Release(usize, u32),
        Temporal(usize, i64, i64, u32),
        Warehouse(usize, u32),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0usize..7, 0u32..120).prop_map(|(f, u)| Op::Reserve(f, u)),
            (0usize..7, 0u32..120).prop_map(|(f, u)| Op::Release(f, u)),
            (0usize..5, -100i64..6000, 0i64..500, 0u32..600)
                .prop_map(|(a, s, d, u)| Op::Temporal(a, s, d, u)),
            (0usize..5, 0u32..600).prop_map(|(a, u)| Op::Warehouse(a, u)),
        ]
    }

    fn apply(ledger: &mut CapacityLedger, op: &Op) {
        match *op {
            Op::Reserve(f, u) => {
                ledger.reserve(&Route::direct(FlightId(f)), u);
            }
            Op::Release(f, u) => {
                ledger.release(&Route::direct(FlightId(f)), u);
            }
            Op::Temporal(a, s, d, u) => {
                ledger.reserve_temporal(AirportId(a), s, d, u);
            }
            Op::Warehouse(a, u) => {
                ledger.reserve_warehouse(AirportId(a), u);
            }
        }
    }

    proptest! {
        #[test]
        fn prop_snapshot_restore_is_exact(
            setup in prop::collection::vec(op_strategy(), 0..20),
            noise in prop::collection::vec(op_strategy(), 0..40),
        ) {
            let fx = corridor();
            let mut ledger = CapacityLedger::new(&fx.network, &fx.params, 0);
            for op in &setup {
                apply(&mut ledger, op);
            }
            let reference = ledger.clone();
            let snap = ledger.snapshot();
            for op in &noise {
                apply(&mut ledger, op);
            }
            ledger.restore(snap);
            prop_assert_eq!(ledger, reference);
        }

        #[test]
        fn prop_counters_stay_within_bounds(ops in prop::collection::vec(op_strategy(), 0..60)) {
            let fx = corridor();
            let mut ledger = CapacityLedger::new(&fx.network, &fx.params, 0);
            for op in &ops {
                apply(&mut ledger, op);
            }
            prop_assert!(ledger.within_bounds());
        }
    }
}
