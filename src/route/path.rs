//! The route value type and its timing arithmetic.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::network::{AirportId, FlightId, Network, NetworkParams, PackageId};

/// An ordered chain of flights. Empty means "already at destination".
///
/// A route may hold its package at the origin for `delay_minutes` after
/// the order before the first departure; every warehouse window shifts
/// by the same amount.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Route {
    flights: Vec<FlightId>,
    #[cfg_attr(feature = "serde", serde(default))]
    delay_minutes: i64,
}

impl Route {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(flights: Vec<FlightId>) -> Self {
        Self {
            flights,
            delay_minutes: 0,
        }
    }

    pub fn direct(flight: FlightId) -> Self {
        Self::new(vec![flight])
    }

    /// The same flights, departing `minutes` later than the order allows.
    pub fn with_delay(mut self, minutes: i64) -> Self {
        self.delay_minutes = minutes.max(0);
        self
    }

    #[inline]
    pub fn delay_minutes(&self) -> i64 {
        self.delay_minutes
    }

    #[inline]
    pub fn delay_hours(&self) -> f64 {
        self.delay_minutes as f64 / 60.0
    }

    #[inline]
    pub fn flights(&self) -> &[FlightId] {
        &self.flights
    }

    #[inline]
    pub fn hops(&self) -> usize {
        self.flights.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.flights.is_empty()
    }

    /// Airports visited, origin first. Empty for an empty route.
    pub fn airports(&self, network: &Network) -> Vec<AirportId> {
        let mut out = Vec::with_capacity(self.flights.len() + 1);
        if let Some(&first) = self.flights.first() {
            out.push(network.flight(first).origin);
        }
        out.extend(self.flights.iter().map(|&f| network.flight(f).destination));
        out
    }

    /// Sum of flight hours plus the per-connection overhead.
    pub fn total_hours(&self, network: &Network, params: &NetworkParams) -> f64 {
        if self.flights.is_empty() {
            return 0.0;
        }
        let flying: f64 = self
            .flights
            .iter()
            .map(|&f| network.flight(f).transport_hours)
            .sum();
        flying + (self.flights.len() - 1) as f64 * params.connection_hours()
    }
}

impl From<Vec<FlightId>> for Route {
    fn from(flights: Vec<FlightId>) -> Self {
        Self::new(flights)
    }
}

#[inline]
fn splitmix64(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Safety margin applied multiplicatively to a route's total time.
///
/// Always in `[0.01, 0.05]`. The step is drawn from a stable hash of the
/// package and its flights, spread over `min(complexity, 5)` levels where
/// complexity is the hop count plus 2 for cross-continent pairs. Longer
/// and intercontinental routes can draw larger margins; the same pair
/// always draws the same one.
pub fn safety_margin(package: PackageId, route: &Route, cross_continent: bool) -> f64 {
    let complexity = route.hops() + if cross_continent { 2 } else { 0 };
    let levels = complexity.clamp(1, 5) as u64;
    let mut h = splitmix64(package.0 as u64);
    for f in route.flights() {
        h = splitmix64(h ^ f.0 as u64);
    }
    0.01 * (1 + h % levels) as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::corridor;

    #[test]
    fn test_total_hours_adds_connection_overhead() {
        let fx = corridor();
        let params = NetworkParams::default();
        let route = Route::new(vec![fx.ab, fx.bc]);
        // 4h + 5h flying, one connection
        assert!((route.total_hours(&fx.network, &params) - 11.0).abs() < 1e-12);
        assert_eq!(Route::empty().total_hours(&fx.network, &params), 0.0);
    }

    #[test]
    fn test_airports_sequence() {
        let fx = corridor();
        let route = Route::new(vec![fx.ab, fx.bc]);
        assert_eq!(route.airports(&fx.network), vec![fx.a, fx.b, fx.c]);
        assert!(Route::empty().airports(&fx.network).is_empty());
    }

    #[test]
    fn test_safety_margin_range_and_stability() {
        for pkg in 0..200 {
            for hops in 1..4 {
                let route = Route::new((0..hops).map(FlightId).collect());
                for cross in [false, true] {
                    let m = safety_margin(PackageId(pkg), &route, cross);
                    assert!((0.01..=0.05 + 1e-12).contains(&m));
                    assert_eq!(m, safety_margin(PackageId(pkg), &route, cross));
                }
            }
        }
        // a direct same-continent hop has a single level
        let direct = Route::direct(FlightId(3));
        assert!((safety_margin(PackageId(9), &direct, false) - 0.01).abs() < 1e-12);
    }
}
