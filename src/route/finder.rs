//! Direct, one-stop and two-stop route search.

use rand::seq::SliceRandom;
use rand::Rng;

use super::path::Route;
use super::validator::RouteValidator;
use crate::ledger::CapacityLedger;
use crate::network::{AirportId, FlightId, Network, Package};

/// A feasible route for a package, with the figures repair operators
/// rank by.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteOption {
    pub route: Route,
    /// Unused time budget in hours, plus one.
    pub margin: f64,
    /// `(Σmax − Σused) / max(1, Σmax)` over the route's flights.
    pub capacity_ratio: f64,
}

/// Searches chains of up to three flights between two airports.
///
/// Intermediate airports are visited in shuffled order and capped at
/// `max_intermediates` per level. Only airports with a warehouse may
/// serve as intermediates.
#[derive(Debug, Clone)]
pub struct RouteFinder<'a> {
    network: &'a Network,
    max_intermediates: usize,
}

impl<'a> RouteFinder<'a> {
    pub fn new(network: &'a Network) -> Self {
        Self {
            network,
            max_intermediates: 10,
        }
    }

    pub fn with_max_intermediates(mut self, n: usize) -> Self {
        self.max_intermediates = n.max(1);
        self
    }

    fn flights_between(
        &self,
        ledger: &CapacityLedger,
        from: AirportId,
        to: AirportId,
        units: u32,
    ) -> Vec<FlightId> {
        self.network
            .outgoing(from)
            .iter()
            .copied()
            .filter(|&f| {
                self.network.flight(f).destination == to
                    && ledger.flight_used(f) as u64 + units as u64 <= ledger.flight_max(f) as u64
            })
            .collect()
    }

    fn intermediates<R: Rng>(
        &self,
        from: AirportId,
        exclude: &[AirportId],
        rng: &mut R,
    ) -> Vec<AirportId> {
        let mut hubs: Vec<AirportId> = self
            .network
            .outgoing(from)
            .iter()
            .map(|&f| self.network.flight(f).destination)
            .filter(|a| !exclude.contains(a) && self.network.has_warehouse(*a))
            .collect();
        hubs.sort_unstable();
        hubs.dedup();
        hubs.shuffle(rng);
        hubs.truncate(self.max_intermediates);
        hubs
    }

    /// First direct flight with room for `units` that `accept` admits.
    pub fn find_direct(
        &self,
        ledger: &CapacityLedger,
        origin: AirportId,
        dest: AirportId,
        units: u32,
        accept: impl Fn(&Route) -> bool,
    ) -> Option<Route> {
        self.flights_between(ledger, origin, dest, units)
            .into_iter()
            .map(Route::direct)
            .find(|r| accept(r))
    }

    /// First one-stop chain with room for `units` that `accept` admits.
    pub fn find_one_stop<R: Rng>(
        &self,
        ledger: &CapacityLedger,
        origin: AirportId,
        dest: AirportId,
        units: u32,
        accept: impl Fn(&Route) -> bool,
        rng: &mut R,
    ) -> Option<Route> {
        for hub in self.intermediates(origin, &[origin, dest], rng) {
            let firsts = self.flights_between(ledger, origin, hub, units);
            if firsts.is_empty() {
                continue;
            }
            for second in self.flights_between(ledger, hub, dest, units) {
                if let Some(route) = firsts
                    .iter()
                    .map(|&first| Route::new(vec![first, second]))
                    .find(|r| accept(r))
                {
                    return Some(route);
                }
            }
        }
        None
    }

    /// First two-stop chain with room for `units` that `accept` admits.
    pub fn find_two_stop<R: Rng>(
        &self,
        ledger: &CapacityLedger,
        origin: AirportId,
        dest: AirportId,
        units: u32,
        accept: impl Fn(&Route) -> bool,
        rng: &mut R,
    ) -> Option<Route> {
        for hub1 in self.intermediates(origin, &[origin, dest], rng) {
            let firsts = self.flights_between(ledger, origin, hub1, units);
            if firsts.is_empty() {
                continue;
            }
            for hub2 in self.intermediates(hub1, &[origin, dest, hub1], rng) {
                let seconds = self.flights_between(ledger, hub1, hub2, units);
                let thirds = self.flights_between(ledger, hub2, dest, units);
                for &first in &firsts {
                    for &second in &seconds {
                        if let Some(route) = thirds
                            .iter()
                            .map(|&third| Route::new(vec![first, second, third]))
                            .find(|r| accept(r))
                        {
                            return Some(route);
                        }
                    }
                }
            }
        }
        None
    }

    /// Direct, then one-stop, then two-stop: the first valid route.
    pub fn find_route<R: Rng>(
        &self,
        validator: &RouteValidator<'_>,
        ledger: &CapacityLedger,
        package: &Package,
        rng: &mut R,
    ) -> Option<Route> {
        if package.at_destination() {
            return Some(Route::empty());
        }
        let units = package.unit_count();
        let origin = self.network.airport_of_city(package.origin)?;
        let dest = self.network.airport_of_city(package.destination)?;
        let valid = |r: &Route| validator.is_valid(ledger, package, r, units);
        self.find_direct(ledger, origin, dest, units, valid)
            .or_else(|| self.find_one_stop(ledger, origin, dest, units, valid, rng))
            .or_else(|| self.find_two_stop(ledger, origin, dest, units, valid, rng))
    }

    /// Every valid route for `package` up to two stops, with margins and
    /// capacity ratios. At-destination packages get the empty route only.
    pub fn route_options<R: Rng>(
        &self,
        validator: &RouteValidator<'_>,
        ledger: &CapacityLedger,
        package: &Package,
        rng: &mut R,
    ) -> Vec<RouteOption> {
        if package.at_destination() {
            return vec![RouteOption {
                route: Route::empty(),
                margin: validator.time_margin(package, &Route::empty()),
                capacity_ratio: 1.0,
            }];
        }
        let units = package.unit_count();
        let (Some(origin), Some(dest)) = (
            self.network.airport_of_city(package.origin),
            self.network.airport_of_city(package.destination),
        ) else {
            return Vec::new();
        };

        let mut candidates: Vec<Route> = self
            .flights_between(ledger, origin, dest, units)
            .into_iter()
            .map(Route::direct)
            .collect();
        for hub1 in self.intermediates(origin, &[origin, dest], rng) {
            let firsts = self.flights_between(ledger, origin, hub1, units);
            if firsts.is_empty() {
                continue;
            }
            for last in self.flights_between(ledger, hub1, dest, units) {
                candidates.extend(firsts.iter().map(|&f| Route::new(vec![f, last])));
            }
            for hub2 in self.intermediates(hub1, &[origin, dest, hub1], rng) {
                let Some(mid) = self.flights_between(ledger, hub1, hub2, units).first().copied() else {
                    continue;
                };
                if let Some(last) = self.flights_between(ledger, hub2, dest, units).first().copied() {
                    candidates.push(Route::new(vec![firsts[0], mid, last]));
                }
            }
        }

        candidates
            .into_iter()
            .filter(|r| validator.is_valid(ledger, package, r, units))
            .map(|route| RouteOption {
                margin: validator.time_margin(package, &route),
                capacity_ratio: capacity_ratio(ledger, &route),
                route,
            })
            .collect()
    }
}

/// Spare seats over total seats along `route`.
pub fn capacity_ratio(ledger: &CapacityLedger, route: &Route) -> f64 {
    let (max, used) = route.flights().iter().fold((0u64, 0u64), |(m, u), &f| {
        (m + ledger.flight_max(f) as u64, u + ledger.flight_used(f) as u64)
    });
    max.saturating_sub(used) as f64 / max.max(1) as f64
}
