//! Route validity with memoized timing.

use std::cell::RefCell;
use std::collections::HashMap;

use super::path::{safety_margin, Route};
use crate::ledger::CapacityLedger;
use crate::network::{Network, NetworkParams, Package, PackageId};

/// Decides whether a package may travel on a route.
///
/// Route times and deadline verdicts depend only on the network and the
/// package, so both are cached for the lifetime of the validator.
/// Capacity is never cached; it is read fresh from the ledger on every
/// call.
#[derive(Debug)]
pub struct RouteValidator<'a> {
    network: &'a Network,
    params: &'a NetworkParams,
    hours: RefCell<HashMap<Route, f64>>,
    deadlines: RefCell<HashMap<PackageId, HashMap<Route, bool>>>,
}

impl<'a> RouteValidator<'a> {
    pub fn new(network: &'a Network, params: &'a NetworkParams) -> Self {
        Self {
            network,
            params,
            hours: RefCell::new(HashMap::new()),
            deadlines: RefCell::new(HashMap::new()),
        }
    }

    #[inline]
    pub fn network(&self) -> &'a Network {
        self.network
    }

    #[inline]
    pub fn params(&self) -> &'a NetworkParams {
        self.params
    }

    /// Flight time plus connection overhead, memoized per flight sequence.
    pub fn route_hours(&self, route: &Route) -> f64 {
        if route.is_empty() {
            return 0.0;
        }
        if let Some(&h) = self.hours.borrow().get(route) {
            return h;
        }
        let h = route.total_hours(self.network, self.params);
        self.hours.borrow_mut().insert(route.clone(), h);
        h
    }

    /// Continental promise for the package's city pair.
    pub fn promise_hours(&self, package: &Package) -> f64 {
        self.params.promise_hours(self.same_continent(package))
    }

    #[inline]
    pub fn same_continent(&self, package: &Package) -> bool {
        self.network.continent(package.origin) == self.network.continent(package.destination)
    }

    /// Whether the route's time, with safety margin, meets both the
    /// continental promise and the package's own deadline.
    pub fn meets_deadline(&self, package: &Package, route: &Route) -> bool {
        if route.is_empty() {
            return package.at_destination();
        }
        if let Some(&ok) = self
            .deadlines
            .borrow()
            .get(&package.id)
            .and_then(|m| m.get(route))
        {
            return ok;
        }
        let total = self.route_hours(route);
        let same = self.same_continent(package);
        let margin = safety_margin(package.id, route, !same);
        let ok = total <= self.params.promise_hours(same)
            && total * (1.0 + margin) + route.delay_hours() <= package.budget_hours();
        self.deadlines
            .borrow_mut()
            .entry(package.id)
            .or_default()
            .insert(route.clone(), ok);
        ok
    }

    /// On-time classification used by scoring. Empty routes always are.
    pub fn is_on_time(&self, package: &Package, route: &Route) -> bool {
        route.is_empty() || self.meets_deadline(package, route)
    }

    /// Endpoint, continuity and layover checks. Capacity and time are not
    /// considered.
    pub fn is_well_formed(&self, package: &Package, route: &Route) -> bool {
        let Some(&first) = route.flights().first() else {
            return package.at_destination();
        };
        let Some(&last) = route.flights().last() else {
            return false;
        };
        let net = self.network;
        let (Some(start), Some(end)) = (
            net.airport_of_city(package.origin),
            net.airport_of_city(package.destination),
        ) else {
            return false;
        };
        if net.flight(first).origin != start || !net.has_warehouse(start) || !net.has_warehouse(end) {
            return false;
        }
        let continuous = route
            .flights()
            .windows(2)
            .all(|w| net.flight(w[0]).destination == net.flight(w[1]).origin);
        if !continuous || net.flight(last).destination != end {
            return false;
        }
        self.layovers_ok(route)
    }

    fn layovers_ok(&self, route: &Route) -> bool {
        if route.hops() < 2 {
            return true;
        }
        if self.params.connection_minutes < self.params.min_layover_minutes {
            return false;
        }
        route.flights()[..route.hops() - 1]
            .iter()
            .all(|&f| self.network.has_warehouse(self.network.flight(f).destination))
    }

    /// Full validity check for carrying `units` of `package` on `route`.
    ///
    /// Checks in order: seat capacity on every flight, first flight leaves
    /// the package's airport, consecutive flights connect, last flight
    /// lands at the destination airport, layovers are long enough and held
    /// in a warehouse, and total time with safety margin fits both the
    /// continental promise and the deadline.
    pub fn is_valid(
        &self,
        ledger: &CapacityLedger,
        package: &Package,
        route: &Route,
        units: u32,
    ) -> bool {
        if route.is_empty() {
            return package.at_destination();
        }
        ledger.fits(route, units)
            && self.is_well_formed(package, route)
            && self.meets_deadline(package, route)
    }

    /// Hours between order time and deadline.
    #[inline]
    pub fn available_hours(&self, package: &Package) -> f64 {
        package.budget_hours()
    }

    /// Unused budget once the route's time and departure delay are
    /// spent, floored at zero.
    pub fn slack_hours(&self, package: &Package, route: &Route) -> f64 {
        (package.budget_hours() - self.route_hours(route) - route.delay_hours()).max(0.0)
    }

    /// `slack + 1`, so even a tight route carries positive weight.
    pub fn time_margin(&self, package: &Package, route: &Route) -> f64 {
        self.slack_hours(package, route) + 1.0
    }

    pub fn clear_cache(&self) {
        self.hours.borrow_mut().clear();
        self.deadlines.borrow_mut().clear();
    }
}
