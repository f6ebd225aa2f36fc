use crate::ledger::CapacityLedger;
use crate::network::{Network, NetworkParams, Package, PackageId};
use crate::route::{RouteFinder, RouteValidator};

/// Everything read-only a search run needs: the network, the demand, the
/// timing policy, T0 and the shared route primitives.
///
/// One context per run. The validator's caches use interior mutability,
/// so a context is not shared across threads; parallel runs each build
/// their own over the same network.
#[derive(Debug)]
pub struct SearchContext<'a> {
    pub network: &'a Network,
    pub packages: &'a [Package],
    pub params: &'a NetworkParams,
    /// Earliest order minute; minute zero of the temporal ledger.
    pub t0: i64,
    pub finder: RouteFinder<'a>,
    pub validator: RouteValidator<'a>,
}

impl<'a> SearchContext<'a> {
    pub fn new(network: &'a Network, packages: &'a [Package], params: &'a NetworkParams) -> Self {
        let t0 = packages.iter().map(|p| p.order_minute).min().unwrap_or(0);
        Self {
            network,
            packages,
            params,
            t0,
            finder: RouteFinder::new(network),
            validator: RouteValidator::new(network, params),
        }
    }

    /// Re-anchors the run at `t0`, for searches over a subset of a larger
    /// intake that must share its timeline.
    pub fn with_t0(mut self, t0: i64) -> Self {
        self.t0 = t0;
        self
    }

    #[inline]
    pub fn package(&self, id: PackageId) -> &'a Package {
        &self.packages[id.index()]
    }

    /// A fresh, empty ledger anchored at this run's T0.
    pub fn new_ledger(&self) -> CapacityLedger {
        CapacityLedger::new(self.network, self.params, self.t0)
    }

    /// Hours from T0 until the package's deadline, at least one.
    pub fn hours_until_deadline(&self, package: &Package) -> f64 {
        ((package.deadline_minute - self.t0) as f64 / 60.0).max(1.0)
    }
}
