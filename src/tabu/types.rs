//! Tabu moves and their structural identity.

use crate::engine::SearchContext;
use crate::ledger::CapacityLedger;
use crate::network::{AirportId, Network, PackageId};
use crate::route::Route;
use crate::solution::Solution;

/// Move type, part of the move identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MoveKind {
    Insert,
    Remove,
    Reassign,
    Swap,
}

/// A discrete change to a solution.
#[derive(Debug, Clone, PartialEq)]
pub enum TabuMove {
    /// Assign an unassigned package to `route`.
    Insert { package: PackageId, route: Route },
    /// Unassign a package currently on `route`.
    Remove { package: PackageId, route: Route },
    /// Move a package from one route to another.
    Reassign {
        package: PackageId,
        from: Route,
        to: Route,
    },
    /// Exchange the routes of two assigned packages.
    Swap {
        first: PackageId,
        first_route: Route,
        second: PackageId,
        second_route: Route,
    },
}

/// Identity of a move in the tabu list.
///
/// Routes are compared by the airports they visit, not by flight ids, so
/// a re-derived route over the same airports is the same move. Swaps are
/// normalized so the order of the two packages does not matter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MoveKey {
    kind: MoveKind,
    packages: Vec<PackageId>,
    paths: Vec<Vec<AirportId>>,
}

/// Validates and books `route` for `id` without touching the solution.
fn book(ctx: &SearchContext<'_>, ledger: &mut CapacityLedger, id: PackageId, route: &Route) -> bool {
    let package = ctx.package(id);
    ctx.validator
        .is_valid(ledger, package, route, package.unit_count())
        && ledger.reserve_assignment(ctx.network, package, route)
}

fn unbook(ctx: &SearchContext<'_>, ledger: &mut CapacityLedger, id: PackageId, route: &Route) -> bool {
    ledger.release_assignment(ctx.network, ctx.package(id), route)
}

impl TabuMove {
    pub fn kind(&self) -> MoveKind {
        match self {
            TabuMove::Insert { .. } => MoveKind::Insert,
            TabuMove::Remove { .. } => MoveKind::Remove,
            TabuMove::Reassign { .. } => MoveKind::Reassign,
            TabuMove::Swap { .. } => MoveKind::Swap,
        }
    }

    /// The move that undoes this one.
    pub fn inverse(&self) -> TabuMove {
        match self.clone() {
            TabuMove::Insert { package, route } => TabuMove::Remove { package, route },
            TabuMove::Remove { package, route } => TabuMove::Insert { package, route },
            TabuMove::Reassign { package, from, to } => TabuMove::Reassign {
                package,
                from: to,
                to: from,
            },
            TabuMove::Swap {
                first,
                first_route,
                second,
                second_route,
            } => TabuMove::Swap {
                first,
                first_route: second_route,
                second,
                second_route: first_route,
            },
        }
    }

    pub fn key(&self, network: &Network) -> MoveKey {
        let path = |r: &Route| r.airports(network);
        let (packages, paths) = match self {
            TabuMove::Insert { package, route } | TabuMove::Remove { package, route } => {
                (vec![*package], vec![path(route)])
            }
            TabuMove::Reassign { package, from, to } => (vec![*package], vec![path(from), path(to)]),
            TabuMove::Swap {
                first,
                first_route,
                second,
                second_route,
            } => {
                let mut pairs = [(*first, path(first_route)), (*second, path(second_route))];
                pairs.sort_by_key(|(id, _)| *id);
                let [(a, pa), (b, pb)] = pairs;
                (vec![a, b], vec![pa, pb])
            }
        };
        MoveKey {
            kind: self.kind(),
            packages,
            paths,
        }
    }

    /// Applies the move to `solution` and `ledger` together.
    ///
    /// Returns `false` and changes nothing when the move does not match
    /// the solution's current state or the new bookings do not fit.
    pub fn apply(
        &self,
        ctx: &SearchContext<'_>,
        ledger: &mut CapacityLedger,
        solution: &mut Solution,
    ) -> bool {
        match self {
            TabuMove::Insert { package, route } => {
                !solution.is_assigned(*package)
                    && solution.try_assign(ctx, ledger, *package, route.clone())
            }
            TabuMove::Remove { package, route } => {
                if solution.route_of(*package) != Some(route) {
                    return false;
                }
                solution.unassign(ctx, ledger, *package).is_some()
            }
            TabuMove::Reassign { package, from, to } => {
                if from == to || solution.route_of(*package) != Some(from) {
                    return false;
                }
                if !unbook(ctx, ledger, *package, from) {
                    return false;
                }
                if !book(ctx, ledger, *package, to) {
                    let restored =
                        ledger.reserve_assignment(ctx.network, ctx.package(*package), from);
                    debug_assert!(restored, "could not restore {package} on its old route");
                    return false;
                }
                solution.reassign(*package, to.clone());
                true
            }
            TabuMove::Swap {
                first,
                first_route,
                second,
                second_route,
            } => {
                if first == second
                    || solution.route_of(*first) != Some(first_route)
                    || solution.route_of(*second) != Some(second_route)
                {
                    return false;
                }
                let released = unbook(ctx, ledger, *first, first_route);
                let released = released && unbook(ctx, ledger, *second, second_route);
                debug_assert!(released, "ledger lost a swapped booking");
                if book(ctx, ledger, *first, second_route) {
                    if book(ctx, ledger, *second, first_route) {
                        return solution.swap(*first, *second);
                    }
                    unbook(ctx, ledger, *first, second_route);
                }
                // put both back as they were
                let net = ctx.network;
                let ok = ledger.reserve_assignment(net, ctx.package(*first), first_route)
                    && ledger.reserve_assignment(net, ctx.package(*second), second_route);
                debug_assert!(ok, "could not restore swapped bookings");
                false
            }
        }
    }
}
