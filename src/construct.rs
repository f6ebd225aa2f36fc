//! Initial solutions for the search strategies.
//!
//! Both constructions return the solution together with the ledger that
//! holds exactly its bookings. [`InitialConstruction::build`] hands the
//! search only the solution; every runner books its own ledger from it.

use rand::seq::{IndexedRandom, SliceRandom};
use rand::Rng;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::engine::SearchContext;
use crate::ledger::CapacityLedger;
use crate::network::PackageId;
use crate::route::RouteOption;
use crate::solution::Solution;

/// Passes the greedy construction makes over still-unassigned packages.
const GREEDY_PASSES: usize = 3;

/// Departure delays, in minutes, tried for packages no pass could place.
const DELAY_STEP_MINUTES: i64 = 120;
const MAX_DELAY_MINUTES: i64 = 720;

/// Chance that the randomized construction tries a package at all.
const RANDOM_ATTEMPT_PROBABILITY: f64 = 0.3;

/// How the starting solution is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum InitialConstruction {
    /// Deadline order, widest time margin first.
    #[default]
    Greedy,
    /// A sparse random start.
    Random,
}

impl InitialConstruction {
    pub fn build<R: Rng>(self, ctx: &SearchContext<'_>, rng: &mut R) -> Solution {
        let (solution, _) = match self {
            InitialConstruction::Greedy => greedy(ctx, rng),
            InitialConstruction::Random => randomized(ctx, rng),
        };
        solution
    }
}

/// The option with the largest time margin; the first one on ties.
fn widest_margin(options: &[RouteOption]) -> Option<&RouteOption> {
    options
        .iter()
        .fold(None, |best: Option<&RouteOption>, o| match best {
            Some(b) if b.margin >= o.margin => Some(b),
            _ => Some(o),
        })
}

/// Assigns packages in deadline order, each to its widest-margin route.
///
/// Packages that find no room are retried in later passes, since routes
/// found for them may differ once the shuffled intermediates change.
/// Whatever is still unplaced then gets one more chance with a later
/// departure, which moves its warehouse windows past occupancy peaks.
#[tracing::instrument(skip_all, fields(packages = ctx.packages.len()))]
pub fn greedy<R: Rng>(ctx: &SearchContext<'_>, rng: &mut R) -> (Solution, CapacityLedger) {
    let mut ledger = ctx.new_ledger();
    let mut solution = Solution::new(ctx.packages.len());
    let mut order: Vec<PackageId> = ctx.packages.iter().map(|p| p.id).collect();
    order.sort_by_key(|&id| (ctx.package(id).deadline_minute, id));

    for pass in 0..GREEDY_PASSES {
        let before = solution.assigned_count();
        for &id in &order {
            if solution.is_assigned(id) {
                continue;
            }
            let options = ctx
                .finder
                .route_options(&ctx.validator, &ledger, ctx.package(id), rng);
            if let Some(best) = widest_margin(&options) {
                solution.try_assign(ctx, &mut ledger, id, best.route.clone());
            }
        }
        tracing::trace!(pass, assigned = solution.assigned_count(), "greedy pass");
        if solution.unassigned_count() == 0 || solution.assigned_count() == before {
            break;
        }
    }

    let mut delayed = 0usize;
    for &id in &order {
        if !solution.is_assigned(id) && assign_delayed(ctx, &mut ledger, &mut solution, id, rng) {
            delayed += 1;
        }
    }

    tracing::debug!(
        assigned = solution.assigned_count(),
        unassigned = solution.unassigned_count(),
        delayed,
        "greedy construction"
    );
    (solution, ledger)
}

/// Places `id` on the shortest departure delay that fits, trying its
/// routes widest margin first at each delay.
fn assign_delayed<R: Rng>(
    ctx: &SearchContext<'_>,
    ledger: &mut CapacityLedger,
    solution: &mut Solution,
    id: PackageId,
    rng: &mut R,
) -> bool {
    let mut options = ctx
        .finder
        .route_options(&ctx.validator, ledger, ctx.package(id), rng);
    if options.is_empty() || ctx.package(id).at_destination() {
        return false;
    }
    options.sort_by(|a, b| b.margin.total_cmp(&a.margin));
    let mut delay = DELAY_STEP_MINUTES;
    while delay <= MAX_DELAY_MINUTES {
        for option in &options {
            if solution.try_assign(ctx, ledger, id, option.route.clone().with_delay(delay)) {
                tracing::trace!(%id, delay, "delayed departure");
                return true;
            }
        }
        delay += DELAY_STEP_MINUTES;
    }
    false
}

/// Tries each package, in random order, with probability 0.3 on one of
/// its feasible routes picked at random.
pub fn randomized<R: Rng>(ctx: &SearchContext<'_>, rng: &mut R) -> (Solution, CapacityLedger) {
    let mut ledger = ctx.new_ledger();
    let mut solution = Solution::new(ctx.packages.len());
    let mut order: Vec<PackageId> = ctx.packages.iter().map(|p| p.id).collect();
    order.shuffle(rng);

    for id in order {
        if !rng.random_bool(RANDOM_ATTEMPT_PROBABILITY) {
            continue;
        }
        let options = ctx
            .finder
            .route_options(&ctx.validator, &ledger, ctx.package(id), rng);
        if let Some(pick) = options.choose(rng) {
            solution.try_assign(ctx, &mut ledger, id, pick.route.clone());
        }
    }

    tracing::debug!(assigned = solution.assigned_count(), "random construction");
    (solution, ledger)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{Continent, NetworkBuilder, NetworkParams, Package};
    use crate::route::Route;
    use crate::test_fixtures::{corridor, long_haul, package, shuttle};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_greedy_takes_widest_margin() {
        let fx = corridor();
        // a->c direct is 12h; a->b->c is 4 + 5 + 2 = 11h, the wider margin
        let packages = vec![package(0, fx.lima, fx.quito, 48, 1)];
        let ctx = SearchContext::new(&fx.network, &packages, &fx.params);
        let mut rng = StdRng::seed_from_u64(3);
        let (s, ledger) = greedy(&ctx, &mut rng);

        assert_eq!(s.route_of(PackageId(0)), Some(&Route::new(vec![fx.ab, fx.bc])));
        assert_eq!(ledger.flight_used(fx.ab), 1);
        assert_eq!(ledger.flight_used(fx.ac), 0);
    }

    #[test]
    fn test_greedy_serves_earliest_deadlines_first() {
        let fx = shuttle(2);
        let packages = vec![
            package(0, fx.from, fx.to, 48, 1),
            package(1, fx.from, fx.to, 20, 1),
            package(2, fx.from, fx.to, 30, 1),
        ];
        let ctx = SearchContext::new(&fx.network, &packages, &fx.params);
        let mut rng = StdRng::seed_from_u64(3);
        let (s, ledger) = greedy(&ctx, &mut rng);

        assert!(s.is_assigned(PackageId(1)));
        assert!(s.is_assigned(PackageId(2)));
        assert!(!s.is_assigned(PackageId(0)));
        assert_eq!(ledger.flight_used(fx.flight), 2);
        assert!(s.check(&ctx).is_ok());
    }

    #[test]
    fn test_greedy_leaves_unroutable_packages_unassigned() {
        let fx = long_haul();
        let packages = vec![package(0, fx.origin, fx.destination, 100, 1)];
        let ctx = SearchContext::new(&fx.network, &packages, &fx.params);
        let mut rng = StdRng::seed_from_u64(3);
        let (s, _) = greedy(&ctx, &mut rng);
        assert_eq!(s.unassigned_count(), 1);
        assert!(s.is_conserved());
    }

    #[test]
    fn test_random_construction_is_sparse_and_consistent() {
        let fx = corridor();
        let packages: Vec<Package> = (0..200).map(|i| package(i, fx.lima, fx.quito, 48, 1)).collect();
        let ctx = SearchContext::new(&fx.network, &packages, &fx.params);
        let mut rng = StdRng::seed_from_u64(11);
        let (s, ledger) = randomized(&ctx, &mut rng);

        // roughly 30% are attempted and every attempt fits
        assert!(s.assigned_count() > 20, "assigned {}", s.assigned_count());
        assert!(s.assigned_count() < 120, "assigned {}", s.assigned_count());
        assert!(s.check(&ctx).is_ok());

        let mut fresh = ctx.new_ledger();
        assert!(fresh.rebuild_from(ctx.network, ctx.packages, &s));
        assert_eq!(fresh, ledger);
    }

    #[test]
    fn test_greedy_delays_departure_past_origin_peak() {
        let mut nb = NetworkBuilder::new();
        let from = nb.add_city("Lima", Continent::America).unwrap();
        let to = nb.add_city("Santiago", Continent::America).unwrap();
        let x = nb.add_airport(from, Some(1));
        let y = nb.add_airport(to, Some(500));
        let flight = nb.add_flight(x, y, 8.0, 10);
        let network = nb.build().unwrap();
        let params = NetworkParams::default();
        let packages = vec![package(0, from, to, 48, 1), package(1, from, to, 48, 1)];
        let ctx = SearchContext::new(&network, &packages, &params);
        let mut rng = StdRng::seed_from_u64(3);
        let (s, ledger) = greedy(&ctx, &mut rng);

        // both orders hold the single origin slot during processing
        assert_eq!(s.route_of(PackageId(0)), Some(&Route::direct(flight)));
        let late = s.route_of(PackageId(1)).unwrap();
        assert_eq!(late.delay_minutes(), params.processing_minutes);
        assert_eq!(ledger.occupancy_at(x, 0), 1);
        assert_eq!(ledger.occupancy_at(x, params.processing_minutes as usize), 1);
        assert!(s.check(&ctx).is_ok());

        let mut fresh = ctx.new_ledger();
        assert!(fresh.rebuild_from(ctx.network, ctx.packages, &s));
        assert_eq!(fresh, ledger);
    }

    #[test]
    fn test_build_hands_over_a_bookable_solution() {
        let fx = corridor();
        let packages: Vec<Package> = (0..60)
            .map(|i| package(i, fx.lima, fx.brussels, 60, 1 + (i % 3) as u32))
            .collect();
        let ctx = SearchContext::new(&fx.network, &packages, &fx.params);
        for construction in [InitialConstruction::Greedy, InitialConstruction::Random] {
            let s = construction.build(&ctx, &mut StdRng::seed_from_u64(5));
            let (_, ledger) = match construction {
                InitialConstruction::Greedy => greedy(&ctx, &mut StdRng::seed_from_u64(5)),
                InitialConstruction::Random => randomized(&ctx, &mut StdRng::seed_from_u64(5)),
            };
            let mut fresh = ctx.new_ledger();
            assert!(fresh.rebuild_from(ctx.network, ctx.packages, &s));
            assert_eq!(fresh, ledger);
        }
    }
}
