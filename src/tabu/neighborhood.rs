//! Sampled move neighborhoods.

use rand::seq::SliceRandom;
use rand::Rng;

use super::config::TabuConfig;
use super::types::TabuMove;
use crate::engine::SearchContext;
use crate::ledger::CapacityLedger;
use crate::network::PackageId;
use crate::route::Route;
use crate::solution::Solution;

/// Draws a bounded sample of each move type around a solution.
#[derive(Debug, Clone)]
pub struct Neighborhood {
    pub insert_cap: usize,
    pub remove_cap: usize,
    pub reassign_cap: usize,
    pub swap_cap: usize,
    pub size: usize,
}

impl Neighborhood {
    pub fn from_config(config: &TabuConfig) -> Self {
        Self {
            insert_cap: config.insert_cap,
            remove_cap: config.remove_cap,
            reassign_cap: config.reassign_cap,
            swap_cap: config.swap_cap,
            size: config.neighborhood_size,
        }
    }

    /// Up to `cap` of `ids`, chosen at random when there are more.
    fn sample<R: Rng>(mut ids: Vec<PackageId>, cap: usize, rng: &mut R) -> Vec<PackageId> {
        if ids.len() > cap {
            ids.shuffle(rng);
            ids.truncate(cap);
        }
        ids
    }

    /// One insert per feasible route of each sampled unassigned package.
    pub fn inserts<R: Rng>(
        &self,
        ctx: &SearchContext<'_>,
        ledger: &CapacityLedger,
        solution: &Solution,
        rng: &mut R,
    ) -> Vec<TabuMove> {
        let ids = Self::sample(solution.unassigned().iter().copied().collect(), self.insert_cap, rng);
        let mut moves = Vec::new();
        for package in ids {
            let options = ctx
                .finder
                .route_options(&ctx.validator, ledger, ctx.package(package), rng);
            for opt in options {
                moves.push(TabuMove::Insert {
                    package,
                    route: opt.route,
                });
                if moves.len() >= self.size {
                    return moves;
                }
            }
        }
        moves
    }

    pub fn removes<R: Rng>(&self, solution: &Solution, rng: &mut R) -> Vec<TabuMove> {
        let ids = Self::sample(solution.assignments().keys().copied().collect(), self.remove_cap, rng);
        ids.into_iter()
            .filter_map(|package| {
                let route = solution.route_of(package)?.clone();
                Some(TabuMove::Remove { package, route })
            })
            .take(self.size)
            .collect()
    }

    /// Moves of sampled packages onto each other feasible route.
    pub fn reassigns<R: Rng>(
        &self,
        ctx: &SearchContext<'_>,
        ledger: &CapacityLedger,
        solution: &Solution,
        rng: &mut R,
    ) -> Vec<TabuMove> {
        let ids = Self::sample(solution.assignments().keys().copied().collect(), self.reassign_cap, rng);
        let mut moves = Vec::new();
        for package in ids {
            let Some(from) = solution.route_of(package) else {
                continue;
            };
            let options = ctx
                .finder
                .route_options(&ctx.validator, ledger, ctx.package(package), rng);
            for opt in options.into_iter().filter(|o| &o.route != from) {
                moves.push(TabuMove::Reassign {
                    package,
                    from: from.clone(),
                    to: opt.route,
                });
                if moves.len() >= self.size {
                    return moves;
                }
            }
        }
        moves
    }

    /// Random pairs whose routes would also be valid for each other.
    pub fn swaps<R: Rng>(&self, ctx: &SearchContext<'_>, solution: &Solution, rng: &mut R) -> Vec<TabuMove> {
        let assigned: Vec<(&PackageId, &Route)> = solution.assignments().iter().collect();
        let n = assigned.len();
        if n < 2 {
            return Vec::new();
        }
        let tries = self.swap_cap.min(n * (n - 1) / 2);
        let fits = |id: PackageId, route: &Route| {
            let p = ctx.package(id);
            ctx.validator.is_well_formed(p, route) && ctx.validator.meets_deadline(p, route)
        };
        let mut moves = Vec::new();
        for _ in 0..tries {
            let i = rng.random_range(0..n);
            let mut j = rng.random_range(0..n - 1);
            if j >= i {
                j += 1;
            }
            let (a, ra) = assigned[i];
            let (b, rb) = assigned[j];
            if ra != rb && fits(*a, rb) && fits(*b, ra) {
                moves.push(TabuMove::Swap {
                    first: *a,
                    first_route: ra.clone(),
                    second: *b,
                    second_route: rb.clone(),
                });
                if moves.len() >= self.size {
                    break;
                }
            }
        }
        moves
    }

    /// All four samples, shuffled together and cut to `size`.
    pub fn generate<R: Rng>(
        &self,
        ctx: &SearchContext<'_>,
        ledger: &CapacityLedger,
        solution: &Solution,
        rng: &mut R,
    ) -> Vec<TabuMove> {
        let mut moves = self.inserts(ctx, ledger, solution, rng);
        moves.extend(self.removes(solution, rng));
        moves.extend(self.reassigns(ctx, ledger, solution, rng));
        moves.extend(self.swaps(ctx, solution, rng));
        moves.shuffle(rng);
        moves.truncate(self.size);
        moves
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tabu::types::MoveKind;
    use crate::test_fixtures::{corridor, package};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_generate_covers_all_move_kinds() {
        let fx = corridor();
        let packages = vec![
            package(0, fx.lima, fx.quito, 48, 1),
            package(1, fx.lima, fx.quito, 48, 1),
            package(2, fx.lima, fx.brussels, 72, 1),
        ];
        let ctx = SearchContext::new(&fx.network, &packages, &fx.params);
        let mut ledger = ctx.new_ledger();
        let mut s = Solution::new(3);
        assert!(s.try_assign(&ctx, &mut ledger, PackageId(0), Route::direct(fx.ac)));
        assert!(s.try_assign(&ctx, &mut ledger, PackageId(1), Route::new(vec![fx.ab, fx.bc])));

        let hood = Neighborhood::from_config(&TabuConfig::default());
        let mut rng = StdRng::seed_from_u64(6);
        let moves = hood.generate(&ctx, &ledger, &s, &mut rng);
        for kind in [MoveKind::Insert, MoveKind::Remove, MoveKind::Reassign, MoveKind::Swap] {
            assert!(moves.iter().any(|m| m.kind() == kind), "missing {kind:?}");
        }
        // only package 2 is unassigned
        assert!(moves.iter().all(|m| match m {
            TabuMove::Insert { package, .. } => *package == PackageId(2),
            _ => true,
        }));
    }

    #[test]
    fn test_caps_and_size() {
        let fx = corridor();
        let packages: Vec<_> = (0..20).map(|i| package(i, fx.lima, fx.quito, 48, 1)).collect();
        let ctx = SearchContext::new(&fx.network, &packages, &fx.params);
        let mut ledger = ctx.new_ledger();
        let mut s = Solution::new(20);
        for i in 0..10 {
            assert!(s.try_assign(&ctx, &mut ledger, PackageId(i), Route::direct(fx.ac)));
        }
        let hood = Neighborhood {
            insert_cap: 3,
            remove_cap: 4,
            reassign_cap: 2,
            swap_cap: 5,
            size: 8,
        };
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(hood.removes(&s, &mut rng).len(), 4);
        // two routes per package: ac and ab+bc
        assert_eq!(hood.inserts(&ctx, &ledger, &s, &mut rng).len(), 6);
        assert_eq!(hood.reassigns(&ctx, &ledger, &s, &mut rng).len(), 2);
        // every assigned package shares one route, so no swap changes anything
        assert!(hood.swaps(&ctx, &s, &mut rng).is_empty());
        assert!(hood.generate(&ctx, &ledger, &s, &mut rng).len() <= 8);
    }
}
