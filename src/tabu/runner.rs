//! Tabu Search execution engine.
//!
//! # Algorithm
//!
//! 1. Start from a given solution
//! 2. At each iteration:
//!    a. Sample a neighborhood of insert, remove, reassign and swap moves
//!    b. Score every move by applying it and undoing it
//!    c. Apply the best non-tabu move (or a tabu move satisfying aspiration)
//!       and make its inverse tabu
//!    d. Update the global best; intensify after a large gain
//! 3. Perturb the current solution after half the stagnation budget
//! 4. Terminate after max iterations or stagnation
//!
//! # Reference
//!
//! Glover, F. (1989). "Tabu Search—Part I", *ORSA Journal on Computing* 1(3), 190-206.
//! Glover, F. (1990). "Tabu Search—Part II", *ORSA Journal on Computing* 2(1), 4-32.

use std::time::Instant;

use rand::rngs::StdRng;
use rand::seq::{IndexedRandom, SliceRandom};
use rand::{Rng, SeedableRng};

use super::config::TabuConfig;
use super::list::{Clock, LogicalClock, TabuList};
use super::neighborhood::Neighborhood;
use super::types::TabuMove;
use crate::alns::DEFAULT_SEED;
use crate::engine::SearchContext;
use crate::error::SolveError;
use crate::ledger::CapacityLedger;
use crate::network::PackageId;
use crate::solution::Solution;

/// Packages revisited by one intensification.
const INTENSIFY_LIMIT: usize = 50;

/// Result of a Tabu Search run.
#[derive(Debug, Clone)]
pub struct TabuResult {
    /// Best solution found.
    pub best: Solution,
    /// Score of the best solution.
    pub best_score: f64,
    /// Total iterations executed.
    pub iterations: usize,
    /// Iteration at which the best solution was found.
    pub best_iteration: usize,
    pub diversifications: usize,
    pub intensifications: usize,
    /// Best score after each iteration.
    pub score_history: Vec<f64>,
}

/// Mutable search state shared by the main loop and its perturbations.
struct State<'c, 'a, C: Clock> {
    ctx: &'c SearchContext<'a>,
    ledger: CapacityLedger,
    current: Solution,
    current_score: f64,
    tabu: TabuList<C>,
    rng: StdRng,
}

impl<C: Clock> State<'_, '_, C> {
    fn rescore(&mut self) {
        self.current_score = self.current.score(self.ctx, &self.ledger);
    }

    /// Score after `mv`, leaving the state untouched. `None` if the move
    /// does not apply.
    fn try_move(&mut self, mv: &TabuMove) -> Option<f64> {
        if !mv.apply(self.ctx, &mut self.ledger, &mut self.current) {
            return None;
        }
        let score = self.current.score(self.ctx, &self.ledger);
        let undone = mv.inverse().apply(self.ctx, &mut self.ledger, &mut self.current);
        debug_assert!(undone, "could not undo {mv:?}");
        Some(score)
    }

    fn commit(&mut self, mv: &TabuMove) -> bool {
        if !mv.apply(self.ctx, &mut self.ledger, &mut self.current) {
            return false;
        }
        self.tabu.add(mv.inverse().key(self.ctx.network));
        self.rescore();
        true
    }

    fn assigned_ids(&self) -> Vec<PackageId> {
        self.current.assignments().keys().copied().collect()
    }

    /// Releases a random 30% of the assignments.
    fn diversify_by_removing(&mut self) -> usize {
        let mut ids = self.assigned_ids();
        let n = portion(ids.len(), 0.3, 50, 500);
        ids.shuffle(&mut self.rng);
        ids.into_iter()
            .take(n)
            .filter(|&id| self.current.unassign(self.ctx, &mut self.ledger, id).is_some())
            .count()
    }

    /// Moves a random 40% of the assignments onto another feasible route.
    fn diversify_by_reassigning(&mut self) -> usize {
        let mut ids = self.assigned_ids();
        let n = portion(ids.len(), 0.4, 50, 400);
        ids.shuffle(&mut self.rng);
        let mut moved = 0;
        for id in ids.into_iter().take(n) {
            let Some(from) = self.current.route_of(id).cloned() else {
                continue;
            };
            let options = self.ctx.finder.route_options(
                &self.ctx.validator,
                &self.ledger,
                self.ctx.package(id),
                &mut self.rng,
            );
            let alternatives: Vec<_> = options.into_iter().filter(|o| o.route != from).collect();
            let Some(pick) = alternatives.choose(&mut self.rng) else {
                continue;
            };
            let mv = TabuMove::Reassign {
                package: id,
                from,
                to: pick.route.clone(),
            };
            if mv.apply(self.ctx, &mut self.ledger, &mut self.current) {
                moved += 1;
            }
        }
        moved
    }

    /// Swaps the routes of random pairs, a quarter of the assignments'
    /// worth of attempts.
    fn diversify_by_swapping(&mut self) -> usize {
        let ids = self.assigned_ids();
        if ids.len() < 2 {
            return self.diversify_by_removing();
        }
        let attempts = portion(ids.len(), 0.25, 40, 300).max(1);
        let mut swapped = 0;
        for _ in 0..attempts {
            let i = self.rng.random_range(0..ids.len());
            let mut j = self.rng.random_range(0..ids.len() - 1);
            if j >= i {
                j += 1;
            }
            let (a, b) = (ids[i], ids[j]);
            let (Some(ra), Some(rb)) = (self.current.route_of(a), self.current.route_of(b)) else {
                continue;
            };
            if ra == rb {
                continue;
            }
            let mv = TabuMove::Swap {
                first: a,
                first_route: ra.clone(),
                second: b,
                second_route: rb.clone(),
            };
            if mv.apply(self.ctx, &mut self.ledger, &mut self.current) {
                swapped += 1;
            }
        }
        swapped
    }

    /// Tries to move high-priority packages onto better routes.
    fn intensify(&mut self) {
        let mut ids = self.assigned_ids();
        ids.sort_by(|&a, &b| {
            let (pa, pb) = (self.ctx.package(a), self.ctx.package(b));
            pb.priority.total_cmp(&pa.priority).then(a.cmp(&b))
        });
        for id in ids.into_iter().take(INTENSIFY_LIMIT) {
            let Some(from) = self.current.route_of(id).cloned() else {
                continue;
            };
            let options = self.ctx.finder.route_options(
                &self.ctx.validator,
                &self.ledger,
                self.ctx.package(id),
                &mut self.rng,
            );
            let mut best: Option<(TabuMove, f64)> = None;
            for opt in options.into_iter().filter(|o| o.route != from) {
                let mv = TabuMove::Reassign {
                    package: id,
                    from: from.clone(),
                    to: opt.route,
                };
                if self.tabu.contains(&mv.key(self.ctx.network)) {
                    continue;
                }
                let Some(score) = self.try_move(&mv) else {
                    continue;
                };
                let bar = best.as_ref().map_or(self.current_score, |(_, s)| *s);
                if score > bar {
                    best = Some((mv, score));
                }
            }
            if let Some((mv, _)) = best {
                self.commit(&mv);
            }
        }
    }
}

/// `floor(size × rate)` within `[min, max]`, never more than `size`.
fn portion(size: usize, rate: f64, min: usize, max: usize) -> usize {
    ((size as f64 * rate) as usize).max(min).min(max).min(size)
}

/// Tabu Search runner.
pub struct TabuRunner;

impl TabuRunner {
    /// Runs Tabu Search from `initial`, counting tenure in iterations.
    pub fn run(
        ctx: &SearchContext<'_>,
        initial: Solution,
        config: &TabuConfig,
    ) -> Result<TabuResult, SolveError> {
        Self::run_with_clock(ctx, initial, config, LogicalClock::new())
    }

    /// Runs Tabu Search with a caller-supplied tenure clock.
    #[tracing::instrument(skip_all, fields(packages = ctx.packages.len()))]
    pub fn run_with_clock<C: Clock>(
        ctx: &SearchContext<'_>,
        initial: Solution,
        config: &TabuConfig,
        clock: C,
    ) -> Result<TabuResult, SolveError> {
        config.validate()?;
        if initial.total() != ctx.packages.len() {
            return Err(SolveError::InfeasibleSolution(format!(
                "initial solution covers {} packages, expected {}",
                initial.total(),
                ctx.packages.len()
            )));
        }
        let mut ledger = ctx.new_ledger();
        if !ledger.rebuild_from(ctx.network, ctx.packages, &initial) {
            return Err(SolveError::InfeasibleSolution(
                "initial assignments exceed capacity".into(),
            ));
        }

        let mut state = State {
            ctx,
            ledger,
            current: initial,
            current_score: 0.0,
            tabu: TabuList::with_clock(config.tabu_list_size, config.tabu_tenure, clock),
            rng: StdRng::seed_from_u64(config.seed.unwrap_or(DEFAULT_SEED)),
        };
        state.rescore();
        let neighborhood = Neighborhood::from_config(config);
        let started = Instant::now();

        let mut best = state.current.clone();
        let mut best_score = state.current_score;
        let mut best_iteration = 0;
        let mut no_improve = 0usize;
        let mut diversifying = false;
        let mut diversifications = 0usize;
        let mut intensifications = 0usize;
        let mut score_history = Vec::with_capacity(config.max_iterations);

        tracing::info!(
            assigned = state.current.assigned_count(),
            score = best_score,
            "tabu start"
        );

        for iteration in 0..config.max_iterations {
            if no_improve >= config.max_no_improve {
                break;
            }
            if config.time_limit.is_some_and(|limit| started.elapsed() >= limit) {
                tracing::debug!(iteration, "time limit reached");
                break;
            }
            state.tabu.tick();

            // Find best admissible move
            let moves = neighborhood.generate(ctx, &state.ledger, &state.current, &mut state.rng);
            let mut chosen: Option<(TabuMove, f64)> = None;
            for mv in moves {
                let Some(score) = state.try_move(&mv) else {
                    continue;
                };
                let is_tabu = state.tabu.contains(&mv.key(ctx.network));
                let admissible = !is_tabu || (config.aspiration && score > best_score);
                if admissible && chosen.as_ref().is_none_or(|(_, s)| score > *s) {
                    chosen = Some((mv, score));
                }
            }

            match chosen {
                Some((mv, _)) if state.commit(&mv) => {
                    if state.current_score > best_score {
                        let gain = (state.current_score - best_score) / best_score.abs().max(1.0);
                        best = state.current.clone();
                        best_score = state.current_score;
                        best_iteration = iteration;
                        no_improve = 0;
                        diversifying = false;
                        tracing::debug!(iteration, score = best_score, kind = ?mv.kind(), "new best");

                        if gain > config.intensification_threshold {
                            state.intensify();
                            intensifications += 1;
                            if state.current_score > best_score {
                                best = state.current.clone();
                                best_score = state.current_score;
                            }
                        }
                    } else {
                        no_improve += 1;
                    }
                }
                _ => no_improve += 1,
            }

            if config.diversify && !diversifying && no_improve >= config.max_no_improve / 2 {
                let strategy = diversifications % 3;
                let touched = match strategy {
                    0 => state.diversify_by_removing(),
                    1 => state.diversify_by_reassigning(),
                    _ => state.diversify_by_swapping(),
                };
                state.tabu.clear();
                state.rescore();
                diversifications += 1;
                diversifying = true;
                no_improve = 0;
                tracing::debug!(iteration, strategy, touched, score = state.current_score, "diversified");
            }

            score_history.push(best_score);
        }

        debug_assert!(best.is_conserved());
        tracing::info!(
            iterations = score_history.len(),
            diversifications,
            assigned = best.assigned_count(),
            score = best_score,
            "tabu done"
        );

        Ok(TabuResult {
            best,
            best_score,
            iterations: score_history.len(),
            best_iteration,
            diversifications,
            intensifications,
            score_history,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::Package;
    use crate::test_fixtures::{corridor, long_haul, package, shuttle};

    fn config() -> TabuConfig {
        TabuConfig::default()
            .with_max_iterations(60)
            .with_max_no_improve(20)
            .with_seed(42)
    }

    #[test]
    fn test_tabu_fills_shuttle() {
        let fx = shuttle(2);
        let packages: Vec<Package> = (0..3).map(|i| package(i, fx.from, fx.to, 48, 1)).collect();
        let ctx = SearchContext::new(&fx.network, &packages, &fx.params);
        let result = TabuRunner::run(&ctx, Solution::new(3), &config()).unwrap();

        assert_eq!(result.best.assigned_count(), 2);
        assert_eq!(result.best.unassigned_count(), 1);
        assert!(result.best.check(&ctx).is_ok());
        assert!(result.best_iteration < result.iterations);
    }

    #[test]
    fn test_tabu_score_history_non_decreasing() {
        let fx = corridor();
        let cities = [fx.lima, fx.bogota, fx.quito, fx.brussels];
        let packages: Vec<Package> = (0..16)
            .map(|i| package(i, cities[i % 2], cities[2 + i % 2], 40 + i as i64, 1 + i as u32 % 2))
            .collect();
        let ctx = SearchContext::new(&fx.network, &packages, &fx.params);
        let result = TabuRunner::run(&ctx, Solution::new(16), &config()).unwrap();

        for window in result.score_history.windows(2) {
            assert!(
                window[1] >= window[0],
                "best score history should be non-decreasing: {} < {}",
                window[1],
                window[0]
            );
        }
        assert!(result.best.assigned_count() > 0);
        assert!(result.best.check(&ctx).is_ok());
    }

    #[test]
    fn test_tabu_stagnation_termination() {
        let fx = long_haul();
        let packages = vec![package(0, fx.origin, fx.destination, 100, 1)];
        let ctx = SearchContext::new(&fx.network, &packages, &fx.params);
        let config = TabuConfig::default()
            .with_max_iterations(10_000)
            .with_max_no_improve(20)
            .with_seed(1);
        let result = TabuRunner::run(&ctx, Solution::new(1), &config).unwrap();

        // no move ever applies; one diversification halfway, then the stop
        assert!(result.iterations < 10_000);
        assert_eq!(result.diversifications, 1);
        assert_eq!(result.best.assigned_count(), 0);
    }

    #[test]
    fn test_tabu_without_diversification() {
        let fx = long_haul();
        let packages = vec![package(0, fx.origin, fx.destination, 100, 1)];
        let ctx = SearchContext::new(&fx.network, &packages, &fx.params);
        let config = config().with_diversification(false);
        let result = TabuRunner::run(&ctx, Solution::new(1), &config).unwrap();
        assert_eq!(result.iterations, 20);
        assert_eq!(result.diversifications, 0);
    }

    #[test]
    fn test_portion_bounds() {
        assert_eq!(portion(1000, 0.3, 50, 500), 300);
        assert_eq!(portion(10, 0.3, 50, 500), 10);
        assert_eq!(portion(5000, 0.3, 50, 500), 500);
        assert_eq!(portion(0, 0.3, 50, 500), 0);
    }
}
