//! ALNS execution loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};

use super::config::{AlnsConfig, DEFAULT_SEED};
use super::destroy::Destroy;
use super::repair::Repair;
use super::selector::OperatorSelector;
use super::types::{DestroyBudget, DestroyOperator, RepairOperator};
use crate::engine::SearchContext;
use crate::error::SolveError;
use crate::ledger::CapacityLedger;
use crate::network::PackageId;
use crate::solution::Solution;

/// Result of an ALNS run.
#[derive(Debug, Clone)]
pub struct AlnsResult {
    /// The best solution found.
    pub best: Solution,

    /// Score of the best solution.
    pub best_score: f64,

    /// Iterations performed.
    pub iterations: usize,

    /// Number of new global bests found.
    pub improvements: usize,

    /// Times the driver entered diversification.
    pub diversifications: usize,

    /// Final temperature.
    pub final_temperature: f64,

    /// Whether cancelled externally.
    pub cancelled: bool,

    pub destroy_names: Vec<String>,
    pub repair_names: Vec<String>,

    /// Final pair weights, row-major by (destroy, repair).
    pub pair_weights: Vec<f64>,

    /// Best score at the start and after every segment.
    pub score_history: Vec<f64>,
}

impl AlnsResult {
    /// Weight of the pair named `(destroy, repair)`.
    pub fn pair_weight(&self, destroy: &str, repair: &str) -> Option<f64> {
        let d = self.destroy_names.iter().position(|n| n == destroy)?;
        let r = self.repair_names.iter().position(|n| n == repair)?;
        self.pair_weights.get(d * self.repair_names.len() + r).copied()
    }
}

/// Whether `ledger` holds exactly the bookings of `solution`.
fn ledger_matches(ctx: &SearchContext<'_>, ledger: &CapacityLedger, solution: &Solution) -> bool {
    let mut fresh = ctx.new_ledger();
    fresh.rebuild_from(ctx.network, ctx.packages, solution) && &fresh == ledger
}

/// Executes the ALNS algorithm.
pub struct AlnsRunner;

impl AlnsRunner {
    /// Runs ALNS from `initial` with the full operator portfolio.
    pub fn run(
        ctx: &SearchContext<'_>,
        initial: Solution,
        config: &AlnsConfig,
    ) -> Result<AlnsResult, SolveError> {
        Self::run_with_operators(
            ctx,
            initial,
            &Destroy::portfolio(),
            &Repair::portfolio(config.regret_level),
            config,
            None,
        )
    }

    /// Runs ALNS with explicit operators and an optional cancellation
    /// token.
    ///
    /// Each iteration snapshots the ledger, destroys part of the current
    /// solution, repairs it and either keeps the result or restores the
    /// snapshot. The ledger always holds exactly the current solution's
    /// bookings between iterations.
    #[tracing::instrument(skip_all, fields(packages = ctx.packages.len()))]
    pub fn run_with_operators<D, RP>(
        ctx: &SearchContext<'_>,
        initial: Solution,
        destroy_ops: &[D],
        repair_ops: &[RP],
        config: &AlnsConfig,
        cancel: Option<Arc<AtomicBool>>,
    ) -> Result<AlnsResult, SolveError>
    where
        D: DestroyOperator,
        RP: RepairOperator,
    {
        config.validate()?;
        if destroy_ops.is_empty() || repair_ops.is_empty() {
            return Err(SolveError::InvalidConfig(
                "at least one destroy and one repair operator required".into(),
            ));
        }
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

        let mut rng = StdRng::seed_from_u64(config.seed.unwrap_or(DEFAULT_SEED));
        let started = Instant::now();

        let mut current = initial;
        let mut current_score = current.score(ctx, &ledger);
        let mut best = current.clone();
        let mut best_score = current_score;

        let mut selector = OperatorSelector::new(destroy_ops.len(), repair_ops.len());
        let mut temperature = config.initial_temperature;
        // temperature to return to once diversification ends
        let mut saved_temperature: Option<f64> = None;
        let mut stagnation = 0usize;
        let mut improvements = 0usize;
        let mut diversifications = 0usize;
        let mut iterations = 0usize;
        let mut cancelled = false;

        let mut score_history = vec![best_score];

        tracing::info!(
            assigned = current.assigned_count(),
            unassigned = current.unassigned_count(),
            score = current_score,
            "alns start"
        );

        for iteration in 0..config.max_iterations {
            if let Some(ref flag) = cancel {
                if flag.load(Ordering::Relaxed) {
                    cancelled = true;
                    break;
                }
            }
            if config.time_limit.is_some_and(|limit| started.elapsed() >= limit) {
                tracing::debug!(iteration, "time limit reached");
                break;
            }
            if stagnation > config.stagnation_limit {
                tracing::debug!(iteration, stagnation, "stagnation limit reached");
                break;
            }
            iterations = iteration + 1;

            let pair = selector.select(&mut rng);
            let rate = if saved_temperature.is_some() {
                (config.destruction_rate * config.diversification_rate_factor).min(1.0)
            } else {
                config.destruction_rate
            };
            let budget = DestroyBudget {
                rate,
                min: config.min_destroy,
                max: config.max_destroy,
            };

            let snapshot = ledger.snapshot();
            let mut new_best = false;
            let reward = 'step: {
                let destroyed = destroy_ops[pair.0].destroy(ctx, &ledger, &current, budget, &mut rng);
                for (id, route) in &destroyed.removed {
                    let released = ledger.release_assignment(ctx.network, ctx.package(*id), route);
                    debug_assert!(released, "ledger lost the booking of {id}");
                }
                let mut pending: Vec<PackageId> =
                    destroyed.removed.iter().map(|(id, _)| *id).collect();

                // pull in some never-assigned packages, more often the more there are
                let open: Vec<PackageId> = current.unassigned().iter().copied().collect();
                if !open.is_empty() {
                    let share = open.len() as f64 / current.total() as f64;
                    if rng.random_bool(share.clamp(0.0, 1.0)) {
                        let n = ((open.len() as f64 * rate).ceil() as usize)
                            .clamp(1, config.exploration_cap.max(1))
                            .min(open.len());
                        pending.extend(open.choose_multiple(&mut rng, n).copied());
                    }
                }

                if pending.is_empty() {
                    ledger.restore(snapshot);
                    stagnation += 1;
                    break 'step 0.0;
                }

                let repaired =
                    repair_ops[pair.1].repair(ctx, &mut ledger, destroyed.partial, pending, &mut rng);
                if repaired.inserted == 0 {
                    ledger.restore(snapshot);
                    stagnation += 1;
                    break 'step 0.0;
                }
                let mut candidate = repaired.solution;
                debug_assert!(candidate.is_conserved(), "destroy/repair broke conservation");
                let candidate_score = candidate.score(ctx, &ledger);

                let (accepted, reward) = if candidate_score > best_score {
                    (true, config.score_new_best)
                } else if candidate_score > current_score {
                    let gain = candidate_score - current_score;
                    if gain >= config.large_improvement_ratio * current_score.abs().max(1.0) {
                        (true, config.score_large_improvement)
                    } else {
                        (true, config.score_improved)
                    }
                } else {
                    let delta = candidate_score - current_score;
                    let accept_prob = (delta / temperature).exp();
                    if rng.random_range(0.0..1.0) < accept_prob {
                        (true, config.score_accepted)
                    } else {
                        (false, 0.0)
                    }
                };

                // an accepted candidate becomes current only once the
                // ledger holds exactly its bookings
                let (accepted, reward) =
                    if accepted && !ledger.rebuild_from(ctx.network, ctx.packages, &candidate) {
                        tracing::warn!(iteration, "accepted candidate does not rebook, rejecting");
                        (false, 0.0)
                    } else {
                        (accepted, reward)
                    };

                if accepted && candidate_score > best_score {
                    best = candidate.clone();
                    best_score = candidate_score;
                    improvements += 1;
                    stagnation = 0;
                    new_best = true;
                    tracing::debug!(
                        iteration,
                        score = best_score,
                        assigned = best.assigned_count(),
                        destroy = destroy_ops[pair.0].name(),
                        repair = repair_ops[pair.1].name(),
                        "new best"
                    );
                } else {
                    stagnation += 1;
                }

                if accepted {
                    current = candidate;
                    current_score = candidate_score;
                } else {
                    ledger.restore(snapshot);
                }
                reward
            };
            selector.record(pair, reward);
            tracing::trace!(iteration, reward, current = current_score, best = best_score);

            match saved_temperature {
                None if stagnation > config.diversification_threshold => {
                    saved_temperature = Some(temperature);
                    temperature *= config.diversification_temperature_factor;
                    diversifications += 1;
                    tracing::debug!(iteration, stagnation, temperature, "entering diversification");
                }
                Some(saved)
                    if new_best || stagnation < config.diversification_threshold / 2 =>
                {
                    temperature = saved;
                    saved_temperature = None;
                    tracing::debug!(iteration, temperature, "leaving diversification");
                }
                _ => {}
            }

            if iterations.is_multiple_of(config.segment_length) {
                selector.update_weights(config.reaction_factor, config.min_weight);
                temperature = (temperature * config.cooling_rate).max(config.min_temperature);
                score_history.push(best_score);
                tracing::debug!(
                    iteration,
                    temperature,
                    weights = ?selector.weights(),
                    "segment closed"
                );
                debug_assert!(
                    ledger_matches(ctx, &ledger, &current),
                    "ledger drifted from the current solution"
                );
            }
        }

        if score_history
            .last()
            .is_none_or(|&last| (last - best_score).abs() > 1e-9)
        {
            score_history.push(best_score);
        }

        tracing::info!(
            iterations,
            improvements,
            diversifications,
            assigned = best.assigned_count(),
            unassigned = best.unassigned_count(),
            score = best_score,
            "alns done"
        );

        Ok(AlnsResult {
            best,
            best_score,
            iterations,
            improvements,
            diversifications,
            final_temperature: temperature,
            cancelled,
            destroy_names: destroy_ops.iter().map(|d| d.name().to_string()).collect(),
            repair_names: repair_ops.iter().map(|r| r.name().to_string()).collect(),
            pair_weights: selector.weights(),
            score_history,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alns::repair::GreedyRepair;
    use crate::network::Package;
    use crate::test_fixtures::{corridor, long_haul, package, shuttle};

    fn greedy_start(ctx: &SearchContext<'_>) -> Solution {
        let mut ledger = ctx.new_ledger();
        let ids = (0..ctx.packages.len()).map(PackageId).collect();
        let mut rng = StdRng::seed_from_u64(0);
        GreedyRepair
            .repair(ctx, &mut ledger, Solution::new(ctx.packages.len()), ids, &mut rng)
            .solution
    }

    fn small_config() -> AlnsConfig {
        AlnsConfig::default()
            .with_max_iterations(120)
            .with_segment_length(10)
            .with_seed(17)
    }

    #[test]
    fn test_fills_shuttle_from_empty_start() {
        let fx = shuttle(2);
        let packages = vec![
            package(0, fx.from, fx.to, 48, 1),
            package(1, fx.from, fx.to, 48, 1),
        ];
        let ctx = SearchContext::new(&fx.network, &packages, &fx.params);
        let result = AlnsRunner::run(&ctx, Solution::new(2), &small_config()).unwrap();

        assert_eq!(result.best.assigned_count(), 2);
        assert!(result.improvements >= 1);
        let mut ledger = ctx.new_ledger();
        assert!(ledger.rebuild_from(ctx.network, ctx.packages, &result.best));
        assert_eq!(ledger.flight_used(fx.flight), 2);
        for (&id, route) in result.best.assignments() {
            assert!(ctx.validator.is_on_time(ctx.package(id), route));
        }
    }

    #[test]
    fn test_overbooked_shuttle_leaves_one_out() {
        let fx = shuttle(2);
        let packages: Vec<Package> = (0..3).map(|i| package(i, fx.from, fx.to, 48, 1)).collect();
        let ctx = SearchContext::new(&fx.network, &packages, &fx.params);
        let result = AlnsRunner::run(&ctx, Solution::new(3), &small_config()).unwrap();

        assert_eq!(result.best.assigned_count(), 2);
        assert_eq!(result.best.unassigned_count(), 1);
        assert!(result.best.is_conserved());
        assert!(result.best.check(&ctx).is_ok());
    }

    #[test]
    fn test_ledger_rebooked_on_every_accept() {
        let mut nb = crate::network::NetworkBuilder::new();
        let from = nb.add_city("Lima", crate::network::Continent::America).unwrap();
        let to = nb.add_city("Santiago", crate::network::Continent::America).unwrap();
        let x = nb.add_airport(from, Some(3));
        let y = nb.add_airport(to, Some(40));
        let flight = nb.add_flight(x, y, 8.0, 30);
        let network = nb.build().unwrap();
        let params = crate::network::NetworkParams::default();
        let packages: Vec<Package> = (0..12).map(|i| package(i, from, to, 48, 1 + i as u32 % 2)).collect();
        let ctx = SearchContext::new(&network, &packages, &params);

        // closing a segment every iteration compares the ledger against a
        // fresh rebuild of the current solution each time
        let config = AlnsConfig::default()
            .with_max_iterations(300)
            .with_segment_length(1)
            .with_temperature(5_000.0, 0.99, 1.0)
            .with_seed(23);
        let result = AlnsRunner::run(&ctx, Solution::new(packages.len()), &config).unwrap();

        assert!(result.best.assigned_count() > 0);
        assert!(result.best.check(&ctx).is_ok());
        let mut ledger = ctx.new_ledger();
        assert!(ledger.rebuild_from(ctx.network, ctx.packages, &result.best));
        assert!(ledger.flight_used(flight) <= 30);
        assert!(ledger.peak_occupancy(x).is_some_and(|(_, units)| units <= 3));
    }

    #[test]
    fn test_history_never_decreases() {
        let fx = corridor();
        let cities = [fx.lima, fx.bogota, fx.quito, fx.brussels];
        let packages: Vec<Package> = (0..24)
            .map(|i| package(i, cities[i % 3], cities[(i + 2) % 4], 30 + (i as i64 % 5) * 10, 1 + i as u32 % 3))
            .collect();
        let ctx = SearchContext::new(&fx.network, &packages, &fx.params);
        let initial = greedy_start(&ctx);
        let mut scored = initial.clone();
        let mut ledger = ctx.new_ledger();
        assert!(ledger.rebuild_from(ctx.network, ctx.packages, &scored));
        let initial_score = scored.score(&ctx, &ledger);

        let config = small_config().with_destruction(0.3, 2, 8);
        let result = AlnsRunner::run(&ctx, initial, &config).unwrap();

        assert!(result.best_score >= initial_score);
        assert!(result
            .score_history
            .windows(2)
            .all(|w| w[1] >= w[0]));
        assert!(result.best.check(&ctx).is_ok());
        assert_eq!(result.pair_weights.len(), 16);
        assert!(result.pair_weight("random", "greedy").is_some());
        assert!(result.final_temperature >= config.min_temperature);
    }

    #[test]
    fn test_same_seed_same_result() {
        let fx = corridor();
        let packages: Vec<Package> = (0..10)
            .map(|i| package(i, fx.lima, if i % 2 == 0 { fx.quito } else { fx.brussels }, 60, 2))
            .collect();
        let ctx = SearchContext::new(&fx.network, &packages, &fx.params);
        let a = AlnsRunner::run(&ctx, Solution::new(10), &small_config()).unwrap();
        let b = AlnsRunner::run(&ctx, Solution::new(10), &small_config()).unwrap();
        assert_eq!(a.best, b.best);
        assert_eq!(a.iterations, b.iterations);
        assert_eq!(a.score_history, b.score_history);
    }

    #[test]
    fn test_cancelled_before_start() {
        let fx = shuttle(5);
        let packages = vec![package(0, fx.from, fx.to, 48, 1)];
        let ctx = SearchContext::new(&fx.network, &packages, &fx.params);
        let flag = Arc::new(AtomicBool::new(true));
        let result = AlnsRunner::run_with_operators(
            &ctx,
            Solution::new(1),
            &Destroy::portfolio(),
            &Repair::portfolio(2),
            &small_config(),
            Some(flag),
        )
        .unwrap();
        assert!(result.cancelled);
        assert_eq!(result.iterations, 0);
        assert_eq!(result.best.assigned_count(), 0);
    }

    #[test]
    fn test_stagnation_stops_early() {
        let fx = long_haul();
        let packages = vec![package(0, fx.origin, fx.destination, 100, 1)];
        let ctx = SearchContext::new(&fx.network, &packages, &fx.params);
        let config = small_config()
            .with_max_iterations(10_000)
            .with_stagnation_limit(30);
        let result = AlnsRunner::run(&ctx, Solution::new(1), &config).unwrap();
        assert!(result.iterations <= 32);
        assert_eq!(result.best.assigned_count(), 0);
    }

    #[test]
    fn test_rejects_bad_input() {
        let fx = shuttle(1);
        let packages = vec![
            package(0, fx.from, fx.to, 48, 1),
            package(1, fx.from, fx.to, 48, 1),
        ];
        let ctx = SearchContext::new(&fx.network, &packages, &fx.params);
        let bad = AlnsConfig::default().with_regret_level(1);
        assert!(AlnsRunner::run(&ctx, Solution::new(2), &bad).is_err());
        assert!(AlnsRunner::run(&ctx, Solution::new(3), &small_config()).is_err());

        // both booked on a one-seat flight
        let mut overbooked = Solution::new(2);
        overbooked.insert(PackageId(0), crate::route::Route::direct(fx.flight));
        overbooked.insert(PackageId(1), crate::route::Route::direct(fx.flight));
        assert!(matches!(
            AlnsRunner::run(&ctx, overbooked, &small_config()),
            Err(SolveError::InfeasibleSolution(_))
        ));
    }
}
