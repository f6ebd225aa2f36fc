//! ALNS configuration.

use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::SolveError;

/// Seed used when the caller does not provide one, so runs stay
/// reproducible by default.
pub const DEFAULT_SEED: u64 = 0x5EED_A1F5;

/// Configuration for the ALNS driver.
///
/// # Scoring
///
/// Each iteration rewards the selected (destroy, repair) pair with one of:
/// - `score_new_best`: the candidate beat the best score ever seen
/// - `score_large_improvement`: it beat the current score by at least
///   `large_improvement_ratio` (relative)
/// - `score_improved`: it beat the current score
/// - `score_accepted`: it was worse but passed the annealing test
/// - zero: rejected
///
/// Rewards accumulate over `segment_length` iterations. At the end of a
/// segment each pair's weight moves toward its mean reward by
/// `reaction_factor`, and the temperature is multiplied by `cooling_rate`.
///
/// # Acceptance
///
/// A worse candidate is accepted with probability `exp(Δ / T)`, where `Δ`
/// is the (negative) score difference and `T` the current temperature.
///
/// # Examples
///
/// ```
/// use u_airfreight::alns::AlnsConfig;
///
/// let config = AlnsConfig::default()
///     .with_max_iterations(500)
///     .with_destruction(0.2, 5, 100)
///     .with_seed(7);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AlnsConfig {
    pub max_iterations: usize,

    /// Stop once this many consecutive iterations fail to find a new best.
    pub stagnation_limit: usize,

    /// Iterations between weight updates and cooling steps.
    pub segment_length: usize,

    pub score_new_best: f64,
    pub score_large_improvement: f64,
    pub score_improved: f64,
    pub score_accepted: f64,

    /// Relative gain over the current score that counts as large.
    pub large_improvement_ratio: f64,

    /// Weight smoothing factor, in (0, 1].
    pub reaction_factor: f64,

    /// Floor for any pair weight.
    pub min_weight: f64,

    /// Fraction of the candidate set each destroy operator removes.
    pub destruction_rate: f64,
    pub min_destroy: usize,
    pub max_destroy: usize,

    pub initial_temperature: f64,
    /// Per-segment cooling factor, in (0, 1).
    pub cooling_rate: f64,
    pub min_temperature: f64,

    /// Stagnation count that switches the driver into diversification.
    pub diversification_threshold: usize,
    /// Destruction rate multiplier while diversifying.
    pub diversification_rate_factor: f64,
    /// Temperature multiplier applied on entering diversification.
    pub diversification_temperature_factor: f64,

    /// Cap on unassigned packages sampled into one repair.
    pub exploration_cap: usize,

    /// `k` of the regret repair.
    pub regret_level: usize,

    /// Wall-clock budget, checked between iterations.
    pub time_limit: Option<Duration>,

    pub seed: Option<u64>,
}

impl Default for AlnsConfig {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            stagnation_limit: 200,
            segment_length: 25,
            score_new_best: 100.0,
            score_large_improvement: 50.0,
            score_improved: 25.0,
            score_accepted: 10.0,
            large_improvement_ratio: 0.02,
            reaction_factor: 0.1,
            min_weight: 0.01,
            destruction_rate: 0.15,
            min_destroy: 10,
            max_destroy: 500,
            initial_temperature: 1000.0,
            cooling_rate: 0.995,
            min_temperature: 0.01,
            diversification_threshold: 60,
            diversification_rate_factor: 2.0,
            diversification_temperature_factor: 2.0,
            exploration_cap: 100,
            regret_level: 2,
            time_limit: None,
            seed: None,
        }
    }
}

impl AlnsConfig {
    pub fn with_max_iterations(mut self, n: usize) -> Self {
        self.max_iterations = n;
        self
    }

    pub fn with_stagnation_limit(mut self, n: usize) -> Self {
        self.stagnation_limit = n;
        self
    }

    pub fn with_segment_length(mut self, n: usize) -> Self {
        self.segment_length = n.max(1);
        self
    }

    pub fn with_scores(
        mut self,
        new_best: f64,
        large_improvement: f64,
        improved: f64,
        accepted: f64,
    ) -> Self {
        self.score_new_best = new_best;
        self.score_large_improvement = large_improvement;
        self.score_improved = improved;
        self.score_accepted = accepted;
        self
    }

    pub fn with_reaction_factor(mut self, rho: f64) -> Self {
        self.reaction_factor = rho;
        self
    }

    /// Sets the destruction rate and the bounds on removed packages.
    pub fn with_destruction(mut self, rate: f64, min: usize, max: usize) -> Self {
        self.destruction_rate = rate;
        self.min_destroy = min;
        self.max_destroy = max;
        self
    }

    pub fn with_temperature(mut self, initial: f64, cooling_rate: f64, min: f64) -> Self {
        self.initial_temperature = initial;
        self.cooling_rate = cooling_rate;
        self.min_temperature = min;
        self
    }

    pub fn with_diversification(
        mut self,
        threshold: usize,
        rate_factor: f64,
        temperature_factor: f64,
    ) -> Self {
        self.diversification_threshold = threshold;
        self.diversification_rate_factor = rate_factor;
        self.diversification_temperature_factor = temperature_factor;
        self
    }

    pub fn with_regret_level(mut self, k: usize) -> Self {
        self.regret_level = k;
        self
    }

    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = Some(limit);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<(), SolveError> {
        let invalid = |msg: String| Err(SolveError::InvalidConfig(msg));
        if self.max_iterations == 0 {
            return invalid("max_iterations must be positive".into());
        }
        if self.segment_length == 0 {
            return invalid("segment_length must be positive".into());
        }
        if self.reaction_factor <= 0.0 || self.reaction_factor > 1.0 {
            return invalid(format!(
                "reaction_factor must be in (0, 1], got {}",
                self.reaction_factor
            ));
        }
        if self.min_weight <= 0.0 {
            return invalid("min_weight must be positive".into());
        }
        if !(self.destruction_rate > 0.0 && self.destruction_rate <= 1.0) {
            return invalid(format!(
                "destruction_rate must be in (0, 1], got {}",
                self.destruction_rate
            ));
        }
        if self.max_destroy == 0 {
            return invalid("max_destroy must be positive".into());
        }
        if self.cooling_rate <= 0.0 || self.cooling_rate >= 1.0 {
            return invalid(format!(
                "cooling_rate must be in (0, 1), got {}",
                self.cooling_rate
            ));
        }
        if self.initial_temperature <= 0.0 || self.min_temperature <= 0.0 {
            return invalid("temperatures must be positive".into());
        }
        if self.diversification_rate_factor < 1.0 || self.diversification_temperature_factor < 1.0
        {
            return invalid("diversification factors must be at least 1".into());
        }
        if self.regret_level < 2 {
            return invalid(format!(
                "regret_level must be at least 2, got {}",
                self.regret_level
            ));
        }
        Ok(())
    }
}

/// Number of packages to remove from a candidate set of `size`.
///
/// `floor(size × rate)`, raised to `min`, then capped by both `max` and
/// `size`. The cap wins when `min` exceeds it.
pub fn destroy_count(size: usize, rate: f64, min: usize, max: usize) -> usize {
    let scaled = (size as f64 * rate).floor() as usize;
    scaled.max(min).min(max.min(size))
}
