//! Tabu Search configuration.

use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::SolveError;

/// Configuration parameters for Tabu Search.
///
/// Tenure is measured in clock ticks. With the default
/// [`LogicalClock`](super::LogicalClock) one tick is one iteration; with
/// [`WallClock`](super::WallClock) it is one millisecond.
///
/// # Examples
///
/// ```
/// use u_airfreight::tabu::TabuConfig;
///
/// let config = TabuConfig::default()
///     .with_max_iterations(1000)
///     .with_tabu_tenure(7)
///     .with_aspiration(true);
/// assert_eq!(config.max_iterations, 1000);
/// assert_eq!(config.tabu_tenure, 7);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TabuConfig {
    /// Maximum number of iterations.
    pub max_iterations: usize,
    /// Maximum iterations without a new best before stopping.
    pub max_no_improve: usize,
    /// Maximum number of moves held by the tabu list.
    pub tabu_list_size: usize,
    /// Ticks a move stays tabu.
    pub tabu_tenure: u64,
    /// Whether a tabu move that yields a new global best is admissible.
    pub aspiration: bool,
    /// Per-type caps on sampled moves.
    pub insert_cap: usize,
    pub remove_cap: usize,
    pub reassign_cap: usize,
    pub swap_cap: usize,
    /// Size of the combined, shuffled neighborhood.
    pub neighborhood_size: usize,
    /// Whether to perturb the current solution after
    /// `max_no_improve / 2` iterations without a new best.
    pub diversify: bool,
    /// Relative gain of a new best that triggers intensification.
    pub intensification_threshold: f64,
    /// Wall-clock budget, checked between iterations.
    pub time_limit: Option<Duration>,
    /// Random seed (None for the crate default).
    pub seed: Option<u64>,
}

impl Default for TabuConfig {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            max_no_improve: 100,
            tabu_list_size: 50,
            tabu_tenure: 20,
            aspiration: true,
            insert_cap: 30,
            remove_cap: 20,
            reassign_cap: 40,
            swap_cap: 30,
            neighborhood_size: 100,
            diversify: true,
            intensification_threshold: 0.05,
            time_limit: None,
            seed: None,
        }
    }
}

impl TabuConfig {
    /// Sets the maximum number of iterations.
    pub fn with_max_iterations(mut self, n: usize) -> Self {
        self.max_iterations = n;
        self
    }

    /// Sets the tabu tenure, in clock ticks.
    pub fn with_tabu_tenure(mut self, tenure: u64) -> Self {
        self.tabu_tenure = tenure;
        self
    }

    pub fn with_tabu_list_size(mut self, size: usize) -> Self {
        self.tabu_list_size = size;
        self
    }

    /// Enables or disables aspiration criterion.
    pub fn with_aspiration(mut self, aspiration: bool) -> Self {
        self.aspiration = aspiration;
        self
    }

    /// Sets maximum iterations without improvement.
    pub fn with_max_no_improve(mut self, n: usize) -> Self {
        self.max_no_improve = n;
        self
    }

    /// Sets the per-type move caps.
    pub fn with_move_caps(mut self, insert: usize, remove: usize, reassign: usize, swap: usize) -> Self {
        self.insert_cap = insert;
        self.remove_cap = remove;
        self.reassign_cap = reassign;
        self.swap_cap = swap;
        self
    }

    pub fn with_neighborhood_size(mut self, n: usize) -> Self {
        self.neighborhood_size = n;
        self
    }

    pub fn with_diversification(mut self, enabled: bool) -> Self {
        self.diversify = enabled;
        self
    }

    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = Some(limit);
        self
    }

    /// Sets the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<(), SolveError> {
        let invalid = |msg: &str| Err(SolveError::InvalidConfig(msg.to_string()));
        if self.max_iterations == 0 {
            return invalid("max_iterations must be positive");
        }
        if self.max_no_improve == 0 {
            return invalid("max_no_improve must be positive");
        }
        if self.tabu_list_size == 0 {
            return invalid("tabu_list_size must be positive");
        }
        if self.neighborhood_size == 0 {
            return invalid("neighborhood_size must be positive");
        }
        if self.intensification_threshold < 0.0 {
            return invalid("intensification_threshold must not be negative");
        }
        Ok(())
    }
}
