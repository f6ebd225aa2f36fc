//! Adaptive selection over (destroy, repair) pairs.

/// Running statistics of one operator pair.
#[derive(Debug, Clone)]
struct PairStats {
    weight: f64,
    segment_score: f64,
    segment_uses: usize,
}

impl PairStats {
    fn new() -> Self {
        Self {
            weight: 1.0,
            segment_score: 0.0,
            segment_uses: 0,
        }
    }

    fn record(&mut self, score: f64) {
        self.segment_score += score;
        self.segment_uses += 1;
    }

    /// Exponential smoothing at the end of a segment:
    ///
    /// w_new = w * (1 - rho) + rho * (pi / theta)
    ///
    /// with pi the accumulated reward and theta the uses in the segment.
    /// Unused pairs keep their weight.
    fn update_weight(&mut self, reaction_factor: f64, min_weight: f64) {
        if self.segment_uses > 0 {
            let avg_score = self.segment_score / self.segment_uses as f64;
            self.weight = self.weight * (1.0 - reaction_factor) + avg_score * reaction_factor;
            self.weight = self.weight.max(min_weight);
        }
        self.segment_score = 0.0;
        self.segment_uses = 0;
    }
}

/// Roulette-wheel selection over every (destroy, repair) combination.
///
/// Pairs are indexed row-major: pair `i` is destroy `i / n_repair` with
/// repair `i % n_repair`.
#[derive(Debug, Clone)]
pub struct OperatorSelector {
    n_repair: usize,
    pairs: Vec<PairStats>,
}

impl OperatorSelector {
    pub fn new(n_destroy: usize, n_repair: usize) -> Self {
        Self {
            n_repair,
            pairs: (0..n_destroy * n_repair).map(|_| PairStats::new()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Picks a pair with probability proportional to its weight.
    pub fn select<R: rand::Rng>(&self, rng: &mut R) -> (usize, usize) {
        let idx = self.roulette(rng);
        (idx / self.n_repair.max(1), idx % self.n_repair.max(1))
    }

    fn roulette<R: rand::Rng>(&self, rng: &mut R) -> usize {
        let total: f64 = self.pairs.iter().map(|s| s.weight).sum();
        if total <= 0.0 || self.pairs.is_empty() {
            return 0;
        }

        let mut roll = rng.random_range(0.0..total);
        for (i, stat) in self.pairs.iter().enumerate() {
            roll -= stat.weight;
            if roll <= 0.0 {
                return i;
            }
        }
        self.pairs.len() - 1
    }

    /// Credits `score` to the pair.
    pub fn record(&mut self, pair: (usize, usize), score: f64) {
        let idx = pair.0 * self.n_repair + pair.1;
        if let Some(stat) = self.pairs.get_mut(idx) {
            stat.record(score);
        }
    }

    /// Closes a segment: every used pair's weight moves toward its mean
    /// reward and the accumulators reset.
    pub fn update_weights(&mut self, reaction_factor: f64, min_weight: f64) {
        for stat in &mut self.pairs {
            stat.update_weight(reaction_factor, min_weight);
        }
    }

    /// Current weights, row-major.
    pub fn weights(&self) -> Vec<f64> {
        self.pairs.iter().map(|s| s.weight).collect()
    }

    pub fn weight(&self, pair: (usize, usize)) -> f64 {
        self.pairs[pair.0 * self.n_repair + pair.1].weight
    }
}
