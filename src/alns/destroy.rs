//! Destroy operators.
//!
//! Every operator ranks its own candidate set and removes the top
//! [`DestroyBudget::count`] packages. When an operator has nothing
//! meaningful to act on it falls back to [`RandomDestroy`].

use std::collections::BTreeMap;

use rand::seq::SliceRandom;
use rand::Rng;

use super::types::{DestroyBudget, DestroyOperator, DestroyResult};
use crate::engine::SearchContext;
use crate::ledger::CapacityLedger;
use crate::network::{Continent, PackageId};
use crate::route::Route;
use crate::solution::Solution;

/// Slack ceiling of the most urgent bucket, in hours.
const LOW_SLACK_HOURS: f64 = 8.0;
/// Slack ceiling of the middle bucket.
const MID_SLACK_HOURS: f64 = 32.0;

/// Unused hours a package keeps on its current route. Packages already at
/// their destination free no flight capacity and report none.
fn slack(ctx: &SearchContext<'_>, id: PackageId, route: &Route) -> f64 {
    if route.is_empty() {
        0.0
    } else {
        ctx.validator.slack_hours(ctx.package(id), route)
    }
}

fn units(ctx: &SearchContext<'_>, id: PackageId) -> u32 {
    ctx.package(id).unit_count()
}

/// Removes packages with the most slack and the most units, skipping a
/// candidate now and then.
#[derive(Debug, Clone)]
pub struct RandomDestroy {
    /// Chance of skipping the next candidate.
    pub skip_probability: f64,
}

impl Default for RandomDestroy {
    fn default() -> Self {
        Self {
            skip_probability: 0.1,
        }
    }
}

impl DestroyOperator for RandomDestroy {
    fn name(&self) -> &str {
        "random"
    }

    fn destroy<R: Rng>(
        &self,
        ctx: &SearchContext<'_>,
        _ledger: &CapacityLedger,
        solution: &Solution,
        budget: DestroyBudget,
        rng: &mut R,
    ) -> DestroyResult {
        if solution.assigned_count() == 0 {
            return DestroyResult::unchanged(solution);
        }
        let mut ranked: Vec<(PackageId, f64)> = solution
            .assignments()
            .iter()
            .map(|(&id, route)| {
                let mut s = slack(ctx, id, route);
                if route.is_empty() {
                    s *= 0.1;
                }
                (id, s + 0.2 * units(ctx, id) as f64)
            })
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

        let k = budget.count(ranked.len());
        let mut picked = Vec::with_capacity(k);
        let mut i = 0;
        while picked.len() < k && i < ranked.len() {
            if i + 1 < ranked.len() && rng.random_bool(self.skip_probability) {
                i += 1;
            }
            picked.push(ranked[i].0);
            i += 1;
        }
        DestroyResult::take(solution, picked)
    }
}

/// Removes packages touching the continent with the most outgoing
/// cross-continent traffic.
#[derive(Debug, Clone, Default)]
pub struct GeographicDestroy {
    pub fallback: RandomDestroy,
}

impl DestroyOperator for GeographicDestroy {
    fn name(&self) -> &str {
        "geographic"
    }

    fn destroy<R: Rng>(
        &self,
        ctx: &SearchContext<'_>,
        ledger: &CapacityLedger,
        solution: &Solution,
        budget: DestroyBudget,
        rng: &mut R,
    ) -> DestroyResult {
        if solution.assigned_count() == 0 {
            return DestroyResult::unchanged(solution);
        }
        let net = ctx.network;
        let mut outgoing: BTreeMap<Continent, usize> = BTreeMap::new();
        for &id in solution.assignments().keys() {
            let p = ctx.package(id);
            let from = net.continent(p.origin);
            if from != net.continent(p.destination) {
                *outgoing.entry(from).or_default() += 1;
            }
        }
        // first continent in declaration order wins ties
        let Some(focus) = Continent::ALL
            .iter()
            .copied()
            .filter(|c| outgoing.get(c).copied().unwrap_or(0) > 0)
            .max_by(|a, b| outgoing[a].cmp(&outgoing[b]).then(b.cmp(a)))
        else {
            tracing::debug!(op = self.name(), "no cross-continent traffic, falling back to random");
            return self.fallback.destroy(ctx, ledger, solution, budget, rng);
        };

        struct Candidate {
            id: PackageId,
            cross: bool,
            at_destination: bool,
            slack: f64,
            units: u32,
        }
        let mut candidates: Vec<Candidate> = solution
            .assignments()
            .iter()
            .filter_map(|(&id, route)| {
                let p = ctx.package(id);
                let from = net.continent(p.origin);
                let to = net.continent(p.destination);
                (from == focus || to == focus).then(|| Candidate {
                    id,
                    cross: from != to,
                    at_destination: route.is_empty(),
                    slack: slack(ctx, id, route),
                    units: p.unit_count(),
                })
            })
            .collect();
        if candidates.len() < budget.min_candidates(solution.assigned_count()) {
            tracing::debug!(op = self.name(), ?focus, "too few candidates, falling back to random");
            return self.fallback.destroy(ctx, ledger, solution, budget, rng);
        }

        candidates.sort_by(|a, b| {
            b.cross
                .cmp(&a.cross)
                .then(a.at_destination.cmp(&b.at_destination))
                .then(b.slack.total_cmp(&a.slack))
                .then(b.units.cmp(&a.units))
                .then(a.id.cmp(&b.id))
        });
        let k = budget.count(candidates.len());
        DestroyResult::take(solution, candidates.iter().take(k).map(|c| c.id))
    }
}

/// Removes packages from the roomiest non-empty slack bucket, sparing
/// urgent ones.
#[derive(Debug, Clone, Default)]
pub struct TimeBasedDestroy {
    pub fallback: RandomDestroy,
}

impl DestroyOperator for TimeBasedDestroy {
    fn name(&self) -> &str {
        "time_based"
    }

    fn destroy<R: Rng>(
        &self,
        ctx: &SearchContext<'_>,
        ledger: &CapacityLedger,
        solution: &Solution,
        budget: DestroyBudget,
        rng: &mut R,
    ) -> DestroyResult {
        if solution.assigned_count() == 0 {
            return DestroyResult::unchanged(solution);
        }
        let (mut low, mut mid, mut high) = (Vec::new(), Vec::new(), Vec::new());
        for (&id, route) in solution.assignments() {
            if route.is_empty() {
                continue;
            }
            let s = slack(ctx, id, route);
            let bucket = if s <= LOW_SLACK_HOURS {
                &mut low
            } else if s <= MID_SLACK_HOURS {
                &mut mid
            } else {
                &mut high
            };
            bucket.push(id);
        }
        let group = [high, mid, low].into_iter().find(|g| !g.is_empty());
        let Some(mut group) = group else {
            tracing::debug!(op = self.name(), "only at-destination packages, falling back to random");
            return self.fallback.destroy(ctx, ledger, solution, budget, rng);
        };
        if group.len() < budget.min_candidates(solution.assigned_count()) {
            tracing::debug!(op = self.name(), size = group.len(), "bucket too small, falling back to random");
            return self.fallback.destroy(ctx, ledger, solution, budget, rng);
        }

        group.sort_by(|&a, &b| units(ctx, b).cmp(&units(ctx, a)).then(a.cmp(&b)));
        if group.len() > 10 {
            group[5..].shuffle(rng);
        } else {
            group.shuffle(rng);
        }
        let k = budget.count(group.len());
        group.truncate(k);
        DestroyResult::take(solution, group)
    }
}

/// Removes packages riding flights above a utilization threshold.
#[derive(Debug, Clone)]
pub struct CongestedRouteDestroy {
    pub threshold: f64,
    pub fallback: RandomDestroy,
}

impl Default for CongestedRouteDestroy {
    fn default() -> Self {
        Self {
            threshold: 0.85,
            fallback: RandomDestroy::default(),
        }
    }
}

impl CongestedRouteDestroy {
    /// Congestion above the threshold along the route, plus a bonus per
    /// unit, minus a penalty for packages with little slack.
    pub fn score(&self, ctx: &SearchContext<'_>, ledger: &CapacityLedger, id: PackageId, route: &Route) -> f64 {
        let congestion: f64 = route
            .flights()
            .iter()
            .map(|&f| ledger.flight_utilization(f))
            .filter(|&u| u > self.threshold)
            .map(|u| u - self.threshold)
            .sum();
        let s = slack(ctx, id, route);
        let urgency = if s <= LOW_SLACK_HOURS {
            LOW_SLACK_HOURS - s.max(0.0)
        } else {
            0.0
        };
        congestion + 0.25 * units(ctx, id) as f64 - 0.5 * urgency
    }
}

impl DestroyOperator for CongestedRouteDestroy {
    fn name(&self) -> &str {
        "congested_route"
    }

    fn destroy<R: Rng>(
        &self,
        ctx: &SearchContext<'_>,
        ledger: &CapacityLedger,
        solution: &Solution,
        budget: DestroyBudget,
        rng: &mut R,
    ) -> DestroyResult {
        if solution.assigned_count() == 0 {
            return DestroyResult::unchanged(solution);
        }
        let mut ranked: Vec<(PackageId, f64)> = solution
            .assignments()
            .iter()
            .filter(|(_, route)| !route.is_empty())
            .map(|(&id, route)| (id, self.score(ctx, ledger, id, route)))
            .filter(|&(_, score)| score > 0.0)
            .collect();
        if ranked.len() < budget.min_candidates(solution.assigned_count()) {
            tracing::debug!(op = self.name(), qualified = ranked.len(), "too few congested packages, falling back to random");
            return self.fallback.destroy(ctx, ledger, solution, budget, rng);
        }
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        let k = budget.count(ranked.len());
        DestroyResult::take(solution, ranked.into_iter().take(k).map(|(id, _)| id))
    }
}

/// The destroy portfolio, dispatched by variant.
#[derive(Debug, Clone)]
pub enum Destroy {
    Random(RandomDestroy),
    Geographic(GeographicDestroy),
    TimeBased(TimeBasedDestroy),
    CongestedRoute(CongestedRouteDestroy),
}

impl Destroy {
    /// All four operators with default settings.
    pub fn portfolio() -> Vec<Destroy> {
        vec![
            Destroy::Random(RandomDestroy::default()),
            Destroy::Geographic(GeographicDestroy::default()),
            Destroy::TimeBased(TimeBasedDestroy::default()),
            Destroy::CongestedRoute(CongestedRouteDestroy::default()),
        ]
    }
}

impl DestroyOperator for Destroy {
    fn name(&self) -> &str {
        match self {
            Destroy::Random(op) => op.name(),
            Destroy::Geographic(op) => op.name(),
            Destroy::TimeBased(op) => op.name(),
            Destroy::CongestedRoute(op) => op.name(),
        }
    }

    fn destroy<R: Rng>(
        &self,
        ctx: &SearchContext<'_>,
        ledger: &CapacityLedger,
        solution: &Solution,
        budget: DestroyBudget,
        rng: &mut R,
    ) -> DestroyResult {
        match self {
            Destroy::Random(op) => op.destroy(ctx, ledger, solution, budget, rng),
            Destroy::Geographic(op) => op.destroy(ctx, ledger, solution, budget, rng),
            Destroy::TimeBased(op) => op.destroy(ctx, ledger, solution, budget, rng),
            Destroy::CongestedRoute(op) => op.destroy(ctx, ledger, solution, budget, rng),
        }
    }
}
