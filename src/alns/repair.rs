//! Repair operators.
//!
//! A repair walks the pending packages in its own priority order and books
//! each on the first route, in its own preference order, that still passes
//! [`Solution::try_assign`]. Anything left over is reported back.

use std::cmp::Ordering;

use rand::Rng;

use super::types::{RepairOperator, RepairResult};
use crate::engine::SearchContext;
use crate::ledger::CapacityLedger;
use crate::network::{Package, PackageId};
use crate::route::RouteOption;
use crate::solution::Solution;

/// How pressing a package is, from its available hours against the
/// continental promise. Explicit priority raises it; generous budgets
/// lower it.
pub fn urgency(ctx: &SearchContext<'_>, package: &Package) -> f64 {
    let available = ctx.validator.available_hours(package);
    let promise = ctx.validator.promise_hours(package);
    let mut u = if available <= 0.5 * promise {
        10.0
    } else if available <= 0.75 * promise {
        5.0
    } else if available <= promise {
        3.0
    } else if available <= 1.5 * promise {
        1.0
    } else {
        0.5
    };
    if package.priority > 0.0 {
        u *= 1.0 + package.priority / 10.0;
    }
    if available > 1.2 * promise {
        u *= 0.8;
    }
    u
}

fn by_margin_desc(a: &RouteOption, b: &RouteOption) -> Ordering {
    b.margin.total_cmp(&a.margin).then_with(|| a.route.cmp(&b.route))
}

/// Books `id` on the first option that still fits.
fn insert_first(
    ctx: &SearchContext<'_>,
    ledger: &mut CapacityLedger,
    solution: &mut Solution,
    id: PackageId,
    options: Vec<RouteOption>,
) -> bool {
    options
        .into_iter()
        .any(|opt| solution.try_assign(ctx, ledger, id, opt.route))
}

/// Inserts packages one by one in a fixed order, ranking each package's
/// options with `rank`.
fn sequential<R: Rng>(
    ctx: &SearchContext<'_>,
    ledger: &mut CapacityLedger,
    mut solution: Solution,
    order: Vec<PackageId>,
    rank: fn(&RouteOption, &RouteOption) -> Ordering,
    rng: &mut R,
) -> RepairResult {
    let mut unassigned = Vec::new();
    let mut inserted = 0;
    for id in order {
        if solution.is_assigned(id) {
            continue;
        }
        let package = ctx.package(id);
        let mut options = ctx
            .finder
            .route_options(&ctx.validator, ledger, package, rng);
        options.sort_by(rank);
        if insert_first(ctx, ledger, &mut solution, id, options) {
            inserted += 1;
        } else {
            unassigned.push(id);
        }
    }
    RepairResult {
        solution,
        unassigned,
        inserted,
    }
}

/// Most urgent first, then larger, then earlier deadline; best-margin
/// route.
#[derive(Debug, Clone, Default)]
pub struct GreedyRepair;

impl RepairOperator for GreedyRepair {
    fn name(&self) -> &str {
        "greedy"
    }

    fn repair<R: Rng>(
        &self,
        ctx: &SearchContext<'_>,
        ledger: &mut CapacityLedger,
        partial: Solution,
        mut pending: Vec<PackageId>,
        rng: &mut R,
    ) -> RepairResult {
        let mut keyed: Vec<(PackageId, f64)> = pending
            .drain(..)
            .map(|id| (id, urgency(ctx, ctx.package(id))))
            .collect();
        keyed.sort_by(|(a, ua), (b, ub)| {
            let (pa, pb) = (ctx.package(*a), ctx.package(*b));
            ub.total_cmp(ua)
                .then(pb.unit_count().cmp(&pa.unit_count()))
                .then(pa.deadline_minute.cmp(&pb.deadline_minute))
                .then(a.cmp(b))
        });
        let order = keyed.into_iter().map(|(id, _)| id).collect();
        sequential(ctx, ledger, partial, order, by_margin_desc, rng)
    }
}

/// Inserts the package that loses most by waiting, one at a time.
#[derive(Debug, Clone)]
pub struct RegretRepair {
    k: usize,
}

impl Default for RegretRepair {
    fn default() -> Self {
        Self { k: 2 }
    }
}

impl RegretRepair {
    /// Compares the top `k` options, never fewer than two.
    pub fn new(k: usize) -> Self {
        Self { k: k.max(2) }
    }

    /// Number of top options compared.
    pub fn k(&self) -> usize {
        self.k
    }

    /// Regret of a package with `options` sorted by descending margin.
    ///
    /// With one option left the gap is measured against the
    /// cross-continent promise instead: a package with little time and a
    /// single way out should go first.
    pub fn regret(&self, ctx: &SearchContext<'_>, package: &Package, options: &[RouteOption]) -> f64 {
        let promise = ctx.params.cross_continent_promise_hours;
        let base = match options {
            [] => return 0.0,
            [_] => (promise - ctx.validator.available_hours(package).min(promise)).max(0.0),
            [best, rest @ ..] => rest
                .iter()
                .take(self.k - 1)
                .map(|o| best.margin - o.margin)
                .sum(),
        };
        base * (promise / ctx.hours_until_deadline(package)).max(1.0)
    }
}

impl RepairOperator for RegretRepair {
    fn name(&self) -> &str {
        "regret"
    }

    fn repair<R: Rng>(
        &self,
        ctx: &SearchContext<'_>,
        ledger: &mut CapacityLedger,
        mut solution: Solution,
        pending: Vec<PackageId>,
        rng: &mut R,
    ) -> RepairResult {
        let mut remaining: Vec<PackageId> = pending
            .into_iter()
            .filter(|&id| !solution.is_assigned(id))
            .collect();
        remaining.sort();
        remaining.dedup();
        let mut unassigned = Vec::new();
        let mut inserted = 0;

        while !remaining.is_empty() {
            let mut pick: Option<(usize, f64, Vec<RouteOption>)> = None;
            for (i, &id) in remaining.iter().enumerate() {
                let package = ctx.package(id);
                let mut options = ctx
                    .finder
                    .route_options(&ctx.validator, ledger, package, rng);
                if options.is_empty() {
                    continue;
                }
                options.sort_by(by_margin_desc);
                let regret = self.regret(ctx, package, &options);
                if pick.as_ref().is_none_or(|(_, best, _)| regret > *best) {
                    pick = Some((i, regret, options));
                }
            }
            let Some((i, _, options)) = pick else {
                break;
            };
            let id = remaining.remove(i);
            if insert_first(ctx, ledger, &mut solution, id, options) {
                inserted += 1;
            } else {
                unassigned.push(id);
            }
        }
        unassigned.extend(remaining);
        RepairResult {
            solution,
            unassigned,
            inserted,
        }
    }
}

/// Least available time first; max-margin route.
#[derive(Debug, Clone, Default)]
pub struct TimeBasedRepair;

impl RepairOperator for TimeBasedRepair {
    fn name(&self) -> &str {
        "time_based"
    }

    fn repair<R: Rng>(
        &self,
        ctx: &SearchContext<'_>,
        ledger: &mut CapacityLedger,
        partial: Solution,
        mut pending: Vec<PackageId>,
        rng: &mut R,
    ) -> RepairResult {
        pending.sort_by(|&a, &b| {
            let ha = ctx.validator.available_hours(ctx.package(a));
            let hb = ctx.validator.available_hours(ctx.package(b));
            ha.total_cmp(&hb).then(a.cmp(&b))
        });
        sequential(ctx, ledger, partial, pending, by_margin_desc, rng)
    }
}

/// Earliest deadline first; roomiest route, routes without time margin
/// last.
#[derive(Debug, Clone, Default)]
pub struct CapacityBasedRepair;

impl RepairOperator for CapacityBasedRepair {
    fn name(&self) -> &str {
        "capacity_based"
    }

    fn repair<R: Rng>(
        &self,
        ctx: &SearchContext<'_>,
        ledger: &mut CapacityLedger,
        partial: Solution,
        mut pending: Vec<PackageId>,
        rng: &mut R,
    ) -> RepairResult {
        pending.sort_by_key(|&id| (ctx.package(id).deadline_minute, id));
        let rank = |a: &RouteOption, b: &RouteOption| {
            (b.margin > 0.0)
                .cmp(&(a.margin > 0.0))
                .then(b.capacity_ratio.total_cmp(&a.capacity_ratio))
                .then_with(|| a.route.cmp(&b.route))
        };
        sequential(ctx, ledger, partial, pending, rank, rng)
    }
}

/// The repair portfolio, dispatched by variant.
#[derive(Debug, Clone)]
pub enum Repair {
    Greedy(GreedyRepair),
    Regret(RegretRepair),
    TimeBased(TimeBasedRepair),
    CapacityBased(CapacityBasedRepair),
}

impl Repair {
    /// All four operators; the regret repair compares `regret_level`
    /// options.
    pub fn portfolio(regret_level: usize) -> Vec<Repair> {
        vec![
            Repair::Greedy(GreedyRepair),
            Repair::Regret(RegretRepair::new(regret_level)),
            Repair::TimeBased(TimeBasedRepair),
            Repair::CapacityBased(CapacityBasedRepair),
        ]
    }
}

impl RepairOperator for Repair {
    fn name(&self) -> &str {
        match self {
            Repair::Greedy(op) => op.name(),
            Repair::Regret(op) => op.name(),
            Repair::TimeBased(op) => op.name(),
            Repair::CapacityBased(op) => op.name(),
        }
    }

    fn repair<R: Rng>(
        &self,
        ctx: &SearchContext<'_>,
        ledger: &mut CapacityLedger,
        partial: Solution,
        pending: Vec<PackageId>,
        rng: &mut R,
    ) -> RepairResult {
        match self {
            Repair::Greedy(op) => op.repair(ctx, ledger, partial, pending, rng),
            Repair::Regret(op) => op.repair(ctx, ledger, partial, pending, rng),
            Repair::TimeBased(op) => op.repair(ctx, ledger, partial, pending, rng),
            Repair::CapacityBased(op) => op.repair(ctx, ledger, partial, pending, rng),
        }
    }
}
