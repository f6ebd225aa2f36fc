//! Solve entry point: intake, initial construction, search and report.
//!
//! [`solve`] is blocking and runs on the calling thread. With the
//! `parallel` feature, [`solve_many`] runs several seeds concurrently,
//! each with its own context and ledger over the shared network.

mod context;

pub use context::SearchContext;

use rand::rngs::StdRng;
use rand::SeedableRng;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::alns::{AlnsConfig, AlnsRunner, DEFAULT_SEED};
pub use crate::construct::InitialConstruction;
use crate::error::SolveError;
use crate::network::{unitize, validate_packages, CityId, Network, NetworkParams, Package, PackageId};
use crate::solution::{Solution, SolutionReport};
use crate::tabu::{TabuConfig, TabuRunner};

/// What a strategy hands back to [`solve`].
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub best: Solution,
    pub best_score: f64,
    pub iterations: usize,
}

/// An improvement search over a starting solution.
pub trait SearchStrategy {
    fn name(&self) -> &str;

    fn search(&self, ctx: &SearchContext<'_>, initial: Solution) -> Result<SearchOutcome, SolveError>;
}

impl SearchStrategy for AlnsConfig {
    fn name(&self) -> &str {
        "alns"
    }

    fn search(&self, ctx: &SearchContext<'_>, initial: Solution) -> Result<SearchOutcome, SolveError> {
        let result = AlnsRunner::run(ctx, initial, self)?;
        Ok(SearchOutcome {
            best: result.best,
            best_score: result.best_score,
            iterations: result.iterations,
        })
    }
}

impl SearchStrategy for TabuConfig {
    fn name(&self) -> &str {
        "tabu"
    }

    fn search(&self, ctx: &SearchContext<'_>, initial: Solution) -> Result<SearchOutcome, SolveError> {
        let result = TabuRunner::run(ctx, initial, self)?;
        Ok(SearchOutcome {
            best: result.best,
            best_score: result.best_score,
            iterations: result.iterations,
        })
    }
}

/// Which improvement search [`solve`] runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Strategy {
    #[default]
    Alns,
    Tabu,
}

/// Parameters of one [`solve`] call.
///
/// # Examples
///
/// ```
/// use u_airfreight::engine::{InitialConstruction, SolveParams, Strategy};
///
/// let params = SolveParams::default()
///     .with_strategy(Strategy::Tabu)
///     .with_initial(InitialConstruction::Random)
///     .with_headquarters(["Lima", "Brussels"])
///     .with_seed(7);
/// assert!(params.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SolveParams {
    pub strategy: Strategy,
    pub initial: InitialConstruction,
    /// Split every package into single-unit packages before routing.
    pub unitize: bool,
    /// When set, only packages leaving one of these cities are routed.
    pub headquarters: Option<Vec<String>>,
    pub network: NetworkParams,
    pub alns: AlnsConfig,
    pub tabu: TabuConfig,
    /// Seeds construction and search; overrides the strategy configs'
    /// own seeds.
    pub seed: Option<u64>,
}

impl Default for SolveParams {
    fn default() -> Self {
        Self {
            strategy: Strategy::Alns,
            initial: InitialConstruction::Greedy,
            unitize: false,
            headquarters: None,
            network: NetworkParams::default(),
            alns: AlnsConfig::default(),
            tabu: TabuConfig::default(),
            seed: None,
        }
    }
}

impl SolveParams {
    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_initial(mut self, initial: InitialConstruction) -> Self {
        self.initial = initial;
        self
    }

    pub fn with_unitize(mut self, unitize: bool) -> Self {
        self.unitize = unitize;
        self
    }

    pub fn with_headquarters<I, S>(mut self, cities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.headquarters = Some(cities.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_network(mut self, network: NetworkParams) -> Self {
        self.network = network;
        self
    }

    pub fn with_alns(mut self, config: AlnsConfig) -> Self {
        self.alns = config;
        self
    }

    pub fn with_tabu(mut self, config: TabuConfig) -> Self {
        self.tabu = config;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<(), SolveError> {
        self.network.validate()?;
        match self.strategy {
            Strategy::Alns => self.alns.validate(),
            Strategy::Tabu => self.tabu.validate(),
        }
    }

    fn strategy(&self) -> Box<dyn SearchStrategy> {
        match self.strategy {
            Strategy::Alns => {
                let mut config = self.alns.clone();
                if let Some(seed) = self.seed {
                    config.seed = Some(seed);
                }
                Box::new(config)
            }
            Strategy::Tabu => {
                let mut config = self.tabu.clone();
                if let Some(seed) = self.seed {
                    config.seed = Some(seed);
                }
                Box::new(config)
            }
        }
    }

    fn resolve_headquarters(&self, network: &Network) -> Result<Option<Vec<CityId>>, SolveError> {
        let Some(names) = &self.headquarters else {
            return Ok(None);
        };
        names
            .iter()
            .map(|name| {
                network
                    .city_by_name(name)
                    .ok_or_else(|| SolveError::UnknownCity(name.clone()))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Some)
    }
}

/// Result of a [`solve`] call.
#[derive(Debug, Clone)]
pub struct SolveOutcome {
    /// Assignment over `packages`; rejected packages stay unassigned.
    pub solution: Solution,
    /// The packages as routed: unitized when requested, numbered densely.
    pub packages: Vec<Package>,
    /// Packages turned away at intake by the headquarters filter.
    pub rejected: Vec<PackageId>,
    pub report: SolutionReport,
    pub score: f64,
    pub iterations: usize,
    pub strategy: Strategy,
}

/// Assigns `packages` to itineraries over `network`.
///
/// Validates the parameters and package records, unitizes and filters
/// the intake, builds the initial solution and runs the selected search.
/// The network is never mutated.
#[tracing::instrument(skip_all, fields(packages = packages.len(), strategy = ?params.strategy))]
pub fn solve(
    packages: &[Package],
    network: &Network,
    params: &SolveParams,
) -> Result<SolveOutcome, SolveError> {
    params.validate()?;
    validate_packages(packages, network)?;
    let headquarters = params.resolve_headquarters(network)?;

    let intake = if params.unitize {
        unitize(packages)
    } else {
        packages.to_vec()
    };

    let mut accepted: Vec<PackageId> = Vec::with_capacity(intake.len());
    let mut rejected = Vec::new();
    for package in &intake {
        match &headquarters {
            Some(hq) if !hq.contains(&package.origin) => {
                tracing::warn!(package = %package.id, "origin is not a headquarter, rejected");
                rejected.push(package.id);
            }
            _ => accepted.push(package.id),
        }
    }

    // search over the accepted packages only, renumbered densely
    let routed: Vec<Package> = accepted
        .iter()
        .enumerate()
        .map(|(k, &id)| Package {
            id: PackageId(k),
            ..intake[id.index()].clone()
        })
        .collect();

    let full_ctx = SearchContext::new(network, &intake, &params.network);
    let ctx = SearchContext::new(network, &routed, &params.network).with_t0(full_ctx.t0);

    tracing::info!(
        intake = intake.len(),
        accepted = routed.len(),
        rejected = rejected.len(),
        "solve start"
    );

    let mut rng = StdRng::seed_from_u64(params.seed.unwrap_or(DEFAULT_SEED));
    let initial = params.initial.build(&ctx, &mut rng);
    let strategy = params.strategy();
    let outcome = if routed.is_empty() {
        SearchOutcome {
            best: initial,
            best_score: 0.0,
            iterations: 0,
        }
    } else {
        strategy.search(&ctx, initial)?
    };

    let mut solution = Solution::new(intake.len());
    for (&k, route) in outcome.best.assignments() {
        solution.insert(accepted[k.index()], route.clone());
    }
    let mut ledger = full_ctx.new_ledger();
    if !ledger.rebuild_from(network, &intake, &solution) {
        return Err(SolveError::InfeasibleSolution(
            "best solution does not fit the network".into(),
        ));
    }
    let score = solution.score(&full_ctx, &ledger);
    let report = SolutionReport::build(&full_ctx, &ledger, &solution);

    tracing::info!(
        strategy = strategy.name(),
        assigned = report.assigned,
        unassigned = report.unassigned,
        on_time = report.on_time,
        score,
        "solve done"
    );

    Ok(SolveOutcome {
        solution,
        packages: intake,
        rejected,
        report,
        score,
        iterations: outcome.iterations,
        strategy: params.strategy,
    })
}

/// Runs [`solve`] once per seed, concurrently.
///
/// Outcomes come back in seed order.
#[cfg(feature = "parallel")]
pub fn solve_many(
    packages: &[Package],
    network: &Network,
    params: &SolveParams,
    seeds: &[u64],
) -> Vec<Result<SolveOutcome, SolveError>> {
    use rayon::prelude::*;

    seeds
        .par_iter()
        .map(|&seed| solve(packages, network, &params.clone().with_seed(seed)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::ProductId;
    use crate::route::Route;
    use crate::test_fixtures::{corridor, package, shuttle};

    fn quick() -> SolveParams {
        SolveParams::default()
            .with_alns(AlnsConfig::default().with_max_iterations(40))
            .with_tabu(TabuConfig::default().with_max_iterations(40))
            .with_seed(5)
    }

    #[test]
    fn test_at_destination_package_gets_empty_route() {
        let fx = corridor();
        let packages = vec![package(0, fx.quito, fx.quito, 24, 3)];
        let outcome = solve(&packages, &fx.network, &quick()).unwrap();

        assert_eq!(outcome.solution.route_of(PackageId(0)), Some(&Route::empty()));
        assert_eq!(outcome.report.routes.values().map(|h| h.same_continent.at_destination).sum::<usize>(), 1);
        assert_eq!(outcome.report.on_time, 1);
        // no flight carries anything
        assert_eq!(outcome.report.mean_flight_utilization, 0.0);
    }

    #[test]
    fn test_both_strategies_fill_shuttle() {
        let fx = shuttle(3);
        let packages: Vec<Package> = (0..4).map(|i| package(i, fx.from, fx.to, 48, 1)).collect();
        for strategy in [Strategy::Alns, Strategy::Tabu] {
            let params = quick().with_strategy(strategy);
            let outcome = solve(&packages, &fx.network, &params).unwrap();
            assert_eq!(outcome.report.assigned, 3, "{strategy:?}");
            assert_eq!(outcome.report.unassigned, 1, "{strategy:?}");
            assert!(outcome.solution.is_conserved());
            assert_eq!(outcome.strategy, strategy);
        }
    }

    #[test]
    fn test_headquarters_filter_rejects_other_origins() {
        let fx = corridor();
        let packages = vec![
            package(0, fx.lima, fx.quito, 48, 1),
            package(1, fx.bogota, fx.quito, 48, 1),
            package(2, fx.lima, fx.brussels, 72, 1),
        ];
        let params = quick().with_headquarters([" lima "]);
        let outcome = solve(&packages, &fx.network, &params).unwrap();

        assert_eq!(outcome.rejected, vec![PackageId(1)]);
        assert!(!outcome.solution.is_assigned(PackageId(1)));
        assert!(outcome.solution.is_assigned(PackageId(0)));
        assert!(outcome.solution.is_assigned(PackageId(2)));
        assert_eq!(outcome.report.total_packages, 3);
        assert_eq!(outcome.report.unassigned, 1);
    }

    #[test]
    fn test_unknown_headquarter_is_an_error() {
        let fx = corridor();
        let packages = vec![package(0, fx.lima, fx.quito, 48, 1)];
        let params = quick().with_headquarters(["Atlantis"]);
        assert_eq!(
            solve(&packages, &fx.network, &params).unwrap_err(),
            SolveError::UnknownCity("Atlantis".into())
        );
    }

    #[test]
    fn test_unitized_delivery_grouped_by_source() {
        let fx = shuttle(2);
        let packages = vec![package(0, fx.from, fx.to, 48, 3)];
        let params = quick().with_unitize(true);
        let outcome = solve(&packages, &fx.network, &params).unwrap();

        assert_eq!(outcome.packages.len(), 3);
        assert!(outcome.packages.iter().all(|p| p.products.len() == 1));
        assert_eq!(outcome.report.assigned, 2);
        let delivery = &outcome.report.by_source[&PackageId(0)];
        assert_eq!((delivery.delivered_units, delivery.total_units), (2, 3));
    }

    #[test]
    fn test_invalid_input_is_reported() {
        let fx = corridor();
        let mut bad = package(0, fx.lima, fx.quito, 48, 1);
        bad.products = Vec::<ProductId>::new();
        assert!(matches!(
            solve(&[bad], &fx.network, &quick()),
            Err(SolveError::InvalidPackage { id: 0, .. })
        ));

        let params = quick().with_alns(AlnsConfig::default().with_max_iterations(0));
        let ok = package(0, fx.lima, fx.quito, 48, 1);
        assert!(matches!(
            solve(&[ok], &fx.network, &params),
            Err(SolveError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_same_seed_same_outcome() {
        let fx = corridor();
        let packages: Vec<Package> = (0..12)
            .map(|i| package(i, fx.lima, if i % 2 == 0 { fx.quito } else { fx.brussels }, 60, 1))
            .collect();
        let a = solve(&packages, &fx.network, &quick()).unwrap();
        let b = solve(&packages, &fx.network, &quick()).unwrap();
        assert_eq!(a.solution, b.solution);
        assert_eq!(a.score, b.score);
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_solve_many_returns_one_outcome_per_seed() {
        let fx = shuttle(2);
        let packages: Vec<Package> = (0..3).map(|i| package(i, fx.from, fx.to, 48, 1)).collect();
        let outcomes = solve_many(&packages, &fx.network, &quick(), &[1, 2, 3]);
        assert_eq!(outcomes.len(), 3);
        for outcome in outcomes {
            assert_eq!(outcome.unwrap().report.assigned, 2);
        }
    }
}
