//! Air-freight package-to-itinerary assignment.
//!
//! Given a read-only airline network (cities, airports with warehouses,
//! capacitated flights) and a list of packages with origins, destinations
//! and deadlines, finds an assignment of packages to flight itineraries
//! of at most three legs that maximizes on-time delivery without
//! overbooking any flight or warehouse.
//!
//! - **Network**: immutable cities, airports, warehouses and flights, plus
//!   package demand records and unitization.
//! - **Route**: direct / one-stop / two-stop route search and a validator
//!   for structure, layovers, continental promises and deadlines.
//! - **Ledger**: per-run capacity bookkeeping with per-minute warehouse
//!   occupancy and value snapshots for rollback.
//! - **Solution**: assignment bookkeeping, weighted fitness and a
//!   diagnostics report.
//! - **ALNS**: Adaptive Large Neighborhood Search with four destroy and
//!   four repair operators, adaptive pair weights, simulated annealing
//!   acceptance and diversification.
//! - **Tabu Search**: insert / remove / reassign / swap neighborhoods with
//!   a tenure-limited tabu list and aspiration.
//! - **Engine**: the blocking [`solve`](engine::solve) entry point and,
//!   with the `parallel` feature, multi-seed runs.
//!
//! # Architecture
//!
//! The network is shared read-only; every search run owns a
//! [`SearchContext`](engine::SearchContext) and its own
//! [`CapacityLedger`](ledger::CapacityLedger), so runs never interfere.
//! Parsing input files and building the network from them is left to the
//! caller.

pub mod alns;
pub mod construct;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod network;
pub mod route;
pub mod solution;
pub mod tabu;

#[cfg(test)]
mod test_fixtures;

pub use engine::{solve, SolveOutcome, SolveParams, Strategy};
pub use error::SolveError;
