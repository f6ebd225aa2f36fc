//! Adaptive Large Neighborhood Search (ALNS) for package assignment.
//!
//! ALNS iteratively destroys and repairs solutions using a portfolio of
//! operator pairs whose selection probabilities adapt based on past
//! performance. Candidates are accepted by a simulated annealing rule and
//! long stagnation triggers a reheated diversification phase.
//!
//! # References
//!
//! Ropke & Pisinger (2006), "An Adaptive Large Neighborhood Search Heuristic
//! for the Pickup and Delivery Problem with Time Windows"

mod config;
mod destroy;
mod repair;
mod runner;
mod selector;
mod types;

pub use config::{destroy_count, AlnsConfig, DEFAULT_SEED};
pub use destroy::{CongestedRouteDestroy, Destroy, GeographicDestroy, RandomDestroy, TimeBasedDestroy};
pub use repair::{urgency, CapacityBasedRepair, GreedyRepair, RegretRepair, Repair, TimeBasedRepair};
pub use runner::{AlnsResult, AlnsRunner};
pub use selector::OperatorSelector;
pub use types::{DestroyBudget, DestroyOperator, DestroyResult, RepairOperator, RepairResult};
