//! Tabu Search (TS) over package assignments.
//!
//! A single-solution trajectory search. Each iteration samples insert,
//! remove, reassign and swap moves, applies the best admissible one and
//! forbids its inverse for a tenure, preventing cycling and encouraging
//! exploration of new regions of the search space.
//!
//! # References
//!
//! - Glover, F. (1989). "Tabu Search—Part I", *ORSA Journal on Computing* 1(3), 190-206.
//! - Glover, F. (1990). "Tabu Search—Part II", *ORSA Journal on Computing* 2(1), 4-32.

mod config;
mod list;
mod neighborhood;
mod runner;
mod types;

pub use config::TabuConfig;
pub use list::{Clock, LogicalClock, TabuList, WallClock};
pub use neighborhood::Neighborhood;
pub use runner::{TabuResult, TabuRunner};
pub use types::{MoveKey, MoveKind, TabuMove};
