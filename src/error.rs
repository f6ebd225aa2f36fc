//! Error type for network construction and solver configuration.
//!
//! Expected infeasibility (no route, no capacity, deadline missed) is never
//! reported through this type; those paths return `Option` or `bool`.

use std::fmt;

/// Errors raised while building a network, validating package records,
/// or validating solver configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum SolveError {
    /// A configuration value is out of range.
    InvalidConfig(String),
    /// Two cities normalize to the same name.
    DuplicateCity(String),
    /// A city name could not be resolved.
    UnknownCity(String),
    /// An airport index does not exist in the network.
    UnknownAirport(usize),
    /// A flight record is malformed.
    InvalidFlight { id: usize, reason: String },
    /// A package record is malformed.
    InvalidPackage { id: usize, reason: String },
    /// A starting solution handed to a search does not fit the network.
    InfeasibleSolution(String),
}

impl fmt::Display for SolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolveError::InvalidConfig(msg) => write!(f, "invalid configuration: {msg}"),
            SolveError::DuplicateCity(name) => write!(f, "city '{name}' is defined twice"),
            SolveError::UnknownCity(name) => write!(f, "unknown city '{name}'"),
            SolveError::UnknownAirport(id) => write!(f, "unknown airport #{id}"),
            SolveError::InvalidFlight { id, reason } => {
                write!(f, "flight #{id} is invalid: {reason}")
            }
            SolveError::InvalidPackage { id, reason } => {
                write!(f, "package #{id} is invalid: {reason}")
            }
            SolveError::InfeasibleSolution(msg) => write!(f, "infeasible solution: {msg}"),
        }
    }
}

impl std::error::Error for SolveError {}
