//! Routes, route search and route validity.

mod finder;
mod path;
mod validator;

pub use finder::{capacity_ratio, RouteFinder, RouteOption};
pub use path::{safety_margin, Route};
pub use validator::RouteValidator;
