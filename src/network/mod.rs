//! Read-only airline network and package demand.
//!
//! The network (cities, airports, warehouses, flights) is built once and
//! never mutated. Capacity usage lives in the
//! [`CapacityLedger`](crate::ledger::CapacityLedger) so several trial
//! solutions can share one network.

mod demand;
mod graph;
mod params;
mod types;

pub use demand::{unitize, validate_packages, Package, PackageId, ProductId};
pub use graph::{normalize_city_name, Network, NetworkBuilder};
pub use params::NetworkParams;
pub use types::{Airport, AirportId, City, CityId, Continent, Flight, FlightId, Warehouse};
