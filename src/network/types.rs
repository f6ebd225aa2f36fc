//! Identity types and records of the read-only airline network.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

macro_rules! arena_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
        pub struct $name(pub usize);

        impl $name {
            /// Index of this entity in its arena.
            #[inline]
            pub fn index(self) -> usize {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}#{}", stringify!($name), self.0)
            }
        }
    };
}

arena_id!(
    /// Index of a [`City`] in [`Network::cities`](super::Network::cities).
    CityId
);
arena_id!(
    /// Index of an [`Airport`] in [`Network::airports`](super::Network::airports).
    AirportId
);
arena_id!(
    /// Index of a [`Flight`] in [`Network::flights`](super::Network::flights).
    FlightId
);

/// Continental region of a city.
///
/// Same-continent and cross-continent pairs carry different delivery
/// promises and different expectations on route length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Continent {
    America,
    Europe,
    Asia,
    Africa,
    Oceania,
}

impl Continent {
    pub const ALL: [Continent; 5] = [
        Continent::America,
        Continent::Europe,
        Continent::Asia,
        Continent::Africa,
        Continent::Oceania,
    ];
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct City {
    pub id: CityId,
    pub name: String,
    pub continent: Continent,
}

/// Storage at an airport, in product units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Warehouse {
    pub max_capacity: u32,
}

/// An airport serving exactly one city.
///
/// Airports without a warehouse cannot hold cargo: they can neither be a
/// layover point nor the first or last stop of a route.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Airport {
    pub id: AirportId,
    pub city: CityId,
    pub warehouse: Option<Warehouse>,
}

/// A repeatable, capacity-bearing lane between two airports.
///
/// `transport_hours` already encodes the continental distance policy.
/// Used capacity is not stored here; it lives in the
/// [`CapacityLedger`](crate::ledger::CapacityLedger).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Flight {
    pub id: FlightId,
    pub origin: AirportId,
    pub destination: AirportId,
    pub transport_hours: f64,
    pub max_capacity: u32,
}

impl Flight {
    /// Transport time rounded down to whole minutes.
    #[inline]
    pub fn transport_minutes(&self) -> i64 {
        (self.transport_hours * 60.0) as i64
    }
}
