//! The immutable network handed to the engine, plus its builder.

use std::collections::HashMap;

use super::types::{Airport, AirportId, City, CityId, Continent, Flight, FlightId, Warehouse};
use crate::error::SolveError;

/// Normalizes a city name for lookups: trimmed, inner whitespace collapsed,
/// lowercase.
pub fn normalize_city_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Read-only airline network: cities, airports (with optional warehouses)
/// and flights, with precomputed adjacency.
///
/// Built once through [`NetworkBuilder`] and then shared by reference.
/// Nothing in the network is mutated during search.
#[derive(Debug, Clone)]
pub struct Network {
    cities: Vec<City>,
    airports: Vec<Airport>,
    flights: Vec<Flight>,
    city_lookup: HashMap<String, CityId>,
    airport_of_city: Vec<Option<AirportId>>,
    outgoing: Vec<Vec<FlightId>>,
}

impl Network {
    pub fn cities(&self) -> &[City] {
        &self.cities
    }

    pub fn airports(&self) -> &[Airport] {
        &self.airports
    }

    pub fn flights(&self) -> &[Flight] {
        &self.flights
    }

    #[inline]
    pub fn city(&self, id: CityId) -> &City {
        &self.cities[id.index()]
    }

    #[inline]
    pub fn airport(&self, id: AirportId) -> &Airport {
        &self.airports[id.index()]
    }

    #[inline]
    pub fn flight(&self, id: FlightId) -> &Flight {
        &self.flights[id.index()]
    }

    #[inline]
    pub fn continent(&self, city: CityId) -> Continent {
        self.cities[city.index()].continent
    }

    /// Looks a city up by name, ignoring case and surrounding/inner
    /// whitespace differences.
    pub fn city_by_name(&self, name: &str) -> Option<CityId> {
        self.city_lookup.get(&normalize_city_name(name)).copied()
    }

    /// The airport serving `city`, if any.
    #[inline]
    pub fn airport_of_city(&self, city: CityId) -> Option<AirportId> {
        self.airport_of_city.get(city.index()).copied().flatten()
    }

    /// Flights departing from `airport`, in insertion order.
    #[inline]
    pub fn outgoing(&self, airport: AirportId) -> &[FlightId] {
        &self.outgoing[airport.index()]
    }

    /// Warehouse capacity at `airport`, zero when it has no warehouse.
    #[inline]
    pub fn warehouse_capacity(&self, airport: AirportId) -> u32 {
        self.airports[airport.index()]
            .warehouse
            .map_or(0, |w| w.max_capacity)
    }

    #[inline]
    pub fn has_warehouse(&self, airport: AirportId) -> bool {
        self.airports[airport.index()].warehouse.is_some()
    }

    /// Continent of the city an airport serves.
    #[inline]
    pub fn airport_continent(&self, airport: AirportId) -> Continent {
        self.continent(self.airports[airport.index()].city)
    }
}

/// Incremental constructor for [`Network`].
///
/// # Examples
///
/// ```
/// use u_airfreight::network::{Continent, NetworkBuilder};
///
/// let mut builder = NetworkBuilder::new();
/// let lima = builder.add_city("Lima", Continent::America).unwrap();
/// let brussels = builder.add_city("Brussels", Continent::Europe).unwrap();
/// let lim = builder.add_airport(lima, Some(1000));
/// let bru = builder.add_airport(brussels, Some(800));
/// builder.add_flight(lim, bru, 12.0, 300);
/// let network = builder.build().unwrap();
///
/// assert_eq!(network.city_by_name("  LIMA "), Some(lima));
/// assert_eq!(network.outgoing(lim).len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct NetworkBuilder {
    cities: Vec<City>,
    airports: Vec<Airport>,
    flights: Vec<Flight>,
    city_lookup: HashMap<String, CityId>,
}

impl NetworkBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a city. Names are unique after normalization.
    pub fn add_city(&mut self, name: &str, continent: Continent) -> Result<CityId, SolveError> {
        let key = normalize_city_name(name);
        if key.is_empty() {
            return Err(SolveError::UnknownCity(name.to_string()));
        }
        if self.city_lookup.contains_key(&key) {
            return Err(SolveError::DuplicateCity(name.trim().to_string()));
        }
        let id = CityId(self.cities.len());
        self.cities.push(City {
            id,
            name: name.trim().to_string(),
            continent,
        });
        self.city_lookup.insert(key, id);
        Ok(id)
    }

    /// Registers an airport for `city`, with a warehouse of the given
    /// capacity when `warehouse_capacity` is set.
    pub fn add_airport(&mut self, city: CityId, warehouse_capacity: Option<u32>) -> AirportId {
        let id = AirportId(self.airports.len());
        self.airports.push(Airport {
            id,
            city,
            warehouse: warehouse_capacity.map(|max_capacity| Warehouse { max_capacity }),
        });
        id
    }

    pub fn add_flight(
        &mut self,
        origin: AirportId,
        destination: AirportId,
        transport_hours: f64,
        max_capacity: u32,
    ) -> FlightId {
        let id = FlightId(self.flights.len());
        self.flights.push(Flight {
            id,
            origin,
            destination,
            transport_hours,
            max_capacity,
        });
        id
    }

    /// Checks every reference and freezes the network.
    pub fn build(self) -> Result<Network, SolveError> {
        let mut airport_of_city = vec![None; self.cities.len()];
        for airport in &self.airports {
            let slot = airport_of_city
                .get_mut(airport.city.index())
                .ok_or_else(|| SolveError::UnknownCity(airport.city.to_string()))?;
            if slot.is_some() {
                return Err(SolveError::InvalidConfig(format!(
                    "city {} is served by more than one airport",
                    airport.city
                )));
            }
            *slot = Some(airport.id);
        }

        let mut outgoing = vec![Vec::new(); self.airports.len()];
        for flight in &self.flights {
            let invalid = |reason: &str| SolveError::InvalidFlight {
                id: flight.id.index(),
                reason: reason.to_string(),
            };
            if flight.origin.index() >= self.airports.len() {
                return Err(SolveError::UnknownAirport(flight.origin.index()));
            }
            if flight.destination.index() >= self.airports.len() {
                return Err(SolveError::UnknownAirport(flight.destination.index()));
            }
            if flight.origin == flight.destination {
                return Err(invalid("origin equals destination"));
            }
            if !flight.transport_hours.is_finite() || flight.transport_hours <= 0.0 {
                return Err(invalid("transport time must be positive"));
            }
            if flight.max_capacity == 0 {
                return Err(invalid("capacity must be positive"));
            }
            outgoing[flight.origin.index()].push(flight.id);
        }

        Ok(Network {
            cities: self.cities,
            airports: self.airports,
            flights: self.flights,
            city_lookup: self.city_lookup,
            airport_of_city,
            outgoing,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_city_name() {
        assert_eq!(normalize_city_name("  Lima,  Peru "), "lima, peru");
        assert_eq!(normalize_city_name("BAKU"), "baku");
    }

    #[test]
    fn test_duplicate_city_rejected() {
        let mut builder = NetworkBuilder::new();
        builder.add_city("Lima", Continent::America).unwrap();
        let err = builder.add_city(" lima ", Continent::America).unwrap_err();
        assert_eq!(err, SolveError::DuplicateCity("lima".into()));
    }

    #[test]
    fn test_flight_with_unknown_airport_rejected() {
        let mut builder = NetworkBuilder::new();
        let lima = builder.add_city("Lima", Continent::America).unwrap();
        let lim = builder.add_airport(lima, Some(100));
        builder.add_flight(lim, AirportId(5), 4.0, 10);
        assert_eq!(builder.build().unwrap_err(), SolveError::UnknownAirport(5));
    }

    #[test]
    fn test_zero_capacity_flight_rejected() {
        let mut builder = NetworkBuilder::new();
        let a = builder.add_city("A", Continent::Europe).unwrap();
        let b = builder.add_city("B", Continent::Europe).unwrap();
        let pa = builder.add_airport(a, Some(100));
        let pb = builder.add_airport(b, Some(100));
        builder.add_flight(pa, pb, 4.0, 0);
        assert!(matches!(
            builder.build(),
            Err(SolveError::InvalidFlight { id: 0, .. })
        ));
    }

    #[test]
    fn test_lookups() {
        let mut builder = NetworkBuilder::new();
        let a = builder.add_city("Brussels", Continent::Europe).unwrap();
        let b = builder.add_city("Baku", Continent::Asia).unwrap();
        let pa = builder.add_airport(a, Some(700));
        let pb = builder.add_airport(b, None);
        let f = builder.add_flight(pa, pb, 9.5, 250);
        let network = builder.build().unwrap();

        assert_eq!(network.airport_of_city(b), Some(pb));
        assert_eq!(network.outgoing(pa), &[f]);
        assert!(network.outgoing(pb).is_empty());
        assert_eq!(network.warehouse_capacity(pa), 700);
        assert_eq!(network.warehouse_capacity(pb), 0);
        assert_eq!(network.airport_continent(pb), Continent::Asia);
        assert_eq!(network.flight(f).transport_minutes(), 570);
    }
}
