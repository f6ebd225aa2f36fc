//! Tiny networks shared by unit tests.

#![allow(dead_code)]

use crate::network::{
    AirportId, CityId, Continent, FlightId, Network, NetworkBuilder, NetworkParams, Package,
    PackageId,
};

/// Five cities on three continents.
///
/// ```text
///   Lima(a) --4h--> Bogota(b) --5h--> Quito(c) --14h--> Brussels(d)
///      \------------12h------------->/
///    a --16h--> d        b --6h--> Baku(e, no warehouse) --5h--> d
/// ```
pub(crate) struct Corridor {
    pub network: Network,
    pub params: NetworkParams,
    pub lima: CityId,
    pub bogota: CityId,
    pub quito: CityId,
    pub brussels: CityId,
    pub baku: CityId,
    pub a: AirportId,
    pub b: AirportId,
    pub c: AirportId,
    pub d: AirportId,
    pub e: AirportId,
    pub ab: FlightId,
    pub bc: FlightId,
    pub ac: FlightId,
    pub cd: FlightId,
    pub ad: FlightId,
    pub be: FlightId,
    pub ed: FlightId,
}

pub(crate) fn corridor() -> Corridor {
    let mut nb = NetworkBuilder::new();
    let lima = nb.add_city("Lima", Continent::America).unwrap();
    let bogota = nb.add_city("Bogota", Continent::America).unwrap();
    let quito = nb.add_city("Quito", Continent::America).unwrap();
    let brussels = nb.add_city("Brussels", Continent::Europe).unwrap();
    let baku = nb.add_city("Baku", Continent::Asia).unwrap();
    let a = nb.add_airport(lima, Some(1000));
    let b = nb.add_airport(bogota, Some(1000));
    let c = nb.add_airport(quito, Some(1000));
    let d = nb.add_airport(brussels, Some(1000));
    let e = nb.add_airport(baku, None);
    let ab = nb.add_flight(a, b, 4.0, 100);
    let bc = nb.add_flight(b, c, 5.0, 100);
    let ac = nb.add_flight(a, c, 12.0, 100);
    let cd = nb.add_flight(c, d, 14.0, 50);
    let ad = nb.add_flight(a, d, 16.0, 80);
    let be = nb.add_flight(b, e, 6.0, 50);
    let ed = nb.add_flight(e, d, 5.0, 50);
    Corridor {
        network: nb.build().unwrap(),
        params: NetworkParams::default(),
        lima,
        bogota,
        quito,
        brussels,
        baku,
        a,
        b,
        c,
        d,
        e,
        ab,
        bc,
        ac,
        cd,
        ad,
        be,
        ed,
    }
}

/// One lane between two same-continent cities.
pub(crate) struct Shuttle {
    pub network: Network,
    pub params: NetworkParams,
    pub from: CityId,
    pub to: CityId,
    pub flight: FlightId,
}

pub(crate) fn shuttle(capacity: u32) -> Shuttle {
    let mut nb = NetworkBuilder::new();
    let from = nb.add_city("Lima", Continent::America).unwrap();
    let to = nb.add_city("Santiago", Continent::America).unwrap();
    let x = nb.add_airport(from, Some(500));
    let y = nb.add_airport(to, Some(500));
    let flight = nb.add_flight(x, y, 8.0, capacity);
    Shuttle {
        network: nb.build().unwrap(),
        params: NetworkParams::default(),
        from,
        to,
        flight,
    }
}

/// Two long cross-continent legs: 35h + 36h flying, 73h with the
/// connection, so the only route breaks the 72h promise.
pub(crate) struct LongHaul {
    pub network: Network,
    pub params: NetworkParams,
    pub origin: CityId,
    pub destination: CityId,
    pub first: FlightId,
    pub second: FlightId,
}

pub(crate) fn long_haul() -> LongHaul {
    let mut nb = NetworkBuilder::new();
    let origin = nb.add_city("Lima", Continent::America).unwrap();
    let hub = nb.add_city("Dakar", Continent::Africa).unwrap();
    let destination = nb.add_city("Baku", Continent::Asia).unwrap();
    let o = nb.add_airport(origin, Some(100));
    let h = nb.add_airport(hub, Some(100));
    let d = nb.add_airport(destination, Some(100));
    let first = nb.add_flight(o, h, 35.0, 10);
    let second = nb.add_flight(h, d, 36.0, 10);
    LongHaul {
        network: nb.build().unwrap(),
        params: NetworkParams::default(),
        origin,
        destination,
        first,
        second,
    }
}

/// A package ordered at minute 0 with `budget_hours` until its deadline.
pub(crate) fn package(
    id: usize,
    origin: CityId,
    destination: CityId,
    budget_hours: i64,
    units: u32,
) -> Package {
    Package::with_units(PackageId(id), origin, destination, 0, budget_hours * 60, units)
}
