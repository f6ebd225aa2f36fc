//! Package demand records and unitization.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::graph::Network;
use super::types::CityId;
use crate::error::SolveError;

/// Index of a [`Package`] in the demand list handed to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PackageId(pub usize);

impl PackageId {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for PackageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PackageId#{}", self.0)
    }
}

/// Identity of one product unit inside a package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ProductId(pub u64);

/// A shipment from `origin` to `destination`.
///
/// Times are absolute minutes on the caller's clock. The engine anchors
/// them at T0, the earliest order minute of the batch it was given.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Package {
    pub id: PackageId,
    /// City the package currently sits in.
    pub origin: CityId,
    pub destination: CityId,
    pub order_minute: i64,
    pub deadline_minute: i64,
    /// Extra urgency weight; zero means none.
    pub priority: f64,
    pub products: Vec<ProductId>,
    /// The package this unit was split from, if unitized.
    pub source: Option<PackageId>,
}

impl Package {
    /// Builds a package carrying `units` anonymous products.
    pub fn with_units(
        id: PackageId,
        origin: CityId,
        destination: CityId,
        order_minute: i64,
        deadline_minute: i64,
        units: u32,
    ) -> Self {
        Self {
            id,
            origin,
            destination,
            order_minute,
            deadline_minute,
            priority: 0.0,
            products: (0..units as u64).map(ProductId).collect(),
            source: None,
        }
    }

    pub fn with_priority(mut self, priority: f64) -> Self {
        self.priority = priority;
        self
    }

    #[inline]
    pub fn unit_count(&self) -> u32 {
        self.products.len() as u32
    }

    #[inline]
    pub fn at_destination(&self) -> bool {
        self.origin == self.destination
    }

    /// Hours between order time and deadline.
    #[inline]
    pub fn budget_hours(&self) -> f64 {
        (self.deadline_minute - self.order_minute) as f64 / 60.0
    }

    /// The package this record reports under: its source when unitized,
    /// itself otherwise.
    #[inline]
    pub fn report_id(&self) -> PackageId {
        self.source.unwrap_or(self.id)
    }
}

/// Checks that packages are densely numbered and reference known cities.
pub fn validate_packages(packages: &[Package], network: &Network) -> Result<(), SolveError> {
    let city_count = network.cities().len();
    for (i, pkg) in packages.iter().enumerate() {
        let invalid = |reason: &str| SolveError::InvalidPackage {
            id: pkg.id.index(),
            reason: reason.to_string(),
        };
        if pkg.id.index() != i {
            return Err(invalid("ids must match their position in the list"));
        }
        if pkg.origin.index() >= city_count {
            return Err(invalid("unknown origin city"));
        }
        if pkg.destination.index() >= city_count {
            return Err(invalid("unknown destination city"));
        }
        if pkg.deadline_minute < pkg.order_minute {
            return Err(invalid("deadline precedes order time"));
        }
        if pkg.products.is_empty() {
            return Err(invalid("package carries no product units"));
        }
        if !pkg.priority.is_finite() || pkg.priority < 0.0 {
            return Err(invalid("priority must be finite and non-negative"));
        }
    }
    Ok(())
}

/// Expands every package into one single-unit package per product.
///
/// Output ids are renumbered densely; `source` points back at the package
/// the unit came from.
pub fn unitize(packages: &[Package]) -> Vec<Package> {
    let mut units = Vec::with_capacity(packages.iter().map(|p| p.products.len()).sum());
    for pkg in packages {
        for &product in &pkg.products {
            units.push(Package {
                id: PackageId(units.len()),
                products: vec![product],
                source: Some(pkg.report_id()),
                ..pkg.clone()
            });
        }
    }
    units
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{Continent, NetworkBuilder};

    fn two_cities() -> (Network, CityId, CityId) {
        let mut builder = NetworkBuilder::new();
        let a = builder.add_city("Lima", Continent::America).unwrap();
        let b = builder.add_city("Bogota", Continent::America).unwrap();
        builder.add_airport(a, Some(100));
        builder.add_airport(b, Some(100));
        (builder.build().unwrap(), a, b)
    }

    #[test]
    fn test_unitize_splits_and_renumbers() {
        let (_, a, b) = two_cities();
        let packages = vec![
            Package::with_units(PackageId(0), a, b, 0, 600, 3),
            Package::with_units(PackageId(1), b, a, 10, 900, 1),
        ];
        let units = unitize(&packages);
        assert_eq!(units.len(), 4);
        for (i, unit) in units.iter().enumerate() {
            assert_eq!(unit.id, PackageId(i));
            assert_eq!(unit.unit_count(), 1);
        }
        assert_eq!(units[2].source, Some(PackageId(0)));
        assert_eq!(units[3].source, Some(PackageId(1)));
        assert_eq!(units[3].origin, b);
    }

    #[test]
    fn test_validate_rejects_empty_package() {
        let (network, a, b) = two_cities();
        let packages = vec![Package::with_units(PackageId(0), a, b, 0, 60, 0)];
        assert!(matches!(
            validate_packages(&packages, &network),
            Err(SolveError::InvalidPackage { id: 0, .. })
        ));
    }

    #[test]
    fn test_validate_rejects_deadline_before_order() {
        let (network, a, b) = two_cities();
        let packages = vec![Package::with_units(PackageId(0), a, b, 100, 50, 1)];
        assert!(validate_packages(&packages, &network).is_err());
    }

    #[test]
    fn test_validate_rejects_sparse_ids() {
        let (network, a, b) = two_cities();
        let packages = vec![Package::with_units(PackageId(3), a, b, 0, 50, 1)];
        assert!(validate_packages(&packages, &network).is_err());
    }

    #[test]
    fn test_budget_hours() {
        let (_, a, b) = two_cities();
        let pkg = Package::with_units(PackageId(0), a, b, 60, 60 + 48 * 60, 1);
        assert!((pkg.budget_hours() - 48.0).abs() < 1e-12);
        assert!(!pkg.at_destination());
    }
}
