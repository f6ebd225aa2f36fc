//! Timing policy shared by the validator and the ledger.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::SolveError;

/// Fixed time constants of the delivery model.
///
/// # Examples
///
/// ```
/// use u_airfreight::network::NetworkParams;
///
/// let params = NetworkParams::default().with_promise_hours(24.0, 48.0);
/// assert_eq!(params.promise_hours(true), 24.0);
/// assert_eq!(params.horizon_minutes(), 4 * 24 * 60);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NetworkParams {
    /// Dwell time charged per connection, in minutes.
    pub connection_minutes: i64,
    /// Shortest layover allowed at an intermediate airport.
    pub min_layover_minutes: i64,
    /// Time a package waits in the departure warehouse before a flight.
    pub processing_minutes: i64,
    /// Time a delivered package stays in the destination warehouse.
    pub pickup_minutes: i64,
    /// Length of the temporal occupancy horizon, in days.
    pub horizon_days: u32,
    /// Delivery promise when origin and destination share a continent.
    pub same_continent_promise_hours: f64,
    /// Delivery promise across continents.
    pub cross_continent_promise_hours: f64,
}

impl Default for NetworkParams {
    fn default() -> Self {
        Self {
            connection_minutes: 120,
            min_layover_minutes: 60,
            processing_minutes: 120,
            pickup_minutes: 120,
            horizon_days: 4,
            same_continent_promise_hours: 48.0,
            cross_continent_promise_hours: 72.0,
        }
    }
}

impl NetworkParams {
    pub fn with_connection_minutes(mut self, minutes: i64) -> Self {
        self.connection_minutes = minutes;
        self
    }

    pub fn with_min_layover_minutes(mut self, minutes: i64) -> Self {
        self.min_layover_minutes = minutes;
        self
    }

    pub fn with_promise_hours(mut self, same: f64, cross: f64) -> Self {
        self.same_continent_promise_hours = same;
        self.cross_continent_promise_hours = cross;
        self
    }

    pub fn with_horizon_days(mut self, days: u32) -> Self {
        self.horizon_days = days;
        self
    }

    #[inline]
    pub fn promise_hours(&self, same_continent: bool) -> f64 {
        if same_continent {
            self.same_continent_promise_hours
        } else {
            self.cross_continent_promise_hours
        }
    }

    #[inline]
    pub fn connection_hours(&self) -> f64 {
        self.connection_minutes as f64 / 60.0
    }

    #[inline]
    pub fn horizon_minutes(&self) -> usize {
        self.horizon_days as usize * 24 * 60
    }

    pub fn validate(&self) -> Result<(), SolveError> {
        if self.connection_minutes < 0
            || self.min_layover_minutes < 0
            || self.processing_minutes < 0
            || self.pickup_minutes < 0
        {
            return Err(SolveError::InvalidConfig(
                "time constants must be non-negative".into(),
            ));
        }
        if self.horizon_days == 0 {
            return Err(SolveError::InvalidConfig(
                "horizon_days must be positive".into(),
            ));
        }
        if self.same_continent_promise_hours <= 0.0 || self.cross_continent_promise_hours <= 0.0 {
            return Err(SolveError::InvalidConfig(
                "promise hours must be positive".into(),
            ));
        }
        Ok(())
    }
}
