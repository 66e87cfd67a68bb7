//! Coordinate model for geographic positions

use serde::{Deserialize, Serialize};

use crate::{Result, SpotMapError};

/// A WGS84 position in decimal degrees
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct Coordinate {
    /// Longitude in decimal degrees, within [-180, 180]
    pub longitude: f64,
    /// Latitude in decimal degrees, within [-90, 90]
    pub latitude: f64,
}

impl Coordinate {
    /// Create a validated coordinate
    pub fn new(longitude: f64, latitude: f64) -> Result<Self> {
        let coordinate = Self {
            longitude,
            latitude,
        };
        coordinate.validate()?;
        Ok(coordinate)
    }

    /// Check the longitude/latitude ranges
    pub fn validate(&self) -> Result<()> {
        if !self.longitude.is_finite() || !self.latitude.is_finite() {
            return Err(SpotMapError::validation(format!(
                "Coordinates must be finite, got ({}, {})",
                self.longitude, self.latitude
            )));
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(SpotMapError::validation(format!(
                "Longitude {} is outside [-180, 180]",
                self.longitude
            )));
        }
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(SpotMapError::validation(format!(
                "Latitude {} is outside [-90, 90]",
                self.latitude
            )));
        }
        Ok(())
    }

    /// Format as "lat, lng" with four decimals
    #[must_use]
    pub fn format_coordinates(&self) -> String {
        format!("{:.4}, {:.4}", self.latitude, self.longitude)
    }
}
