//! Viewport bounds
//!
//! Bounds are a plain longitude/latitude rectangle. There is no antimeridian
//! or pole handling; a viewport that wraps is compared edge by edge like any
//! other rectangle.

use serde::{Deserialize, Serialize};

use super::Coordinate;
use crate::{Result, SpotMapError};

/// Visible map viewport in degrees
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl Bounds {
    /// Create validated bounds. `north` must be strictly greater than `south`.
    pub fn new(north: f64, south: f64, east: f64, west: f64) -> Result<Self> {
        let bounds = Self {
            north,
            south,
            east,
            west,
        };
        bounds.validate()?;
        Ok(bounds)
    }

    pub fn validate(&self) -> Result<()> {
        let edges = [self.north, self.south, self.east, self.west];
        if edges.iter().any(|edge| !edge.is_finite()) {
            return Err(SpotMapError::validation(format!(
                "Bounds must be finite, got {self:?}"
            )));
        }
        if !(-90.0..=90.0).contains(&self.north) || !(-90.0..=90.0).contains(&self.south) {
            return Err(SpotMapError::validation(format!(
                "Bounds latitude outside [-90, 90]: north={}, south={}",
                self.north, self.south
            )));
        }
        if !(-180.0..=180.0).contains(&self.east) || !(-180.0..=180.0).contains(&self.west) {
            return Err(SpotMapError::validation(format!(
                "Bounds longitude outside [-180, 180]: east={}, west={}",
                self.east, self.west
            )));
        }
        if self.north <= self.south {
            return Err(SpotMapError::validation(format!(
                "North ({}) must be greater than south ({})",
                self.north, self.south
            )));
        }
        Ok(())
    }

    /// Square-ish bounds of `span_deg` degrees centred on `center`, clamped to valid ranges
    pub fn around(center: Coordinate, span_deg: f64) -> Result<Self> {
        let half = span_deg.abs() / 2.0;
        Self::new(
            (center.latitude + half).min(90.0),
            (center.latitude - half).max(-90.0),
            (center.longitude + half).min(180.0),
            (center.longitude - half).max(-180.0),
        )
    }

    #[must_use]
    pub fn lat_span(&self) -> f64 {
        self.north - self.south
    }

    #[must_use]
    pub fn lng_span(&self) -> f64 {
        (self.east - self.west).abs()
    }

    #[must_use]
    pub fn center(&self) -> Coordinate {
        Coordinate {
            longitude: (self.east + self.west) / 2.0,
            latitude: (self.north + self.south) / 2.0,
        }
    }

    #[must_use]
    pub fn contains_coordinate(&self, coordinate: &Coordinate) -> bool {
        let (min_lng, max_lng) = if self.west <= self.east {
            (self.west, self.east)
        } else {
            (self.east, self.west)
        };
        coordinate.latitude >= self.south
            && coordinate.latitude <= self.north
            && coordinate.longitude >= min_lng
            && coordinate.longitude <= max_lng
    }

    /// True when every edge of `self` lies inside `outer`, allowing `epsilon` degrees of slack
    #[must_use]
    pub fn contains_within(&self, outer: &Bounds, epsilon: f64) -> bool {
        self.north <= outer.north + epsilon
            && self.south >= outer.south - epsilon
            && self.east <= outer.east + epsilon
            && self.west >= outer.west - epsilon
    }

    /// Summed edge movement relative to `previous`, as fractions of this viewport's span.
    ///
    /// Returns `(lat_ratio, lng_ratio)`. A zero span yields an infinite ratio.
    #[must_use]
    pub fn movement_ratio(&self, previous: &Bounds) -> (f64, f64) {
        let lat_diff = (self.north - previous.north).abs() + (self.south - previous.south).abs();
        let lng_diff = (self.east - previous.east).abs() + (self.west - previous.west).abs();
        (ratio(lat_diff, self.lat_span()), ratio(lng_diff, self.lng_span()))
    }
}

fn ratio(diff: f64, span: f64) -> f64 {
    if span > 0.0 {
        diff / span
    } else if diff == 0.0 {
        0.0
    } else {
        f64::INFINITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokyo() -> Bounds {
        Bounds::new(36.0, 35.0, 140.0, 139.0).unwrap()
    }

    #[test]
    fn test_new_rejects_inverted_latitudes() {
        assert!(Bounds::new(35.0, 36.0, 140.0, 139.0).is_err());
        assert!(Bounds::new(35.0, 35.0, 140.0, 139.0).is_err());
        assert!(Bounds::new(f64::NAN, 35.0, 140.0, 139.0).is_err());
        assert!(Bounds::new(36.0, 35.0, 190.0, 139.0).is_err());
    }

    #[test]
    fn test_spans_and_center() {
        let b = tokyo();
        assert_eq!(b.lat_span(), 1.0);
        assert_eq!(b.lng_span(), 1.0);
        let c = b.center();
        assert_eq!(c.latitude, 35.5);
        assert_eq!(c.longitude, 139.5);
    }

    #[test]
    fn test_contains_within() {
        let outer = tokyo();
        let inner = Bounds::new(35.9, 35.1, 139.9, 139.1).unwrap();
        assert!(inner.contains_within(&outer, 1e-4));
        assert!(outer.contains_within(&outer, 1e-4));
        assert!(!outer.contains_within(&inner, 1e-4));

        // within epsilon of the edge still counts
        let nudged = Bounds::new(36.000_05, 35.0, 140.0, 139.0).unwrap();
        assert!(nudged.contains_within(&outer, 1e-4));
        let escaped = Bounds::new(36.001, 35.0, 140.0, 139.0).unwrap();
        assert!(!escaped.contains_within(&outer, 1e-4));
    }

    #[test]
    fn test_movement_ratio() {
        let previous = tokyo();
        let shifted = Bounds::new(36.02, 35.02, 140.0, 139.0).unwrap();
        let (lat, lng) = shifted.movement_ratio(&previous);
        assert!((lat - 0.04).abs() < 1e-9);
        assert_eq!(lng, 0.0);
    }

    #[test]
    fn test_contains_coordinate() {
        let b = tokyo();
        assert!(b.contains_coordinate(&Coordinate {
            longitude: 139.5,
            latitude: 35.5
        }));
        assert!(!b.contains_coordinate(&Coordinate {
            longitude: 141.0,
            latitude: 35.5
        }));
    }

    #[test]
    fn test_around_clamps() {
        let b = Bounds::around(
            Coordinate {
                longitude: 179.9,
                latitude: 89.9,
            },
            1.0,
        )
        .unwrap();
        assert_eq!(b.north, 90.0);
        assert_eq!(b.east, 180.0);
    }
}
