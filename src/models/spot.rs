//! Camping spot model as returned by the spot repository

use serde::{Deserialize, Serialize};
use std::fmt;

use super::Coordinate;
use crate::proximity::FacilityCandidate;

/// Facility categories tracked next to a spot
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum FacilityKind {
    Toilet,
    Convenience,
    Bath,
}

impl FacilityKind {
    pub const ALL: [FacilityKind; 3] = [
        FacilityKind::Toilet,
        FacilityKind::Convenience,
        FacilityKind::Bath,
    ];
}

impl fmt::Display for FacilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FacilityKind::Toilet => "toilet",
            FacilityKind::Convenience => "convenience",
            FacilityKind::Bath => "bath",
        };
        f.write_str(label)
    }
}

/// A spot is owned by the persistence layer; the engine only reads it
/// (and annotates distances on its own copies).
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Spot {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub prefecture: String,
    #[serde(rename = "type", default)]
    pub spot_type: String,
    pub coordinates: Coordinate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nearby_toilet_coordinates: Option<Coordinate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nearby_convenience_coordinates: Option<Coordinate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nearby_bath_coordinates: Option<Coordinate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_to_toilet: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_to_convenience: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_to_bath: Option<f64>,
}

impl Spot {
    /// Create a spot with no facility data
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        prefecture: impl Into<String>,
        spot_type: impl Into<String>,
        coordinates: Coordinate,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            prefecture: prefecture.into(),
            spot_type: spot_type.into(),
            coordinates,
            nearby_toilet_coordinates: None,
            nearby_convenience_coordinates: None,
            nearby_bath_coordinates: None,
            distance_to_toilet: None,
            distance_to_convenience: None,
            distance_to_bath: None,
        }
    }

    #[must_use]
    pub fn facility_coordinates(&self, kind: FacilityKind) -> Option<Coordinate> {
        match kind {
            FacilityKind::Toilet => self.nearby_toilet_coordinates,
            FacilityKind::Convenience => self.nearby_convenience_coordinates,
            FacilityKind::Bath => self.nearby_bath_coordinates,
        }
    }

    pub fn set_facility_coordinates(&mut self, kind: FacilityKind, coordinates: Coordinate) {
        let slot = match kind {
            FacilityKind::Toilet => &mut self.nearby_toilet_coordinates,
            FacilityKind::Convenience => &mut self.nearby_convenience_coordinates,
            FacilityKind::Bath => &mut self.nearby_bath_coordinates,
        };
        *slot = Some(coordinates);
    }

    /// Precomputed distance in meters, if one has been stored
    #[must_use]
    pub fn facility_distance(&self, kind: FacilityKind) -> Option<f64> {
        match kind {
            FacilityKind::Toilet => self.distance_to_toilet,
            FacilityKind::Convenience => self.distance_to_convenience,
            FacilityKind::Bath => self.distance_to_bath,
        }
    }

    pub fn set_facility_distance(&mut self, kind: FacilityKind, meters: Option<f64>) {
        let slot = match kind {
            FacilityKind::Toilet => &mut self.distance_to_toilet,
            FacilityKind::Convenience => &mut self.distance_to_convenience,
            FacilityKind::Bath => &mut self.distance_to_bath,
        };
        *slot = meters;
    }

    /// One candidate per facility kind; missing coordinates stay `None`
    /// and are dropped by the resolver.
    #[must_use]
    pub fn facility_candidates(&self) -> Vec<FacilityCandidate> {
        FacilityKind::ALL
            .iter()
            .map(|&kind| FacilityCandidate {
                kind,
                coordinates: self.facility_coordinates(kind),
                name: format!("{} near {}", kind, self.name),
            })
            .collect()
    }
}
