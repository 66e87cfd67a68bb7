//! Nearby-facility resolution
//!
//! Decides which toilets, convenience stores and baths count as "nearby" for a
//! spot, using a radius per facility kind.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::ProximityConfig;
use crate::geo;
use crate::models::{Coordinate, FacilityKind, Spot};

/// A facility that may or may not be close enough to count
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacilityCandidate {
    pub kind: FacilityKind,
    pub coordinates: Option<Coordinate>,
    pub name: String,
}

/// A candidate that passed its radius check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearbyFacility {
    pub kind: FacilityKind,
    pub coordinates: Coordinate,
    pub name: String,
    /// Distance from the origin in meters
    pub distance: f64,
}

/// Maximum distance in meters per facility kind.
/// Kinds without an entry never match.
#[derive(Debug, Clone, PartialEq)]
pub struct FacilityRadii(BTreeMap<FacilityKind, f64>);

impl FacilityRadii {
    #[must_use]
    pub fn empty() -> Self {
        Self(BTreeMap::new())
    }

    #[must_use]
    pub fn with(mut self, kind: FacilityKind, meters: f64) -> Self {
        self.0.insert(kind, meters);
        self
    }

    #[must_use]
    pub fn radius_for(&self, kind: FacilityKind) -> Option<f64> {
        self.0.get(&kind).copied()
    }
}

impl Default for FacilityRadii {
    fn default() -> Self {
        Self::from(&ProximityConfig::default())
    }
}

impl From<&ProximityConfig> for FacilityRadii {
    fn from(config: &ProximityConfig) -> Self {
        Self::empty()
            .with(FacilityKind::Toilet, config.toilet_radius_m)
            .with(FacilityKind::Convenience, config.convenience_radius_m)
            .with(FacilityKind::Bath, config.bath_radius_m)
    }
}

/// Resolves nearby facilities against per-kind radii. Pure; holds only configuration.
#[derive(Debug, Clone, Default)]
pub struct ProximityResolver {
    radii: FacilityRadii,
}

impl ProximityResolver {
    #[must_use]
    pub fn new(radii: FacilityRadii) -> Self {
        Self { radii }
    }

    #[must_use]
    pub fn radii(&self) -> &FacilityRadii {
        &self.radii
    }

    /// Candidates within their kind's radius of `origin`, annotated with distance.
    ///
    /// Candidates without coordinates are skipped. Output order follows input order.
    #[must_use]
    pub fn resolve_nearby(
        &self,
        origin: &Coordinate,
        candidates: &[FacilityCandidate],
    ) -> Vec<NearbyFacility> {
        candidates
            .iter()
            .filter_map(|candidate| {
                let coordinates = candidate.coordinates?;
                let radius = self.radii.radius_for(candidate.kind)?;
                let distance = geo::distance(origin, &coordinates);
                (distance <= radius).then(|| NearbyFacility {
                    kind: candidate.kind,
                    coordinates,
                    name: candidate.name.clone(),
                    distance,
                })
            })
            .collect()
    }

    /// Nearby facilities of a spot's own stored facility coordinates
    #[must_use]
    pub fn resolve_for_spot(&self, spot: &Spot) -> Vec<NearbyFacility> {
        self.resolve_nearby(&spot.coordinates, &spot.facility_candidates())
    }

    /// Fill the spot's distance fields. Facilities outside their radius are cleared.
    pub fn annotate_spot(&self, spot: &mut Spot) {
        let nearby = self.resolve_for_spot(spot);
        for kind in FacilityKind::ALL {
            let distance = nearby.iter().find(|n| n.kind == kind).map(|n| n.distance);
            spot.set_facility_distance(kind, distance);
        }
    }

    /// Spots whose facility of `kind` lies within that kind's radius
    #[must_use]
    pub fn filter_spots_with_facility<'a>(
        &self,
        spots: &'a [Spot],
        kind: FacilityKind,
    ) -> Vec<&'a Spot> {
        let Some(radius) = self.radii.radius_for(kind) else {
            return Vec::new();
        };
        spots
            .iter()
            .filter(|spot| {
                spot.facility_coordinates(kind)
                    .map(|c| geo::distance(&spot.coordinates, &c) <= radius)
                    .unwrap_or(false)
            })
            .collect()
    }

    /// The closest resolved facility of each kind, nearest first
    #[must_use]
    pub fn nearest_per_kind(
        &self,
        origin: &Coordinate,
        candidates: &[FacilityCandidate],
    ) -> Vec<NearbyFacility> {
        let mut best: BTreeMap<FacilityKind, NearbyFacility> = BTreeMap::new();
        for facility in self.resolve_nearby(origin, candidates) {
            match best.get(&facility.kind) {
                Some(current) if current.distance <= facility.distance => {}
                _ => {
                    best.insert(facility.kind, facility);
                }
            }
        }
        let mut result: Vec<NearbyFacility> = best.into_values().collect();
        sort_by_distance(&mut result);
        result
    }
}

/// Sort closest first
pub fn sort_by_distance(facilities: &mut [NearbyFacility]) {
    facilities.sort_by(|a, b| a.distance.total_cmp(&b.distance));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::offset;
    use rstest::rstest;

    fn origin() -> Coordinate {
        Coordinate {
            longitude: 138.2,
            latitude: 36.6,
        }
    }

    fn candidate(kind: FacilityKind, meters: f64) -> FacilityCandidate {
        FacilityCandidate {
            kind,
            coordinates: Some(offset(&origin(), meters, 45.0)),
            name: format!("{kind} at {meters}m"),
        }
    }

    #[rstest]
    #[case(FacilityKind::Toilet, 900.0, true)]
    #[case(FacilityKind::Toilet, 1100.0, false)]
    #[case(FacilityKind::Convenience, 9_500.0, true)]
    #[case(FacilityKind::Convenience, 10_500.0, false)]
    #[case(FacilityKind::Bath, 19_000.0, true)]
    #[case(FacilityKind::Bath, 21_000.0, false)]
    fn test_default_radii(#[case] kind: FacilityKind, #[case] meters: f64, #[case] kept: bool) {
        let resolver = ProximityResolver::default();
        let nearby = resolver.resolve_nearby(&origin(), &[candidate(kind, meters)]);
        assert_eq!(nearby.len() == 1, kept);
    }

    #[test]
    fn test_never_returns_candidate_beyond_radius() {
        let resolver = ProximityResolver::default();
        let candidates: Vec<FacilityCandidate> = (0..60)
            .flat_map(|i| {
                let meters = f64::from(i) * 500.0;
                FacilityKind::ALL.map(|kind| candidate(kind, meters))
            })
            .collect();
        let nearby = resolver.resolve_nearby(&origin(), &candidates);
        assert!(!nearby.is_empty());
        for facility in nearby {
            let radius = resolver.radii().radius_for(facility.kind).unwrap();
            assert!(facility.distance <= radius);
        }
    }

    #[test]
    fn test_missing_coordinates_are_excluded() {
        let resolver = ProximityResolver::default();
        let missing = FacilityCandidate {
            kind: FacilityKind::Toilet,
            coordinates: None,
            name: "unknown".to_string(),
        };
        assert!(resolver.resolve_nearby(&origin(), &[missing]).is_empty());
    }

    #[test]
    fn test_custom_radii_are_injected() {
        let resolver =
            ProximityResolver::new(FacilityRadii::empty().with(FacilityKind::Toilet, 50.0));
        let nearby = resolver.resolve_nearby(
            &origin(),
            &[
                candidate(FacilityKind::Toilet, 40.0),
                candidate(FacilityKind::Toilet, 60.0),
                candidate(FacilityKind::Bath, 10.0),
            ],
        );
        assert_eq!(nearby.len(), 1);
        assert_eq!(nearby[0].kind, FacilityKind::Toilet);
    }

    #[test]
    fn test_annotate_and_filter_spots() {
        let resolver = ProximityResolver::default();
        let mut near = Spot::new("a", "Near", "長野県", "campground", origin());
        near.set_facility_coordinates(FacilityKind::Toilet, offset(&origin(), 300.0, 90.0));
        near.set_facility_coordinates(FacilityKind::Bath, offset(&origin(), 25_000.0, 90.0));
        let mut far = Spot::new("b", "Far", "長野県", "campground", origin());
        far.set_facility_coordinates(FacilityKind::Toilet, offset(&origin(), 3_000.0, 90.0));

        resolver.annotate_spot(&mut near);
        let toilet = near.distance_to_toilet.unwrap();
        assert!((toilet - 300.0).abs() < 0.5);
        assert!(near.distance_to_bath.is_none());

        let spots = vec![near, far];
        let with_toilet = resolver.filter_spots_with_facility(&spots, FacilityKind::Toilet);
        assert_eq!(with_toilet.len(), 1);
        assert_eq!(with_toilet[0].id, "a");
    }

    #[test]
    fn test_nearest_per_kind() {
        let resolver = ProximityResolver::default();
        let nearest = resolver.nearest_per_kind(
            &origin(),
            &[
                candidate(FacilityKind::Convenience, 4_000.0),
                candidate(FacilityKind::Convenience, 2_000.0),
                candidate(FacilityKind::Toilet, 500.0),
            ],
        );
        assert_eq!(nearest.len(), 2);
        assert_eq!(nearest[0].kind, FacilityKind::Toilet);
        assert!((nearest[1].distance - 2_000.0).abs() < 0.5);
    }
}
