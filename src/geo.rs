//! Great-circle distance between coordinates

use crate::models::Coordinate;

/// Mean earth radius used by the haversine approximation
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Haversine distance in meters.
///
/// Endpoints are put in a fixed order before evaluating so that
/// `distance(a, b)` and `distance(b, a)` are bit-for-bit equal.
#[must_use]
pub fn distance(a: &Coordinate, b: &Coordinate) -> f64 {
    let (from, to) = if (a.latitude, a.longitude) <= (b.latitude, b.longitude) {
        (a, b)
    } else {
        (b, a)
    };
    let km = haversine::distance(
        haversine::Location {
            latitude: from.latitude,
            longitude: from.longitude,
        },
        haversine::Location {
            latitude: to.latitude,
            longitude: to.longitude,
        },
        haversine::Units::Kilometers,
    );
    km * 1000.0
}

/// Point `meters` away from `origin` along a bearing, on the same sphere.
///
/// Used to place candidates at known distances.
#[must_use]
pub fn offset(origin: &Coordinate, meters: f64, bearing_deg: f64) -> Coordinate {
    let angular = meters / EARTH_RADIUS_M;
    let bearing = bearing_deg.to_radians();
    let lat1 = origin.latitude.to_radians();
    let lng1 = origin.longitude.to_radians();

    let lat2 = (lat1.sin() * angular.cos() + lat1.cos() * angular.sin() * bearing.cos()).asin();
    let lng2 = lng1
        + (bearing.sin() * angular.sin() * lat1.cos()).atan2(angular.cos() - lat1.sin() * lat2.sin());

    Coordinate {
        longitude: lng2.to_degrees(),
        latitude: lat2.to_degrees(),
    }
}
