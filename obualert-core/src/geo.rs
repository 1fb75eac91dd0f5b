//! Great-circle geometry
//!
//! Distances and bearings between WGS-84 positions on a spherical earth model,
//! plus the mapping from a relative bearing to a [`Direction`] sector.

use crate::model::{Direction, GeoPoint};

/// Mean earth radius in meters
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Great-circle (haversine) distance in meters
pub fn distance_meters(from: GeoPoint, to: GeoPoint) -> f64 {
    let lat1 = from.latitude.to_radians();
    let lat2 = to.latitude.to_radians();
    let d_lat = lat2 - lat1;
    let d_lon = (to.longitude - from.longitude).to_radians();

    let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_M * c
}

/// Initial great-circle bearing from `from` to `to`, degrees clockwise from true north in [0, 360)
pub fn initial_bearing(from: GeoPoint, to: GeoPoint) -> f64 {
    let lat1 = from.latitude.to_radians();
    let lat2 = to.latitude.to_radians();
    let d_lon = (to.longitude - from.longitude).to_radians();

    let y = d_lon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * d_lon.cos();
    (y.atan2(x).to_degrees() + 360.0) % 360.0
}

/// Normalise an angle in degrees to (-180, 180]
pub fn normalize_angle(angle: f64) -> f64 {
    let mut a = angle % 360.0;
    if a > 180.0 {
        a -= 360.0;
    }
    if a <= -180.0 {
        a += 360.0;
    }
    a
}

/// Map a relative angle (degrees, 0 = straight ahead, positive clockwise) to a sector
///
/// | Sector | Range               |
/// |--------|---------------------|
/// | front  | [-45, 45)           |
/// | right  | [45, 135)           |
/// | rear   | [135, 180] and (-180, -135) |
/// | left   | [-135, -45)         |
pub fn direction_from_relative_angle(angle: f64) -> Direction {
    let a = normalize_angle(angle);
    if (-45.0..45.0).contains(&a) {
        Direction::Front
    } else if (45.0..135.0).contains(&a) {
        Direction::Right
    } else if a >= 135.0 || a < -135.0 {
        Direction::Rear
    } else {
        Direction::Left
    }
}

/// Direction of `object` as seen from `own` when heading `own_heading` degrees true
pub fn relative_direction(own: GeoPoint, own_heading: f64, object: GeoPoint) -> Direction {
    let bearing = initial_bearing(own, object);
    direction_from_relative_angle(bearing - own_heading)
}
