//! Geographic utilities.
//!
//! Distances are great-circle distances on a spherical Earth. Malformed input
//! (NaN or infinite coordinates) is not rejected here: it propagates as NaN and
//! the filter pipeline treats a NaN distance as a failed gate.

use crate::GeoPoint;

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Haversine distance in meters between two lat/lng pairs given in degrees.
pub fn haversine_m(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lng = (lng2 - lng1).to_radians();
    let lat1 = lat1.to_radians();
    let lat2 = lat2.to_radians();

    let s1 = (d_lat / 2.0).sin();
    let s2 = (d_lng / 2.0).sin();
    let h = s1 * s1 + lat1.cos() * lat2.cos() * s2 * s2;
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_M * c
}

/// Haversine distance in meters between two fixes.
///
/// # Example
/// ```
/// use run_tracker::{GeoPoint, geo_utils::haversine_distance};
///
/// let a = GeoPoint::new(0.0, 0.0, 0);
/// let b = GeoPoint::new(0.0001, 0.0, 1000);
/// let d = haversine_distance(&a, &b);
/// assert!((d - 11.12).abs() < 0.01);
/// ```
pub fn haversine_distance(a: &GeoPoint, b: &GeoPoint) -> f64 {
    haversine_m(a.lat, a.lng, b.lat, b.lng)
}
