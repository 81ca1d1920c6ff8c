//! # Geo
//! Great-circle distance on a spherical Earth plus the radius test used by
//! event aggregation, nearby retrieval and the trending fallback.
//!
//! Pure arithmetic: coordinate range checks live in [`validate_location`] and
//! are the caller's job.

use crate::error::{NewsError, NewsResult};

pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Anything with a position that can carry a computed distance.
pub trait Locatable {
    fn point(&self) -> GeoPoint;
    fn set_distance(&mut self, km: f64);
}

/// Haversine distance in kilometers.
///
/// The haversine term is clamped to `[0, 1]` so rounding near antipodal
/// points yields half the circumference rather than NaN.
pub fn distance_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lon = (b.lon - a.lon).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    let h = h.clamp(0.0, 1.0);

    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_KM * c
}

/// `distance ≤ radius_km`. A zero radius only admits the identical point.
pub fn within_radius(center: GeoPoint, point: GeoPoint, radius_km: f64) -> bool {
    distance_km(center, point) <= radius_km
}

/// Range check for user-supplied coordinates.
pub fn validate_location(lat: f64, lon: f64) -> NewsResult<()> {
    if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
        return Err(NewsError::invalid(
            "invalid latitude: must be between -90 and 90",
        ));
    }
    if !lon.is_finite() || !(-180.0..=180.0).contains(&lon) {
        return Err(NewsError::invalid(
            "invalid longitude: must be between -180 and 180",
        ));
    }
    Ok(())
}

/// Keep items within `radius_km` of `center` that also satisfy `pred`,
/// annotating each survivor with its distance.
pub fn filter_within<T, F>(items: Vec<T>, center: GeoPoint, radius_km: f64, pred: F) -> Vec<T>
where
    T: Locatable,
    F: Fn(&T) -> bool,
{
    items
        .into_iter()
        .filter_map(|mut it| {
            let d = distance_km(center, it.point());
            if d <= radius_km && pred(&it) {
                it.set_distance(d);
                Some(it)
            } else {
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SF: GeoPoint = GeoPoint::new(37.7749, -122.4194);
    const LA: GeoPoint = GeoPoint::new(34.0522, -118.2437);

    #[test]
    fn zero_for_same_point() {
        assert_eq!(distance_km(SF, SF), 0.0);
    }

    #[test]
    fn sf_to_la() {
        let d = distance_km(SF, LA);
        assert!((d - 559.0).abs() < 5.0, "got {d}");
    }

    #[test]
    fn antipodes_are_finite() {
        let d = distance_km(GeoPoint::new(0.0, 0.0), GeoPoint::new(0.0, 180.0));
        assert!(d.is_finite());
        assert!((d - std::f64::consts::PI * EARTH_RADIUS_KM).abs() < 1.0);
    }

    #[test]
    fn zero_radius_is_exact() {
        assert!(within_radius(SF, SF, 0.0));
        let nudged = GeoPoint::new(SF.lat + 0.0001, SF.lon);
        assert!(!within_radius(SF, nudged, 0.0));
    }

    #[test]
    fn out_of_range_still_computes() {
        let d = distance_km(GeoPoint::new(95.0, 0.0), GeoPoint::new(0.0, 200.0));
        assert!(d.is_finite());
    }

    #[test]
    fn validation_bounds() {
        assert!(validate_location(90.0, 180.0).is_ok());
        assert!(validate_location(-90.0, -180.0).is_ok());
        assert!(validate_location(90.1, 0.0).is_err());
        assert!(validate_location(0.0, -180.5).is_err());
        assert!(validate_location(f64::NAN, 0.0).is_err());
    }
}
