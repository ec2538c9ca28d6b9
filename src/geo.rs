//! Great-circle distance and meeting-point helpers

use haversine::{Location as HaversineLocation, Units, distance};

use crate::models::Location;

/// Great-circle distance in kilometres between two coordinate pairs
pub fn haversine_km(from: (f64, f64), to: (f64, f64)) -> f64 {
    let from_haversine = HaversineLocation {
        latitude: from.0,
        longitude: from.1,
    };
    let to_haversine = HaversineLocation {
        latitude: to.0,
        longitude: to.1,
    };
    distance(from_haversine, to_haversine, Units::Kilometers)
}

/// Arithmetic mean of the given coordinates.
///
/// This is a planar mean, not a spherical centroid: inputs straddling the
/// antimeridian average towards longitude 0.
pub fn midpoint(locations: &[Location]) -> Option<(f64, f64)> {
    if locations.is_empty() {
        return None;
    }
    let n = locations.len() as f64;
    let (lat_sum, lon_sum) = locations
        .iter()
        .fold((0.0, 0.0), |(lat, lon), l| (lat + l.latitude, lon + l.longitude));
    Some((lat_sum / n, lon_sum / n))
}

/// Kilometres to whole metres, as the places API expects
pub fn km_to_meters(km: f64) -> u32 {
    (km.max(0.0) * 1000.0).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const LONDON: (f64, f64) = (51.5074, -0.1278);
    const PARIS: (f64, f64) = (48.8566, 2.3522);

    #[test]
    fn test_distance_zero_at_same_point() {
        assert_eq!(haversine_km(LONDON, LONDON), 0.0);
    }

    #[test]
    fn test_distance_is_symmetric() {
        let there = haversine_km(LONDON, PARIS);
        let back = haversine_km(PARIS, LONDON);
        assert!((there - back).abs() < 1e-9);
    }

    #[test]
    fn test_distance_london_paris() {
        let km = haversine_km(LONDON, PARIS);
        assert!((km - 343.5).abs() < 3.0, "got {km}");
    }

    #[rstest]
    #[case((0.0, 0.0), (0.0, 1.0))]
    #[case((12.97, 77.59), (12.98, 77.60))]
    #[case((-33.86, 151.21), (40.71, -74.00))]
    fn test_distance_non_negative(#[case] a: (f64, f64), #[case] b: (f64, f64)) {
        assert!(haversine_km(a, b) > 0.0);
    }

    #[test]
    fn test_midpoint_of_two() {
        let a = Location::new(10.0, 20.0, "A".to_string());
        let b = Location::new(20.0, 40.0, "B".to_string());
        assert_eq!(midpoint(&[a, b]), Some((15.0, 30.0)));
    }

    #[test]
    fn test_midpoint_of_one_is_itself() {
        let a = Location::new(12.9716, 77.5946, "Bengaluru".to_string());
        assert_eq!(midpoint(&[a]), Some((12.9716, 77.5946)));
    }

    #[test]
    fn test_midpoint_of_none() {
        assert_eq!(midpoint(&[]), None);
    }

    #[rstest]
    #[case(2.0, 2000)]
    #[case(0.5, 500)]
    #[case(1.2346, 1235)]
    #[case(-1.0, 0)]
    fn test_km_to_meters(#[case] km: f64, #[case] meters: u32) {
        assert_eq!(km_to_meters(km), meters);
    }
}
