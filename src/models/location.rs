//! Location model for geographic coordinates and resolved addresses

use serde::{Deserialize, Serialize};

use crate::geo;

/// A point on the map with the name it was resolved from
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Location {
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
    /// Name as the user wrote it, or the resolved address
    pub name: String,
    /// Formatted address from the geocoder
    pub address: Option<String>,
}

impl Location {
    /// Create a new location
    #[must_use]
    pub fn new(latitude: f64, longitude: f64, name: String) -> Self {
        Self {
            latitude,
            longitude,
            name,
            address: None,
        }
    }

    /// Create location with a formatted address
    #[must_use]
    pub fn with_address(latitude: f64, longitude: f64, name: String, address: String) -> Self {
        Self {
            latitude,
            longitude,
            name,
            address: Some(address),
        }
    }

    /// A location named after its own coordinates
    #[must_use]
    pub fn coordinate_fallback(latitude: f64, longitude: f64) -> Self {
        Self::new(latitude, longitude, format!("{latitude:.4}, {longitude:.4}"))
    }

    /// Format location as coordinates string
    #[must_use]
    pub fn format_coordinates(&self) -> String {
        format!("{:.4}, {:.4}", self.latitude, self.longitude)
    }

    /// Address if known, otherwise the name
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.address.as_deref().unwrap_or(&self.name)
    }

    #[must_use]
    pub fn coordinates(&self) -> (f64, f64) {
        (self.latitude, self.longitude)
    }

    /// Great-circle distance to a (lat, lon) point in kilometres
    #[must_use]
    pub fn distance_km(&self, to: (f64, f64)) -> f64 {
        geo::haversine_km(self.coordinates(), to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinate_fallback_name() {
        let location = Location::coordinate_fallback(46.8182, 8.2275);
        assert_eq!(location.name, "46.8182, 8.2275");
        assert_eq!(location.address, None);
        assert_eq!(location.display_name(), "46.8182, 8.2275");
    }

    #[test]
    fn test_display_name_prefers_address() {
        let location = Location::with_address(
            12.9756,
            77.6066,
            "MG Road".to_string(),
            "Mahatma Gandhi Rd, Bengaluru, Karnataka, India".to_string(),
        );
        assert_eq!(location.display_name(), "Mahatma Gandhi Rd, Bengaluru, Karnataka, India");
        assert_eq!(location.format_coordinates(), "12.9756, 77.6066");
    }

    #[test]
    fn test_distance_to_self_is_zero() {
        let location = Location::new(40.7128, -74.0060, "New York".to_string());
        assert_eq!(location.distance_km(location.coordinates()), 0.0);
    }

    #[test]
    fn test_distance_between_cities() {
        let paris = Location::new(48.8566, 2.3522, "Paris".to_string());
        let km = paris.distance_km((51.5074, -0.1278));
        assert!((km - 343.5).abs() < 2.0, "got {km}");
    }
}
