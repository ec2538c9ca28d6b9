//! Location Resolution Module
//!
//! Resolves the place names found in a prompt into coordinates, and turns
//! several resolved places into a single meeting point.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::geo;
use crate::models::Location;
use crate::places::{GeocodedPlace, PlacesProvider};

/// Service for resolving location inputs
#[derive(Clone)]
pub struct LocationResolver {
    places: Arc<dyn PlacesProvider>,
}

impl LocationResolver {
    pub fn new(places: Arc<dyn PlacesProvider>) -> Self {
        Self { places }
    }

    /// Geocode every name, keeping input order and skipping failures
    pub async fn resolve_all(&self, names: &[String]) -> Vec<Location> {
        let lookups = names.iter().map(|name| self.resolve_name(name));
        join_all(lookups).await.into_iter().flatten().collect()
    }

    /// Resolve a location name to coordinates via geocoding
    async fn resolve_name(&self, name: &str) -> Option<Location> {
        debug!("Geocoding location name: {}", name);

        match self.places.geocode(name).await {
            Ok(results) => match results.into_iter().next() {
                Some(best) => {
                    debug!(
                        "Found location: {} ({:.4}, {:.4})",
                        best.formatted_address, best.latitude, best.longitude
                    );
                    Some(Location::with_address(
                        best.latitude,
                        best.longitude,
                        name.to_string(),
                        best.formatted_address,
                    ))
                }
                None => {
                    warn!("Location not found: {}", name);
                    None
                }
            },
            Err(e) => {
                warn!("Geocoding '{}' failed: {:#}", name, e);
                None
            }
        }
    }

    /// Mean of two or more locations, named by its reverse-geocoded address
    pub async fn meeting_point(&self, locations: &[Location]) -> Option<Location> {
        if locations.len() < 2 {
            return None;
        }
        let (lat, lon) = geo::midpoint(locations)?;
        info!(
            "Meeting point of {} locations at ({:.4}, {:.4})",
            locations.len(),
            lat,
            lon
        );
        Some(self.resolve_coordinates(lat, lon, "Meeting point").await)
    }

    /// Name the caller's own position
    pub async fn resolve_device_position(&self, lat: f64, lon: f64) -> Location {
        self.resolve_coordinates(lat, lon, "Current location").await
    }

    /// Resolve coordinates to a location with a proper address via reverse geocoding
    async fn resolve_coordinates(&self, lat: f64, lon: f64, label: &str) -> Location {
        debug!("Resolving coordinates: ({}, {})", lat, lon);

        match self.places.reverse_geocode(lat, lon).await {
            Ok(results) => match results.into_iter().next() {
                Some(GeocodedPlace {
                    formatted_address, ..
                }) => Location::with_address(lat, lon, label.to_string(), formatted_address),
                None => {
                    debug!("No reverse geocoding results found, using coordinates as name");
                    Location::coordinate_fallback(lat, lon)
                }
            },
            Err(e) => {
                debug!("Reverse geocoding failed: {:#}, using coordinates as name", e);
                Location::coordinate_fallback(lat, lon)
            }
        }
    }
}
