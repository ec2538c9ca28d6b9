//! Places, geocoding and photo providers
//!
//! The search pipeline only talks to [`PlacesProvider`]; the Google Maps
//! Platform implementation lives in [`google`].

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{LatLng, Review};

pub mod google;

pub use google::GoogleMapsClient;

/// A geocoder hit
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodedPlace {
    pub formatted_address: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// Largest location-bias radius text search accepts
pub const MAX_SEARCH_RADIUS_KM: f64 = 50.0;

/// Parameters of one text search
#[derive(Debug, Clone, PartialEq)]
pub struct TextSearch {
    pub query: String,
    /// Location bias as (lat, lon)
    pub center: Option<(f64, f64)>,
    pub radius_m: u32,
    /// Highest provider price level to include (0-4)
    pub max_price: Option<u8>,
}

/// A text-search hit before enrichment
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaceSummary {
    pub place_id: String,
    pub name: String,
    pub address: Option<String>,
    pub location: Option<LatLng>,
    pub rating: Option<f64>,
    pub total_ratings: Option<u64>,
    pub price_level: Option<u8>,
    pub open_now: Option<bool>,
    pub photo_references: Vec<String>,
    pub types: Vec<String>,
}

/// Extra fields from a details lookup
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaceDetails {
    pub phone: Option<String>,
    pub website: Option<String>,
    pub maps_url: Option<String>,
    pub open_now: Option<bool>,
    pub weekday_text: Vec<String>,
    pub reviews: Vec<Review>,
    pub photo_references: Vec<String>,
}

/// Raw image bytes with their media type
#[derive(Debug, Clone, PartialEq)]
pub struct PlacePhoto {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[async_trait]
pub trait PlacesProvider: Send + Sync {
    /// Forward-geocode free text; best match first
    async fn geocode(&self, address: &str) -> Result<Vec<GeocodedPlace>>;

    /// Addresses at a coordinate; most specific first
    async fn reverse_geocode(&self, latitude: f64, longitude: f64) -> Result<Vec<GeocodedPlace>>;

    async fn text_search(&self, search: &TextSearch) -> Result<Vec<PlaceSummary>>;

    async fn place_details(&self, place_id: &str) -> Result<PlaceDetails>;

    async fn photo(&self, reference: &str) -> Result<PlacePhoto>;
}

/// Map a spending limit onto the provider's 0-4 price scale
pub fn budget_to_max_price(budget: f64) -> u8 {
    match budget {
        b if b <= 10.0 => 1,
        b if b <= 25.0 => 2,
        b if b <= 50.0 => 3,
        _ => 4,
    }
}
