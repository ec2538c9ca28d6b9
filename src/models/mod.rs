//! Data models for the DineScout service
//!
//! All models are request-scoped values:
//! - Location: resolved coordinates and addresses
//! - Query: structured parameters extracted from a prompt
//! - Restaurant: enriched venue records
//! - Search: request/response envelopes and ranking

pub mod location;
pub mod query;
pub mod restaurant;
pub mod search;

// Re-export all public types for convenient access
pub use location::Location;
pub use query::ParsedQuery;
pub use restaurant::{LatLng, Restaurant, Review};
pub use search::{DevicePosition, SearchFilters, SearchRequest, SearchResponse, SortKey};
