//! `DineScout` - natural-language restaurant search
//!
//! This library turns a free-text request into structured search
//! parameters, resolves the places it mentions (including a meeting point
//! between several of them), and returns enriched, ranked restaurants.

pub mod api;
pub mod config;
pub mod error;
pub mod geo;
pub mod http;
pub mod llm;
pub mod location_resolver;
pub mod models;
pub mod places;
pub mod prompt_parser;
pub mod search;
pub mod telemetry;
pub mod web;

// Re-export core types for public API
pub use api::AppState;
pub use config::DineScoutConfig;
pub use error::{DineScoutError, ErrorCode};
pub use llm::{CompletionProvider, GeminiClient};
pub use location_resolver::LocationResolver;
pub use models::{Location, ParsedQuery, Restaurant, SearchRequest, SearchResponse, SortKey};
pub use places::{GoogleMapsClient, PlacesProvider};
pub use prompt_parser::PromptParser;
pub use search::RestaurantSearchService;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
