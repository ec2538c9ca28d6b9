//! Restaurant Search Service
//!
//! Runs one request through parse → resolve → search → enrich. Every
//! external failure degrades to empty or missing fields; a search never
//! returns an error to the caller.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use futures::future::join_all;
use tokio::time::{Instant, timeout_at};
use tracing::{debug, error, info, instrument, warn};

use crate::api::PHOTO_PATH;
use crate::config::{DineScoutConfig, SearchConfig};
use crate::error::{DineScoutError, ErrorCode};
use crate::geo;
use crate::http;
use crate::llm::{CompletionProvider, GeminiClient};
use crate::location_resolver::LocationResolver;
use crate::models::{
    Location, ParsedQuery, Restaurant, SearchRequest, SearchResponse, SortKey,
    restaurant::cuisine_types_from,
};
use crate::places::{
    GoogleMapsClient, MAX_SEARCH_RADIUS_KM, PlaceDetails, PlaceSummary, PlacesProvider, TextSearch,
    budget_to_max_price,
};
use crate::prompt_parser::{self, PromptParser};

const MAX_PHOTOS: usize = 5;

/// Where a search is centred and why
#[derive(Debug, Clone, PartialEq)]
pub enum SearchCentre {
    /// The only place the user named
    Named(Location),
    /// Mean of several named places
    MeetingPoint(Location),
    /// The caller's device position
    Device(Location),
}

impl SearchCentre {
    #[must_use]
    pub fn location(&self) -> &Location {
        match self {
            SearchCentre::Named(l) | SearchCentre::MeetingPoint(l) | SearchCentre::Device(l) => l,
        }
    }

    /// Text-search query for a dish around this centre
    #[must_use]
    pub fn query_for(&self, dish: Option<&str>) -> String {
        let subject = match dish.map(str::trim).filter(|d| !d.is_empty()) {
            Some(d) if d.to_lowercase().contains("restaurant") => d.to_string(),
            Some(d) => format!("{d} restaurants"),
            None => "restaurants".to_string(),
        };
        match self {
            SearchCentre::Named(l) => format!("{subject} in {}", l.name),
            SearchCentre::MeetingPoint(l) => format!("{subject} near {}", l.display_name()),
            SearchCentre::Device(_) => subject,
        }
    }
}

/// Orchestrates prompt parsing, location resolution and place search
#[derive(Clone)]
pub struct RestaurantSearchService {
    parser: PromptParser,
    resolver: LocationResolver,
    places: Arc<dyn PlacesProvider>,
    settings: SearchConfig,
}

impl RestaurantSearchService {
    pub fn new(
        llm: Arc<dyn CompletionProvider>,
        places: Arc<dyn PlacesProvider>,
        settings: SearchConfig,
    ) -> Self {
        Self {
            parser: PromptParser::new(llm),
            resolver: LocationResolver::new(places.clone()),
            places,
            settings,
        }
    }

    /// Wire the Gemini and Google Maps clients from configuration
    pub fn from_config(config: &DineScoutConfig) -> Result<Self> {
        let client = http::build_client(&config.http)?;
        let llm = Arc::new(GeminiClient::new(client.clone(), &config.llm));
        let places = Arc::new(GoogleMapsClient::new(client, &config.places));
        Ok(Self::new(llm, places, config.search.clone()))
    }

    /// Provider used for photo proxying
    #[must_use]
    pub fn places(&self) -> &Arc<dyn PlacesProvider> {
        &self.places
    }

    #[instrument(skip_all, fields(sort_by = ?request.sort_by))]
    pub async fn search(&self, request: SearchRequest) -> SearchResponse {
        let prompt = request.prompt.trim();
        if prompt.is_empty() {
            warn!("Empty prompt, nothing to search");
            return SearchResponse::default();
        }

        let deadline = Instant::now() + Duration::from_secs(self.settings.time_budget_seconds);

        let parsed = within(deadline, "prompt parsing", self.parser.parse(prompt))
            .await
            .unwrap_or_else(|| prompt_parser::extract_from_prompt(prompt));

        let Some(original_locations) = within(
            deadline,
            "location resolution",
            self.resolver.resolve_all(&parsed.locations),
        )
        .await
        else {
            return SearchResponse {
                parsed_prompt: parsed,
                ..Default::default()
            };
        };
        let midpoint = within(
            deadline,
            "meeting point",
            self.resolver.meeting_point(&original_locations),
        )
        .await
        .flatten();

        let centre = match (&midpoint, original_locations.first(), request.location) {
            (Some(meet), _, _) => Some(SearchCentre::MeetingPoint(meet.clone())),
            (None, Some(only), _) => Some(SearchCentre::Named(only.clone())),
            (None, None, Some(device)) => Some(SearchCentre::Device(
                within(
                    deadline,
                    "device position",
                    self.resolver.resolve_device_position(device.lat, device.lng),
                )
                .await
                .unwrap_or_else(|| Location::coordinate_fallback(device.lat, device.lng)),
            )),
            (None, None, None) => None,
        };

        let restaurants = match centre {
            Some(_) if Instant::now() >= deadline => {
                warn!("Time budget spent before place search, returning partial result");
                Vec::new()
            }
            Some(centre) => {
                let mut restaurants = self.find_restaurants(&parsed, &centre, deadline).await;
                if let Some(filters) = &request.filters {
                    restaurants.retain(|r| filters.matches(r));
                }
                let sort_key = SortKey::parse_or_default(request.sort_by.as_deref());
                sort_key.sort(&mut restaurants);
                debug!("Sorted {} restaurants by {}", restaurants.len(), sort_key);
                restaurants
            }
            None => {
                info!("No usable location in prompt or request, skipping place search");
                Vec::new()
            }
        };

        info!(
            "Search finished: {} locations, meeting point: {}, {} restaurants",
            original_locations.len(),
            midpoint.is_some(),
            restaurants.len()
        );

        SearchResponse {
            parsed_prompt: parsed,
            midpoint,
            original_locations,
            restaurants,
        }
    }

    /// Text search around the centre, then enrich each hit
    async fn find_restaurants(
        &self,
        parsed: &ParsedQuery,
        centre: &SearchCentre,
        deadline: Instant,
    ) -> Vec<Restaurant> {
        let search = self.text_search_for(parsed, centre);
        info!("Searching '{}' within {} m", search.query, search.radius_m);

        let found = within(deadline, "place search", self.places.text_search(&search)).await;
        let mut summaries = match found {
            Some(Ok(summaries)) => summaries,
            Some(Err(e)) => {
                match provider_code(&e) {
                    Some(ErrorCode::ApiUnauthorized | ErrorCode::MissingApiKey) => {
                        error!("Place search rejected, check GOOGLE_API_KEY: {:#}", e);
                    }
                    _ => warn!("Place search failed: {:#}", e),
                }
                return Vec::new();
            }
            None => return Vec::new(),
        };
        summaries.truncate(self.settings.max_results);

        // Details still pending at the deadline leave the search-level fields
        let mut details = within(
            deadline,
            "place details",
            join_all(summaries.iter().map(|s| self.details_for(&s.place_id))),
        )
        .await
        .unwrap_or_default()
        .into_iter();

        let origin = centre.location();
        let photo_base = format!(
            "{}{PHOTO_PATH}",
            self.settings.public_base_url.as_deref().unwrap_or_default()
        );
        let mut restaurants: Vec<Restaurant> = summaries
            .into_iter()
            .map(|summary| merge_place(summary, details.next().flatten(), origin, &photo_base))
            .collect();

        // The provider treats radius as a bias; an explicit distance is a hard limit.
        if let Some(limit) = parsed.max_distance_km {
            restaurants.retain(|r| r.distance_km.is_none_or(|d| d <= limit));
        }
        restaurants
    }

    fn text_search_for(&self, parsed: &ParsedQuery, centre: &SearchCentre) -> TextSearch {
        let radius_km = parsed
            .max_distance_km
            .unwrap_or(self.settings.default_radius_km)
            .min(MAX_SEARCH_RADIUS_KM);
        TextSearch {
            query: centre.query_for(parsed.dish.as_deref()),
            center: Some(centre.location().coordinates()),
            radius_m: geo::km_to_meters(radius_km),
            max_price: parsed.max_budget.map(budget_to_max_price),
        }
    }

    async fn details_for(&self, place_id: &str) -> Option<PlaceDetails> {
        match self.places.place_details(place_id).await {
            Ok(details) => Some(details),
            Err(e) => {
                warn!("Details for {} unavailable: {:#}", place_id, e);
                None
            }
        }
    }
}

/// Run `future` unless the deadline passes first
async fn within<T>(deadline: Instant, stage: &str, future: impl Future<Output = T>) -> Option<T> {
    match timeout_at(deadline, future).await {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Time budget exhausted during {}", stage);
            None
        }
    }
}

/// Classification of the first provider error in the chain
fn provider_code(error: &anyhow::Error) -> Option<ErrorCode> {
    error
        .chain()
        .find_map(|cause| cause.downcast_ref::<DineScoutError>())
        .and_then(DineScoutError::code)
}

/// Combine a search hit with its details and distance from the centre
fn merge_place(
    summary: PlaceSummary,
    details: Option<PlaceDetails>,
    origin: &Location,
    photo_base: &str,
) -> Restaurant {
    let details = details.unwrap_or_default();

    let photo_refs = if details.photo_references.is_empty() {
        summary.photo_references
    } else {
        details.photo_references
    };
    let photos = photo_refs
        .iter()
        .take(MAX_PHOTOS)
        .map(|r| format!("{photo_base}/{}", urlencoding::encode(r)))
        .collect();

    let distance_km = summary.location.map(|ll| {
        let km = origin.distance_km((ll.lat, ll.lng));
        (km * 100.0).round() / 100.0
    });

    let maps_link = details.maps_url.unwrap_or_else(|| {
        format!(
            "https://www.google.com/maps/place/?q=place_id:{}",
            summary.place_id
        )
    });

    Restaurant {
        cuisine_types: cuisine_types_from(&summary.types),
        place_id: summary.place_id,
        name: summary.name,
        address: summary.address,
        location: summary.location,
        rating: summary.rating,
        total_ratings: summary.total_ratings,
        price_level: summary.price_level,
        open_now: details.open_now.or(summary.open_now),
        photos,
        website: details.website,
        phone: details.phone,
        maps_link: Some(maps_link),
        opening_hours: details.weekday_text,
        reviews: details.reviews,
        distance_km,
    }
}
