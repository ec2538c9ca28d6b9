//! Google Maps Platform client (Geocoding, Places text search, details, photos)

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest_middleware::ClientWithMiddleware;
use serde::Deserialize;
use tracing::{info, instrument, warn};

use super::{GeocodedPlace, PlaceDetails, PlacePhoto, PlaceSummary, PlacesProvider, TextSearch};
use crate::config::PlacesConfig;
use crate::error::{DineScoutError, ErrorCode};
use crate::http;
use crate::models::{LatLng, Review};

const SERVICE: &str = "Google Maps";

const DETAIL_FIELDS: &str = "place_id,name,formatted_phone_number,website,url,opening_hours,reviews,photos";

/// Client for the legacy JSON web services
pub struct GoogleMapsClient {
    client: ClientWithMiddleware,
    api_key: Option<String>,
    base_url: String,
    photo_max_width: u32,
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    error_message: Option<String>,
    #[serde(default)]
    results: Vec<GeocodeResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    formatted_address: String,
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: LatLng,
}

#[derive(Debug, Deserialize)]
struct TextSearchResponse {
    status: String,
    error_message: Option<String>,
    #[serde(default)]
    results: Vec<RawPlace>,
}

#[derive(Debug, Deserialize)]
struct DetailsResponse {
    status: String,
    error_message: Option<String>,
    result: Option<RawPlace>,
}

/// Place object shared by text search and details responses
#[derive(Debug, Deserialize)]
struct RawPlace {
    place_id: Option<String>,
    name: Option<String>,
    formatted_address: Option<String>,
    vicinity: Option<String>,
    geometry: Option<Geometry>,
    rating: Option<f64>,
    user_ratings_total: Option<u64>,
    price_level: Option<u8>,
    opening_hours: Option<OpeningHours>,
    #[serde(default)]
    photos: Vec<RawPhoto>,
    #[serde(default)]
    types: Vec<String>,
    formatted_phone_number: Option<String>,
    website: Option<String>,
    url: Option<String>,
    #[serde(default)]
    reviews: Vec<RawReview>,
}

#[derive(Debug, Deserialize)]
struct OpeningHours {
    open_now: Option<bool>,
    #[serde(default)]
    weekday_text: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawPhoto {
    photo_reference: String,
}

#[derive(Debug, Deserialize)]
struct RawReview {
    author_name: Option<String>,
    rating: Option<f64>,
    text: Option<String>,
    relative_time_description: Option<String>,
    time: Option<i64>,
}

/// Interpret a web-service `status` field.
///
/// Returns `Ok(false)` for the "nothing found" statuses.
fn check_status(status: &str, error_message: Option<&str>) -> Result<bool> {
    let code = match status {
        "OK" => return Ok(true),
        "ZERO_RESULTS" | "NOT_FOUND" => return Ok(false),
        "REQUEST_DENIED" => ErrorCode::ApiUnauthorized,
        "OVER_QUERY_LIMIT" | "OVER_DAILY_LIMIT" => ErrorCode::ApiRateLimit,
        "INVALID_REQUEST" => ErrorCode::ApiInvalidResponse,
        _ => ErrorCode::ApiNetworkError,
    };
    let detail = error_message.unwrap_or("no error message");
    Err(DineScoutError::api(format!("{SERVICE} status {status}: {detail}"), code).into())
}

impl GeocodeResponse {
    fn into_places(self) -> Result<Vec<GeocodedPlace>> {
        if !check_status(&self.status, self.error_message.as_deref())? {
            return Ok(Vec::new());
        }
        Ok(self
            .results
            .into_iter()
            .map(|r| GeocodedPlace {
                formatted_address: r.formatted_address,
                latitude: r.geometry.location.lat,
                longitude: r.geometry.location.lng,
            })
            .collect())
    }
}

impl TextSearchResponse {
    fn into_summaries(self) -> Result<Vec<PlaceSummary>> {
        if !check_status(&self.status, self.error_message.as_deref())? {
            return Ok(Vec::new());
        }
        Ok(self
            .results
            .into_iter()
            .filter_map(RawPlace::into_summary)
            .collect())
    }
}

impl DetailsResponse {
    fn into_details(self) -> Result<PlaceDetails> {
        if !check_status(&self.status, self.error_message.as_deref())? {
            return Ok(PlaceDetails::default());
        }
        Ok(self.result.map(RawPlace::into_details).unwrap_or_default())
    }
}

impl RawPlace {
    /// Hits without an id or a name cannot be enriched or shown
    fn into_summary(self) -> Option<PlaceSummary> {
        let place_id = self.place_id?;
        let name = self.name?;
        Some(PlaceSummary {
            place_id,
            name,
            address: self.formatted_address.or(self.vicinity),
            location: self.geometry.map(|g| g.location),
            rating: self.rating,
            total_ratings: self.user_ratings_total,
            price_level: self.price_level,
            open_now: self.opening_hours.and_then(|h| h.open_now),
            photo_references: self.photos.into_iter().map(|p| p.photo_reference).collect(),
            types: self.types,
        })
    }

    fn into_details(self) -> PlaceDetails {
        let (open_now, weekday_text) = match self.opening_hours {
            Some(hours) => (hours.open_now, hours.weekday_text),
            None => (None, Vec::new()),
        };
        PlaceDetails {
            phone: self.formatted_phone_number,
            website: self.website,
            maps_url: self.url,
            open_now,
            weekday_text,
            reviews: self.reviews.into_iter().map(RawReview::into_review).collect(),
            photo_references: self.photos.into_iter().map(|p| p.photo_reference).collect(),
        }
    }
}

impl RawReview {
    fn into_review(self) -> Review {
        Review {
            author_name: self.author_name.unwrap_or_else(|| "Anonymous".to_string()),
            rating: self.rating,
            text: self.text.unwrap_or_default(),
            time: self.relative_time_description.unwrap_or_default(),
            published_at: self.time.and_then(Review::timestamp),
        }
    }
}

impl GoogleMapsClient {
    pub fn new(client: ClientWithMiddleware, config: &PlacesConfig) -> Self {
        Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.clone(),
            photo_max_width: config.photo_max_width,
        }
    }

    fn api_key(&self) -> Result<&str> {
        self.api_key.as_deref().ok_or_else(|| {
            DineScoutError::api("GOOGLE_API_KEY is not configured", ErrorCode::MissingApiKey).into()
        })
    }

    /// `{base}/{path}?{params}&key=…` with every value URL-encoded
    fn url(&self, path: &str, params: &[(&str, String)]) -> Result<String> {
        let key = self.api_key()?;
        let mut query: Vec<String> = params
            .iter()
            .map(|(name, value)| format!("{name}={}", urlencoding::encode(value)))
            .collect();
        query.push(format!("key={}", urlencoding::encode(key)));
        Ok(format!("{}/{}?{}", self.base_url, path, query.join("&")))
    }

    async fn fetch<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = http::get(&self.client, SERVICE, url).await?;
        http::read_json(response, SERVICE).await
    }
}

fn text_search_params(search: &TextSearch) -> Vec<(&'static str, String)> {
    let mut params = vec![("query", search.query.clone())];
    if let Some((lat, lon)) = search.center {
        params.push(("location", format!("{lat},{lon}")));
        params.push(("radius", search.radius_m.to_string()));
    }
    if let Some(max_price) = search.max_price {
        params.push(("maxprice", max_price.to_string()));
    }
    params
}

#[async_trait]
impl PlacesProvider for GoogleMapsClient {
    #[instrument(skip(self))]
    async fn geocode(&self, address: &str) -> Result<Vec<GeocodedPlace>> {
        let url = self.url("geocode/json", &[("address", address.to_string())])?;
        let places = self
            .fetch::<GeocodeResponse>(&url)
            .await?
            .into_places()
            .with_context(|| format!("Geocoding '{address}' failed"))?;

        if places.is_empty() {
            warn!("No geocoding results for '{}'", address);
        } else {
            info!("Found {} geocoding results for '{}'", places.len(), address);
        }
        Ok(places)
    }

    #[instrument(skip(self))]
    async fn reverse_geocode(&self, latitude: f64, longitude: f64) -> Result<Vec<GeocodedPlace>> {
        let url = self.url("geocode/json", &[("latlng", format!("{latitude},{longitude}"))])?;
        self.fetch::<GeocodeResponse>(&url)
            .await?
            .into_places()
            .with_context(|| format!("Reverse geocoding {latitude:.4},{longitude:.4} failed"))
    }

    #[instrument(skip(self, search), fields(query = %search.query))]
    async fn text_search(&self, search: &TextSearch) -> Result<Vec<PlaceSummary>> {
        let url = self.url("place/textsearch/json", &text_search_params(search))?;
        let results = self
            .fetch::<TextSearchResponse>(&url)
            .await?
            .into_summaries()
            .context("Text search failed")?;
        info!("Text search returned {} places", results.len());
        Ok(results)
    }

    #[instrument(skip(self))]
    async fn place_details(&self, place_id: &str) -> Result<PlaceDetails> {
        let url = self.url(
            "place/details/json",
            &[
                ("place_id", place_id.to_string()),
                ("fields", DETAIL_FIELDS.to_string()),
            ],
        )?;
        self.fetch::<DetailsResponse>(&url)
            .await?
            .into_details()
            .with_context(|| format!("Details lookup for {place_id} failed"))
    }

    #[instrument(skip(self, reference))]
    async fn photo(&self, reference: &str) -> Result<PlacePhoto> {
        let url = self.url(
            "place/photo",
            &[
                ("maxwidth", self.photo_max_width.to_string()),
                ("photo_reference", reference.to_string()),
            ],
        )?;
        let response = http::get(&self.client, SERVICE, &url).await?;
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("image/jpeg")
            .to_string();
        let bytes = response
            .bytes()
            .await
            .context("Failed to read photo bytes")?
            .to_vec();
        Ok(PlacePhoto {
            content_type,
            bytes,
        })
    }
}
