use std::sync::Arc;

use axum::{
    Router,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Json},
    routing::{get, post},
};
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::VERSION;
use crate::models::{SearchRequest, SearchResponse};
use crate::search::RestaurantSearchService;

/// Prefix of the photo proxy route; restaurant photo URLs are built on it
pub const PHOTO_PATH: &str = "/photos";

const PHOTO_CACHE_CONTROL: &str = "public, max-age=86400";

/// Shared state for the HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub search: Arc<RestaurantSearchService>,
}

impl AppState {
    pub fn new(search: RestaurantSearchService) -> Self {
        Self {
            search: Arc::new(search),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/search", post(search))
        .route(&format!("{PHOTO_PATH}/{{reference}}"), get(photo))
        .with_state(state)
}

async fn root() -> Json<Value> {
    Json(json!({ "message": "Restaurant AI Search API is running!" }))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "version": VERSION }))
}

async fn search(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> Json<SearchResponse> {
    info!("Search request: {:?}", request.prompt);
    Json(state.search.search(request).await)
}

async fn photo(
    State(state): State<AppState>,
    Path(reference): Path<String>,
) -> Result<impl IntoResponse, StatusCode> {
    let photo = state
        .search
        .places()
        .photo(&reference)
        .await
        .map_err(|e| {
            warn!("Photo proxy failed: {:#}", e);
            StatusCode::BAD_GATEWAY
        })?;

    Ok((
        [
            (header::CONTENT_TYPE, photo.content_type),
            (header::CACHE_CONTROL, PHOTO_CACHE_CONTROL.to_string()),
        ],
        photo.bytes,
    ))
}
