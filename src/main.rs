use anyhow::Result;
use tracing::{info, warn};

use dinescout::{AppState, DineScoutConfig, RestaurantSearchService, VERSION, telemetry, web};

#[tokio::main]
async fn main() -> Result<()> {
    let config = DineScoutConfig::load()?;
    let telemetry = telemetry::init(&config.logging)?;

    info!("DineScout {} starting", VERSION);
    if config.llm.api_key.is_none() {
        warn!("GEMINI_API_KEY not set, prompts will be parsed heuristically");
    }
    if config.places.api_key.is_none() {
        warn!("GOOGLE_API_KEY not set, searches will return no restaurants");
    }

    let service = RestaurantSearchService::from_config(&config)?;
    let result = web::run(&config.server, AppState::new(service)).await;

    telemetry.shutdown();
    result
}
