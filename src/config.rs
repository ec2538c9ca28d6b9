//! Configuration management for the `DineScout` service
//!
//! Settings come from `DINESCOUT_<SECTION>__<FIELD>` environment variables
//! (optionally seeded from a `.env` file), fall back to defaults, and are
//! validated before the server starts. The provider keys keep their usual
//! names, `GEMINI_API_KEY` and `GOOGLE_API_KEY`.

use crate::DineScoutError;
use crate::places::MAX_SEARCH_RADIUS_KM;
use anyhow::{Context, Result};
use config::{Config, Environment, Map};
use serde::{Deserialize, Serialize};

const ENV_PREFIX: &str = "DINESCOUT";

/// Root configuration structure for the `DineScout` service
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DineScoutConfig {
    /// Language model configuration
    pub llm: LlmConfig,
    /// Places / geocoding provider configuration
    pub places: PlacesConfig,
    /// Outbound HTTP settings shared by all providers
    pub http: HttpConfig,
    /// Listener configuration
    pub server: ServerConfig,
    /// Search defaults
    pub search: SearchConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Generative-language API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Gemini API key
    pub api_key: Option<String>,
    /// Model name used for prompt extraction
    #[serde(default = "default_llm_model")]
    pub model: String,
    /// Base URL of the generative-language API
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,
    /// Sampling temperature for extraction
    #[serde(default = "default_llm_temperature")]
    pub temperature: f32,
}

/// Google Maps Platform settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacesConfig {
    /// Maps Platform API key
    pub api_key: Option<String>,
    /// Base URL of the maps API (`.../maps/api`)
    #[serde(default = "default_places_base_url")]
    pub base_url: String,
    /// Width requested for proxied photos
    #[serde(default = "default_photo_max_width")]
    pub photo_max_width: u32,
}

/// Outbound HTTP settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Request timeout in seconds
    #[serde(default = "default_http_timeout")]
    pub timeout_seconds: u32,
    /// Retries for transient transport failures
    #[serde(default)]
    pub max_retries: u32,
}

/// Listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// PEM certificate; TLS is used when both cert and key are set
    pub tls_cert: Option<String>,
    /// PEM private key
    pub tls_key: Option<String>,
}

/// Search defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Radius used when the prompt gives no distance
    #[serde(default = "default_radius_km")]
    pub default_radius_km: f64,
    /// Maximum number of restaurants enriched and returned
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    /// Wall-clock budget for one search; stages still pending when it runs
    /// out are skipped and the partial result is returned
    #[serde(default = "default_time_budget")]
    pub time_budget_seconds: u64,
    /// Origin clients reach this API on, e.g. `https://api.example.com`;
    /// photo URLs are relative when unset
    pub public_base_url: Option<String>,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (pretty or json)
    #[serde(default = "default_log_format")]
    pub format: String,
    /// OTLP/HTTP collector endpoint; spans are exported only when set
    pub otlp_endpoint: Option<String>,
}

// Default value functions
fn default_llm_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_llm_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_llm_temperature() -> f32 {
    0.1
}

fn default_places_base_url() -> String {
    "https://maps.googleapis.com/maps/api".to_string()
}

fn default_photo_max_width() -> u32 {
    400
}

fn default_http_timeout() -> u32 {
    15
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_radius_km() -> f64 {
    2.0
}

fn default_max_results() -> usize {
    10
}

fn default_time_budget() -> u64 {
    45
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_llm_model(),
            base_url: default_llm_base_url(),
            temperature: default_llm_temperature(),
        }
    }
}

impl Default for PlacesConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_places_base_url(),
            photo_max_width: default_photo_max_width(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_http_timeout(),
            max_retries: 0,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            tls_cert: None,
            tls_key: None,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_radius_km: default_radius_km(),
            max_results: default_max_results(),
            time_budget_seconds: default_time_budget(),
            public_base_url: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            otlp_endpoint: None,
        }
    }
}

impl DineScoutConfig {
    /// Load configuration from `.env` and the process environment
    pub fn load() -> Result<Self> {
        match dotenvy::dotenv() {
            Ok(path) => tracing::debug!("Loaded environment from {}", path.display()),
            Err(e) if e.not_found() => {}
            Err(e) => return Err(e).context("Failed to read .env file"),
        }
        Self::from_env(std::env::vars().collect())
    }

    /// Build configuration from a snapshot of environment variables
    pub fn from_env(vars: Map<String, String>) -> Result<Self> {
        let key = |name: &str| {
            vars.get(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let gemini_key = key("GEMINI_API_KEY");
        let google_key = key("GOOGLE_API_KEY");

        let settings = Config::builder()
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .ignore_empty(true)
                    .source(Some(vars)),
            )
            .set_override_option("llm.api_key", gemini_key)?
            .set_override_option("places.api_key", google_key)?
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: DineScoutConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        // Apply defaults for missing values
        config.apply_defaults();

        config.validate()?;

        Ok(config)
    }

    /// Apply default values to missing configuration fields
    pub fn apply_defaults(&mut self) {
        if self.llm.model.is_empty() {
            self.llm.model = default_llm_model();
        }
        if self.llm.base_url.is_empty() {
            self.llm.base_url = default_llm_base_url();
        }
        if self.places.base_url.is_empty() {
            self.places.base_url = default_places_base_url();
        }
        if self.places.photo_max_width == 0 {
            self.places.photo_max_width = default_photo_max_width();
        }
        if self.http.timeout_seconds == 0 {
            self.http.timeout_seconds = default_http_timeout();
        }
        if self.search.default_radius_km <= 0.0 {
            self.search.default_radius_km = default_radius_km();
        }
        if self.search.max_results == 0 {
            self.search.max_results = default_max_results();
        }
        if self.search.time_budget_seconds == 0 {
            self.search.time_budget_seconds = default_time_budget();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
        self.logging.level = self.logging.level.to_lowercase();
        self.logging.format = self.logging.format.to_lowercase();
        self.search.public_base_url = self
            .search
            .public_base_url
            .take()
            .map(|url| url.trim_end_matches('/').to_string());
        self.llm.base_url = self.llm.base_url.trim_end_matches('/').to_string();
        self.places.base_url = self.places.base_url.trim_end_matches('/').to_string();
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_api_keys()?;
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        Ok(())
    }

    /// Validate API keys; both are optional at startup
    pub fn validate_api_keys(&self) -> Result<()> {
        for (name, key) in [
            ("Gemini", &self.llm.api_key),
            ("Google Maps", &self.places.api_key),
        ] {
            if let Some(key) = key {
                if key.len() < 8 {
                    return Err(DineScoutError::config(format!(
                        "{name} API key appears to be invalid (too short). Please check your API key."
                    ))
                    .into());
                }
                if key.chars().any(char::is_whitespace) {
                    return Err(DineScoutError::config(format!(
                        "{name} API key must not contain whitespace"
                    ))
                    .into());
                }
            }
        }
        Ok(())
    }

    /// Validate numeric configuration ranges
    fn validate_numeric_ranges(&self) -> Result<()> {
        if self.http.timeout_seconds > 300 {
            return Err(DineScoutError::config("HTTP timeout cannot exceed 300 seconds").into());
        }

        if self.http.max_retries > 10 {
            return Err(DineScoutError::config("HTTP max retries cannot exceed 10").into());
        }

        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(
                DineScoutError::config("LLM temperature must be between 0.0 and 2.0").into(),
            );
        }

        if self.search.default_radius_km > MAX_SEARCH_RADIUS_KM {
            return Err(DineScoutError::config("Default search radius cannot exceed 50 km").into());
        }

        if self.search.max_results > 20 {
            return Err(DineScoutError::config("Maximum results cannot exceed 20").into());
        }

        // Must finish before the 60 s request timeout in the web layer
        if self.search.time_budget_seconds > 55 {
            return Err(
                DineScoutError::config("Search time budget cannot exceed 55 seconds").into(),
            );
        }

        if !(1..=1600).contains(&self.places.photo_max_width) {
            return Err(
                DineScoutError::config("Photo width must be between 1 and 1600 pixels").into(),
            );
        }

        Ok(())
    }

    /// Validate string configuration values
    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(DineScoutError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(DineScoutError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        for (name, url) in [
            ("LLM", Some(&self.llm.base_url)),
            ("Places", Some(&self.places.base_url)),
            ("Public", self.search.public_base_url.as_ref()),
        ] {
            if url.is_some_and(|url| !is_http_url(url)) {
                return Err(DineScoutError::config(format!(
                    "{name} base URL must be a valid HTTP or HTTPS URL"
                ))
                .into());
            }
        }

        if self.server.tls_cert.is_some() != self.server.tls_key.is_some() {
            return Err(DineScoutError::config(
                "TLS needs both DINESCOUT_SERVER__TLS_CERT and DINESCOUT_SERVER__TLS_KEY",
            )
            .into());
        }

        Ok(())
    }
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Map<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_default_config() {
        let config = DineScoutConfig::default();
        assert_eq!(config.llm.model, "gemini-1.5-flash");
        assert_eq!(config.places.base_url, "https://maps.googleapis.com/maps/api");
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.search.default_radius_km, 2.0);
        assert_eq!(config.http.max_retries, 0);
        assert_eq!(config.logging.level, "info");
        assert!(config.llm.api_key.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_environment_uses_serde_defaults() {
        let config = DineScoutConfig::from_env(Map::new()).unwrap();
        assert_eq!(config.llm.model, "gemini-1.5-flash");
        assert_eq!(config.http.timeout_seconds, 15);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.search.max_results, 10);
        assert_eq!(config.search.time_budget_seconds, 45);
        assert_eq!(config.logging.format, "pretty");
        assert!(config.places.api_key.is_none());
        assert!(config.search.public_base_url.is_none());
    }

    #[test]
    fn test_from_env_reads_keys_and_overrides() {
        let config = DineScoutConfig::from_env(vars(&[
            ("GEMINI_API_KEY", "gemini-key-123"),
            ("GOOGLE_API_KEY", "maps-key-456"),
            ("DINESCOUT_SERVER__PORT", "9090"),
            ("DINESCOUT_SEARCH__MAX_RESULTS", "5"),
            ("DINESCOUT_SEARCH__TIME_BUDGET_SECONDS", "30"),
            ("DINESCOUT_HTTP__TIMEOUT_SECONDS", "20"),
            ("DINESCOUT_LLM__TEMPERATURE", "0.3"),
            ("DINESCOUT_LOGGING__FORMAT", "JSON"),
            ("DINESCOUT_PLACES__BASE_URL", "http://localhost:1234/maps/api/"),
            ("DINESCOUT_SEARCH__PUBLIC_BASE_URL", "https://api.dinescout.test/"),
        ]))
        .unwrap();

        assert_eq!(config.llm.api_key.as_deref(), Some("gemini-key-123"));
        assert_eq!(config.places.api_key.as_deref(), Some("maps-key-456"));
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.search.max_results, 5);
        assert_eq!(config.search.time_budget_seconds, 30);
        assert_eq!(config.http.timeout_seconds, 20);
        assert!((config.llm.temperature - 0.3).abs() < 1e-6);
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.places.base_url, "http://localhost:1234/maps/api");
        assert_eq!(
            config.search.public_base_url.as_deref(),
            Some("https://api.dinescout.test")
        );
    }

    #[test]
    fn test_blank_values_are_ignored() {
        let config = DineScoutConfig::from_env(vars(&[
            ("GEMINI_API_KEY", "   "),
            ("DINESCOUT_SERVER__PORT", ""),
        ]))
        .unwrap();
        assert!(config.llm.api_key.is_none());
        assert_eq!(config.server.port, 8000);
    }

    #[test]
    fn test_unparseable_number_is_rejected() {
        let result = DineScoutConfig::from_env(vars(&[("DINESCOUT_SERVER__PORT", "eighty")]));
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to deserialize configuration")
        );
    }

    #[test]
    fn test_public_base_url_must_be_http() {
        let result = DineScoutConfig::from_env(vars(&[(
            "DINESCOUT_SEARCH__PUBLIC_BASE_URL",
            "api.dinescout.test",
        )]));
        assert!(result.unwrap_err().to_string().contains("Public base URL"));
    }

    #[test]
    fn test_config_validation_invalid_log_level() {
        let mut config = DineScoutConfig::default();
        config.logging.level = "invalid".to_string();
        let result = config.validate();
        assert!(result.unwrap_err().to_string().contains("Invalid log level"));
    }

    #[test]
    fn test_config_validation_numeric_ranges() {
        let mut config = DineScoutConfig::default();
        config.http.timeout_seconds = 500;
        let result = config.validate();
        assert!(result.unwrap_err().to_string().contains("timeout cannot exceed"));

        let mut config = DineScoutConfig::default();
        config.search.default_radius_km = 80.0;
        assert!(config.validate().is_err());

        let mut config = DineScoutConfig::default();
        config.search.time_budget_seconds = 60;
        let result = config.validate();
        assert!(result.unwrap_err().to_string().contains("time budget"));
    }

    #[test]
    fn test_short_api_key_rejected() {
        let mut config = DineScoutConfig::default();
        config.places.api_key = Some("abc".to_string());
        assert!(config.validate_api_keys().is_err());
    }

    #[test]
    fn test_tls_requires_both_files() {
        let mut config = DineScoutConfig::default();
        config.server.tls_cert = Some("cert.pem".to_string());
        assert!(config.validate().unwrap_err().to_string().contains("TLS"));
    }

    #[test]
    fn test_apply_defaults_fills_zeroes() {
        let mut config = DineScoutConfig::default();
        config.search.max_results = 0;
        config.search.default_radius_km = 0.0;
        config.search.time_budget_seconds = 0;
        config.apply_defaults();
        assert_eq!(config.search.max_results, 10);
        assert_eq!(config.search.default_radius_km, 2.0);
        assert_eq!(config.search.time_budget_seconds, 45);
    }
}
