//! Location/demographic lookup providers.
//!
//! The engine only knows the [`LocationInfoProvider`] trait; the two
//! implementations here are an HTTP client (env-configured endpoint, bounded
//! timeout) and a static in-memory table for offline runs and tests.

use std::collections::HashMap;
use std::time::Duration;

use reqwest::blocking::Client;

use crate::domain::{AreaType, LocationFeatures};
use crate::error::AppError;

/// Bound on the blocking demographic lookup. On timeout the adjuster falls
/// back to its sentinel rather than stalling or failing the quote.
pub const LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

/// Why a lookup produced no usable features.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// The zip code is unknown to the provider (invalid zip).
    NotFound,
    /// Transport or decoding failure (includes timeouts).
    Request(String),
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderError::NotFound => write!(f, "zip code not found"),
            ProviderError::Request(msg) => write!(f, "location lookup failed: {msg}"),
        }
    }
}

impl std::error::Error for ProviderError {}

/// External demographic lookup, keyed by zip code.
pub trait LocationInfoProvider: Send + Sync {
    fn resolve(&self, zip_code: &str) -> Result<LocationFeatures, ProviderError>;
}

/// HTTP provider: `GET {base_url}/{zip}` returning a `LocationFeatures` JSON
/// document, with an optional API key query parameter.
pub struct HttpLocationProvider {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpLocationProvider {
    /// Build from `LOCATION_API_URL` / `LOCATION_API_KEY` (via `.env` if
    /// present).
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        let base_url = std::env::var("LOCATION_API_URL")
            .map_err(|_| AppError::new(2, "Missing LOCATION_API_URL in environment (.env)."))?;
        let api_key = std::env::var("LOCATION_API_KEY").ok();
        Self::new(base_url, api_key)
    }

    pub fn new(base_url: String, api_key: Option<String>) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(LOOKUP_TIMEOUT)
            .build()
            .map_err(|e| AppError::new(4, format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }
}

impl LocationInfoProvider for HttpLocationProvider {
    fn resolve(&self, zip_code: &str) -> Result<LocationFeatures, ProviderError> {
        let url = format!("{}/{}", self.base_url, zip_code);
        let mut req = self.client.get(&url);
        if let Some(key) = &self.api_key {
            req = req.query(&[("api_key", key.as_str())]);
        }

        let resp = req.send().map_err(|e| ProviderError::Request(e.to_string()))?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ProviderError::NotFound);
        }
        if !resp.status().is_success() {
            return Err(ProviderError::Request(format!(
                "status {}",
                resp.status()
            )));
        }

        let features: LocationFeatures = resp
            .json()
            .map_err(|e| ProviderError::Request(format!("bad response body: {e}")))?;
        Ok(features)
    }
}

/// In-memory provider backed by a fixed table. Ships with a handful of demo
/// zips so the tool works offline; tests construct their own tables.
pub struct StaticLocationProvider {
    entries: HashMap<String, LocationFeatures>,
}

impl StaticLocationProvider {
    pub fn new(entries: Vec<LocationFeatures>) -> Self {
        let entries = entries
            .into_iter()
            .map(|f| (f.zip_code.clone(), f))
            .collect();
        Self { entries }
    }

    /// Demo table covering a spread of urban/suburban/rural profiles.
    pub fn builtin() -> Self {
        Self::new(vec![
            demo("10001", "New York", "NY", 168.0, 28_000.0, 780_000.0, 142.0, AreaType::Urban),
            demo("94103", "San Francisco", "CA", 172.0, 19_000.0, 1_050_000.0, 151.0, AreaType::Urban),
            demo("53703", "Madison", "WI", 101.0, 3_400.0, 330_000.0, 103.0, AreaType::Suburban),
            demo("27514", "Chapel Hill", "NC", 104.0, 1_900.0, 420_000.0, 98.0, AreaType::Suburban),
            demo("59718", "Bozeman", "MT", 106.0, 600.0, 560_000.0, 92.0, AreaType::Rural),
            demo("67501", "Hutchinson", "KS", 82.0, 900.0, 110_000.0, 84.0, AreaType::Rural),
        ])
    }
}

impl LocationInfoProvider for StaticLocationProvider {
    fn resolve(&self, zip_code: &str) -> Result<LocationFeatures, ProviderError> {
        self.entries
            .get(zip_code)
            .cloned()
            .ok_or(ProviderError::NotFound)
    }
}

fn demo(
    zip: &str,
    city: &str,
    state: &str,
    col: f64,
    density: f64,
    home_value: f64,
    wage: f64,
    area: AreaType,
) -> LocationFeatures {
    LocationFeatures {
        zip_code: zip.to_string(),
        city: Some(city.to_string()),
        state: Some(state.to_string()),
        cost_of_living_index: col,
        population_density: density,
        median_home_value: home_value,
        wage_index: wage,
        area_type: area,
    }
}
