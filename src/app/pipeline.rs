//! Shared wiring used by the CLI commands.
//!
//! Keeping construction in one place avoids duplicating the core workflow:
//! catalog load -> provider choice -> adjuster -> service.

use std::path::Path;

use crate::catalog::RateTable;
use crate::error::AppError;
use crate::io::load_catalog_json;
use crate::location::{
    AdjusterConfig, HttpLocationProvider, LocationAdjuster, LocationInfoProvider,
    StaticLocationProvider,
};
use crate::service::{QuoteConfig, QuoteService};

/// Load the catalog from a JSON file, or fall back to the built-in one.
pub fn load_catalog(path: Option<&Path>) -> Result<RateTable, AppError> {
    match path {
        Some(path) => load_catalog_json(path),
        None => Ok(RateTable::default_catalog()),
    }
}

/// Pick the location provider: the HTTP provider when `LOCATION_API_URL` is
/// configured (and `offline` is not set), the built-in static table
/// otherwise.
pub fn choose_provider(offline: bool) -> Result<Box<dyn LocationInfoProvider>, AppError> {
    dotenvy::dotenv().ok();
    if !offline && std::env::var("LOCATION_API_URL").is_ok() {
        return Ok(Box::new(HttpLocationProvider::from_env()?));
    }
    Ok(Box::new(StaticLocationProvider::builtin()))
}

/// Assemble a quote service.
pub fn build_service(
    catalog_path: Option<&Path>,
    offline: bool,
    config: QuoteConfig,
) -> Result<QuoteService, AppError> {
    let catalog = load_catalog(catalog_path)?;
    let provider = choose_provider(offline)?;
    let adjuster = LocationAdjuster::new(provider, AdjusterConfig::default());
    Ok(QuoteService::new(catalog, adjuster, config))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_builds_a_working_service() {
        let service = build_service(None, true, QuoteConfig::default()).unwrap();
        assert!(!service.describe_catalog().is_empty());
    }
}
