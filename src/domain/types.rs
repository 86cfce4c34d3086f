//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory while deriving and training
//! - exported to JSON (model files) and CSV (datasets)
//! - asserted on directly in tests

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Canonical feature-column names shared by quote derivation, the dataset
/// loader, and the sample generator.
///
/// Training and prediction only line up when both sides use the same column
/// names, so these live in one place. The dataset loader normalizes CSV
/// headers onto this vocabulary (`"Property Size (sq ft)"` becomes
/// `property_size`, etc.).
pub mod fields {
    pub const SERVICE_TYPE: &str = "service_type";
    pub const TERRAIN_TYPE: &str = "terrain_type";
    pub const SIZE_CATEGORY: &str = "size_category";
    pub const PROPERTY_SIZE: &str = "property_size";
    pub const ZIP_CODE: &str = "zip_code";
    pub const AREA_TYPE: &str = "area_type";
    pub const COST_OF_LIVING_INDEX: &str = "cost_of_living_index";
    pub const POPULATION_DENSITY: &str = "population_density";
    pub const MEDIAN_HOME_VALUE: &str = "median_home_value";
    pub const WAGE_INDEX: &str = "wage_index";
}

/// Default target column name, matching common quote-export spreadsheets.
pub const DEFAULT_TARGET_COLUMN: &str = "Quote ($)";

/// Urban/suburban/rural classification reported by the location provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AreaType {
    Urban,
    Suburban,
    Rural,
}

impl AreaType {
    /// Label used for one-hot encoding and display.
    pub fn label(self) -> &'static str {
        match self {
            AreaType::Urban => "Urban",
            AreaType::Suburban => "Suburban",
            AreaType::Rural => "Rural",
        }
    }
}

/// Demographic features for a zip code, as reported by the external
/// location provider.
///
/// `city`/`state` both absent signals an unknown or invalid zip; the
/// adjuster degrades to its sentinel in that case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationFeatures {
    pub zip_code: String,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    pub cost_of_living_index: f64,
    pub population_density: f64,
    pub median_home_value: f64,
    #[serde(default = "default_wage_index")]
    pub wage_index: f64,
    pub area_type: AreaType,
}

fn default_wage_index() -> f64 {
    100.0
}

impl LocationFeatures {
    pub fn is_resolved(&self) -> bool {
        self.city.is_some() || self.state.is_some()
    }
}

/// Property size as supplied by the user: either a catalog size category
/// (`"Medium"`) or raw square footage (`12000`).
#[derive(Debug, Clone, PartialEq)]
pub enum SizeInput {
    Category(String),
    SquareFeet(f64),
}

impl SizeInput {
    /// Parse user input: numeric text is square footage, anything else is a
    /// category name.
    pub fn parse(raw: &str) -> SizeInput {
        match raw.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => SizeInput::SquareFeet(v),
            _ => SizeInput::Category(raw.trim().to_string()),
        }
    }
}

/// One quote request. Constructed per submission, immutable, consumed once.
#[derive(Debug, Clone, PartialEq)]
pub struct QuoteRequest {
    pub zip_code: String,
    pub service_type: String,
    pub size: SizeInput,
    pub terrain_type: String,
    pub special_requests: Option<String>,
}

impl QuoteRequest {
    /// Whether the special-requests field carries actual content.
    pub fn has_special_requests(&self) -> bool {
        self.special_requests
            .as_deref()
            .is_some_and(|s| !s.trim().is_empty())
    }
}

/// A single raw feature value from a dataset or a derived request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Number(f64),
    Text(String),
}

/// Feature name → value. `BTreeMap` keeps per-row iteration deterministic,
/// which makes the one-hot column ordering reproducible across runs.
pub type FeatureMap = BTreeMap<String, FeatureValue>;

/// One labeled training row: features plus the observed price.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingExample {
    pub features: FeatureMap,
    pub observed_price: f64,
}

/// How the confidence band around a point estimate was computed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BandPolicy {
    /// Fixed percentage band (rule-based variant), e.g. ±10%.
    FixedPct { fraction: f64 },
    /// Statistical band from fit residuals (fitted variant), ±z·σ.
    Statistical { z: f64, residual_std: f64 },
}

/// A computed quote.
///
/// Invariant: `lower_bound <= point_estimate <= upper_bound`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteResult {
    pub point_estimate: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
    /// Which band policy produced the bounds; explicit, never implied.
    pub band: BandPolicy,
}

/// Fit-quality diagnostics reported by the trainer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitMetrics {
    pub mean_absolute_error: f64,
    pub r_squared: f64,
    /// Residual standard deviation; drives the ±z·σ band at quote time.
    pub residual_std: f64,
    pub n_train: usize,
    pub n_holdout: usize,
    /// Ridge penalty chosen by the grid search.
    pub lambda: f64,
    /// True when metrics were computed on the training rows themselves
    /// (no hold-out split possible). In-sample metrics overstate quality.
    pub in_sample: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_input_parses_numbers_and_categories() {
        assert_eq!(SizeInput::parse("12000"), SizeInput::SquareFeet(12000.0));
        assert_eq!(
            SizeInput::parse(" Medium "),
            SizeInput::Category("Medium".to_string())
        );
    }

    #[test]
    fn special_requests_ignore_whitespace() {
        let mut req = QuoteRequest {
            zip_code: "12345".to_string(),
            service_type: "Lawn Care".to_string(),
            size: SizeInput::Category("Medium".to_string()),
            terrain_type: "Flat".to_string(),
            special_requests: Some("   ".to_string()),
        };
        assert!(!req.has_special_requests());
        req.special_requests = Some("extra trimming".to_string());
        assert!(req.has_special_requests());
    }
}
