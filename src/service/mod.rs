//! Quote orchestration.
//!
//! `QuoteService` ties the pieces together: derive features from a request,
//! pick the active model variant, compute the point estimate and confidence
//! band, apply the special-requests surcharge. It also owns the retraining
//! path.
//!
//! The active model is an explicitly owned field (never ambient global
//! state) behind a single-writer `RwLock`. State machine: the service
//! starts `RuleBased`; a successful `retrain` moves it to `Fitted` (and
//! `Fitted` → `Fitted` on later retrains); only an explicit `reset` goes
//! back. A failed retrain leaves the previous model untouched and reports
//! the failure.

use std::sync::{Arc, RwLock};

use crate::catalog::{RateTable, ServiceCatalogEntry};
use crate::domain::{
    fields, BandPolicy, FeatureMap, FeatureValue, FitMetrics, LocationFeatures, QuoteRequest,
    QuoteResult, SizeInput, TrainingExample,
};
use crate::error::QuoteError;
use crate::location::LocationAdjuster;
use crate::model::{ActiveModel, FittedModel, PredictionInput};
use crate::train::{self, TrainOptions};

/// Quote-level tunables. Named configuration rather than inline literals so
/// deployments (and tests) can pin them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuoteConfig {
    /// Flat surcharge applied when the request carries special instructions.
    pub special_request_surcharge: f64,
    /// Half-width of the fixed percentage band (rule-based variant).
    pub fixed_band_fraction: f64,
    /// z-score for the statistical band (fitted variant); 1.96 ≈ 95%.
    pub confidence_z: f64,
}

impl Default for QuoteConfig {
    fn default() -> Self {
        Self {
            special_request_surcharge: 50.0,
            fixed_band_fraction: 0.10,
            confidence_z: 1.96,
        }
    }
}

pub struct QuoteService {
    catalog: RateTable,
    adjuster: LocationAdjuster,
    config: QuoteConfig,
    active: RwLock<Option<Arc<FittedModel>>>,
}

impl QuoteService {
    pub fn new(catalog: RateTable, adjuster: LocationAdjuster, config: QuoteConfig) -> Self {
        Self {
            catalog,
            adjuster,
            config,
            active: RwLock::new(None),
        }
    }

    pub fn config(&self) -> &QuoteConfig {
        &self.config
    }

    /// Catalog entries, for populating input choices.
    pub fn describe_catalog(&self) -> &[ServiceCatalogEntry] {
        self.catalog.entries()
    }

    /// Resolved location features and multiplier for display purposes.
    /// Cached, so calling this alongside `get_quote` costs no extra lookup.
    pub fn location(&self, zip_code: &str) -> (LocationFeatures, f64) {
        self.adjuster.adjust(zip_code)
    }

    /// Snapshot of the currently active model variant.
    pub fn active_model(&self) -> ActiveModel {
        let guard = self.active.read().unwrap_or_else(|e| e.into_inner());
        match guard.as_ref() {
            Some(model) => ActiveModel::Fitted(Arc::clone(model)),
            None => ActiveModel::RuleBased,
        }
    }

    /// Compute a quote for one request.
    pub fn get_quote(&self, request: &QuoteRequest) -> Result<QuoteResult, QuoteError> {
        let service = request.service_type.as_str();
        // Inputs are validated against the catalog in both variants; an
        // unrecognized service must fail loudly, never price as $0.
        if self.catalog.entry(service).is_none() {
            return Err(QuoteError::UnknownService {
                service: service.to_string(),
            });
        }

        let (location, multiplier) = self.adjuster.adjust(&request.zip_code);
        let model = self.active_model();

        let (category, sqft) = match &request.size {
            SizeInput::Category(c) => (Some(c.clone()), None),
            SizeInput::SquareFeet(s) => match self.catalog.categorize_size(service, *s) {
                Ok(c) => (Some(c.to_string()), Some(*s)),
                // The fitted variant can use raw square footage even when the
                // catalog has no size buckets for this service.
                Err(_) if model.is_fitted() => (None, Some(*s)),
                Err(e) => return Err(e),
            },
        };

        let features = derive_feature_map(request, &location, category.as_deref(), sqft);

        let rated_cost = if model.is_fitted() {
            0.0
        } else {
            let cat = category
                .as_deref()
                .ok_or_else(|| QuoteError::UnknownSizeCategory {
                    service: service.to_string(),
                    size: "(none)".to_string(),
                })?;
            self.catalog.lookup(service, cat, &request.terrain_type)?
        };

        let input = PredictionInput {
            rated_cost,
            location_multiplier: multiplier,
            features: &features,
        };
        let mut point = model.predict(&input)?;

        if request.has_special_requests() {
            point += self.config.special_request_surcharge;
        }

        // The band is taken around the surcharge-adjusted point, so the
        // lower/upper invariant holds whatever the surcharge is.
        let (lower, upper, band) = match &model {
            ActiveModel::RuleBased => {
                let f = self.config.fixed_band_fraction;
                (point * (1.0 - f), point * (1.0 + f), BandPolicy::FixedPct { fraction: f })
            }
            ActiveModel::Fitted(m) => {
                let half = self.config.confidence_z * m.residual_std;
                (
                    (point - half).max(0.0),
                    point + half,
                    BandPolicy::Statistical {
                        z: self.config.confidence_z,
                        residual_std: m.residual_std,
                    },
                )
            }
        };

        Ok(QuoteResult {
            point_estimate: point,
            lower_bound: lower,
            upper_bound: upper,
            band,
        })
    }

    /// Fit a new model from labeled examples and swap it in atomically.
    ///
    /// On any training failure the previously active model (rule-based or
    /// fitted) remains in effect.
    pub fn retrain(
        &self,
        examples: &[TrainingExample],
        opts: &TrainOptions,
    ) -> Result<FitMetrics, QuoteError> {
        let (model, metrics) = train::fit(examples, opts)?;
        let mut guard = self.active.write().unwrap_or_else(|e| e.into_inner());
        *guard = Some(Arc::new(model));
        Ok(metrics)
    }

    /// Explicitly drop the fitted model and return to rule-based pricing.
    pub fn reset(&self) {
        let mut guard = self.active.write().unwrap_or_else(|e| e.into_inner());
        *guard = None;
    }

    /// Install a previously exported model (e.g. loaded from a model file).
    pub fn install_model(&self, model: FittedModel) {
        let mut guard = self.active.write().unwrap_or_else(|e| e.into_inner());
        *guard = Some(Arc::new(model));
    }

    /// The active fitted model, for export. Errors when the service is still
    /// rule-based.
    pub fn export_model(&self) -> Result<Arc<FittedModel>, QuoteError> {
        match self.active_model() {
            ActiveModel::Fitted(model) => Ok(model),
            ActiveModel::RuleBased => Err(QuoteError::ModelNotTrained),
        }
    }
}

/// Derive the feature map for a request: request fields plus location
/// demographics, named with the canonical vocabulary so they line up with
/// trained column schemas.
fn derive_feature_map(
    request: &QuoteRequest,
    location: &LocationFeatures,
    size_category: Option<&str>,
    sqft: Option<f64>,
) -> FeatureMap {
    let mut features = FeatureMap::new();
    features.insert(
        fields::SERVICE_TYPE.to_string(),
        FeatureValue::Text(request.service_type.clone()),
    );
    features.insert(
        fields::TERRAIN_TYPE.to_string(),
        FeatureValue::Text(request.terrain_type.clone()),
    );
    features.insert(
        fields::ZIP_CODE.to_string(),
        FeatureValue::Text(request.zip_code.clone()),
    );
    features.insert(
        fields::AREA_TYPE.to_string(),
        FeatureValue::Text(location.area_type.label().to_string()),
    );
    if let Some(category) = size_category {
        features.insert(
            fields::SIZE_CATEGORY.to_string(),
            FeatureValue::Text(category.to_string()),
        );
    }
    if let Some(sqft) = sqft {
        features.insert(fields::PROPERTY_SIZE.to_string(), FeatureValue::Number(sqft));
    }
    features.insert(
        fields::COST_OF_LIVING_INDEX.to_string(),
        FeatureValue::Number(location.cost_of_living_index),
    );
    features.insert(
        fields::POPULATION_DENSITY.to_string(),
        FeatureValue::Number(location.population_density),
    );
    features.insert(
        fields::MEDIAN_HOME_VALUE.to_string(),
        FeatureValue::Number(location.median_home_value),
    );
    features.insert(
        fields::WAGE_INDEX.to_string(),
        FeatureValue::Number(location.wage_index),
    );
    features
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::{AdjusterConfig, StaticLocationProvider};

    /// Service with an empty provider table: every zip degrades to the
    /// sentinel, so the location multiplier is exactly 1.0.
    fn neutral_service() -> QuoteService {
        let adjuster = LocationAdjuster::new(
            Box::new(StaticLocationProvider::new(Vec::new())),
            AdjusterConfig::default(),
        );
        QuoteService::new(RateTable::default_catalog(), adjuster, QuoteConfig::default())
    }

    fn lawn_request(special: Option<&str>) -> QuoteRequest {
        QuoteRequest {
            zip_code: "00000".to_string(),
            service_type: "Lawn Care".to_string(),
            size: SizeInput::Category("Medium".to_string()),
            terrain_type: "Sloped".to_string(),
            special_requests: special.map(str::to_string),
        }
    }

    fn training_rows() -> Vec<TrainingExample> {
        let mut rows = Vec::new();
        for i in 1..=8 {
            let sqft = 2_000.0 * i as f64;
            let mut features = FeatureMap::new();
            features.insert(
                fields::SERVICE_TYPE.to_string(),
                FeatureValue::Text("Lawn Care".to_string()),
            );
            features.insert(
                fields::PROPERTY_SIZE.to_string(),
                FeatureValue::Number(sqft),
            );
            rows.push(TrainingExample {
                features,
                observed_price: 40.0 + 0.04 * sqft,
            });
        }
        rows
    }

    #[test]
    fn rule_based_scenario_matches_catalog_math() {
        // 100 (Medium) * 1.2 (Sloped) * 1.0 (sentinel location) = 120.
        let service = neutral_service();
        let quote = service.get_quote(&lawn_request(None)).unwrap();
        assert!((quote.point_estimate - 120.0).abs() < 1e-9);
        assert!((quote.lower_bound - 108.0).abs() < 1e-9);
        assert!((quote.upper_bound - 132.0).abs() < 1e-9);
        assert!(matches!(quote.band, BandPolicy::FixedPct { .. }));
    }

    #[test]
    fn special_requests_add_the_configured_surcharge() {
        let service = neutral_service();
        let quote = service
            .get_quote(&lawn_request(Some("extra trimming")))
            .unwrap();
        assert!((quote.point_estimate - 170.0).abs() < 1e-9);
        assert!(quote.lower_bound <= quote.point_estimate);
        assert!(quote.point_estimate <= quote.upper_bound);
    }

    #[test]
    fn unknown_service_fails_instead_of_quoting_zero() {
        let service = neutral_service();
        let mut request = lawn_request(None);
        request.service_type = "Pool Cleaning".to_string();
        let err = service.get_quote(&request).unwrap_err();
        assert_eq!(
            err,
            QuoteError::UnknownService {
                service: "Pool Cleaning".to_string()
            }
        );
    }

    #[test]
    fn quotes_are_idempotent_without_retrain() {
        let service = neutral_service();
        let request = lawn_request(Some("gate code 4411"));
        let a = service.get_quote(&request).unwrap();
        let b = service.get_quote(&request).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn empty_retrain_fails_and_keeps_rule_based_pricing() {
        let service = neutral_service();
        let err = service.retrain(&[], &TrainOptions::default()).unwrap_err();
        assert_eq!(err, QuoteError::EmptyDataset);
        assert!(!service.active_model().is_fitted());

        let quote = service.get_quote(&lawn_request(None)).unwrap();
        assert!((quote.point_estimate - 120.0).abs() < 1e-9);
    }

    #[test]
    fn successful_retrain_switches_to_the_statistical_band() {
        let service = neutral_service();
        let metrics = service
            .retrain(&training_rows(), &TrainOptions::default())
            .unwrap();
        assert!(service.active_model().is_fitted());

        let mut request = lawn_request(None);
        request.size = SizeInput::SquareFeet(10_000.0);
        let quote = service.get_quote(&request).unwrap();
        assert!(matches!(quote.band, BandPolicy::Statistical { .. }));
        assert!(quote.lower_bound <= quote.point_estimate);
        assert!(quote.point_estimate <= quote.upper_bound);

        // Noise-free training data: the prediction lands within the fit
        // residual tolerance of the generating rule.
        let expected = 40.0 + 0.04 * 10_000.0;
        let tolerance = metrics.residual_std.max(1e-6) * 3.0 + 1e-6;
        assert!(
            (quote.point_estimate - expected).abs() <= tolerance,
            "got {} vs expected {expected}",
            quote.point_estimate
        );
    }

    #[test]
    fn failed_retrain_keeps_the_previous_fitted_model() {
        let service = neutral_service();
        service
            .retrain(&training_rows(), &TrainOptions::default())
            .unwrap();
        let before = service.export_model().unwrap();

        let mut bad = training_rows();
        bad[0].observed_price = -1.0;
        let err = service.retrain(&bad, &TrainOptions::default()).unwrap_err();
        assert!(matches!(err, QuoteError::InvalidRow { .. }));

        let after = service.export_model().unwrap();
        assert!(Arc::ptr_eq(&before, &after));
    }

    #[test]
    fn reset_returns_to_rule_based() {
        let service = neutral_service();
        service
            .retrain(&training_rows(), &TrainOptions::default())
            .unwrap();
        service.reset();
        assert!(!service.active_model().is_fitted());
        assert!(matches!(
            service.export_model().unwrap_err(),
            QuoteError::ModelNotTrained
        ));
    }

    #[test]
    fn unresolved_zip_still_produces_a_valid_quote() {
        let service = neutral_service();
        let (features, multiplier) = service.location("99999");
        assert_eq!(multiplier, 1.0);
        assert!(!features.is_resolved());
        let quote = service.get_quote(&lawn_request(None)).unwrap();
        assert!(quote.lower_bound <= quote.point_estimate);
        assert!(quote.point_estimate <= quote.upper_bound);
    }
}
