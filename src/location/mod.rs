//! Regional cost adjustment from zip-code demographics.
//!
//! The adjuster turns a zip code into a scalar multiplier on the base price:
//! a weighted linear combination of normalized demographic indices, scaled by
//! an area-type factor. Weights, normalization divisors, the area factors,
//! the clamp range, and the fallback multiplier are all named configuration
//! so they can be tuned (and asserted on in tests) without touching logic.
//!
//! Lookups are blocking with a bounded timeout; any failure (unknown zip,
//! transport error, timeout, or a response with no city/state) degrades to
//! a Suburban sentinel with multiplier exactly [`AdjusterConfig::fallback_multiplier`].
//! Estimation never aborts because the location service is unavailable.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::domain::{AreaType, LocationFeatures};

pub mod provider;

pub use provider::{HttpLocationProvider, LocationInfoProvider, ProviderError, StaticLocationProvider};

/// Relative weights of each demographic index. Must sum to 1.0 so that a
/// perfectly average location yields a multiplier of exactly 1.0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdjusterWeights {
    pub cost_of_living: f64,
    pub home_value: f64,
    pub density: f64,
    pub wage: f64,
}

impl Default for AdjusterWeights {
    fn default() -> Self {
        Self {
            cost_of_living: 0.4,
            home_value: 0.3,
            density: 0.2,
            wage: 0.1,
        }
    }
}

impl AdjusterWeights {
    pub fn sum(&self) -> f64 {
        self.cost_of_living + self.home_value + self.density + self.wage
    }
}

/// Normalization divisors: the "national average" value of each index, i.e.
/// the input at which that index contributes a neutral 1.0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdjusterNorms {
    pub cost_of_living_index: f64,
    pub median_home_value: f64,
    pub population_density: f64,
    pub wage_index: f64,
}

impl Default for AdjusterNorms {
    fn default() -> Self {
        Self {
            cost_of_living_index: 100.0,
            median_home_value: 350_000.0,
            population_density: 1_500.0,
            wage_index: 100.0,
        }
    }
}

/// Full adjuster configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdjusterConfig {
    pub weights: AdjusterWeights,
    pub norms: AdjusterNorms,
    /// Multiplier applied on top of the index blend per area type.
    pub urban_factor: f64,
    pub suburban_factor: f64,
    pub rural_factor: f64,
    /// Clamp range for the final multiplier.
    pub multiplier_min: f64,
    pub multiplier_max: f64,
    /// Multiplier returned when the zip cannot be resolved.
    pub fallback_multiplier: f64,
}

impl Default for AdjusterConfig {
    fn default() -> Self {
        Self {
            weights: AdjusterWeights::default(),
            norms: AdjusterNorms::default(),
            urban_factor: 1.10,
            suburban_factor: 1.00,
            rural_factor: 0.92,
            multiplier_min: 0.5,
            multiplier_max: 2.5,
            fallback_multiplier: 1.0,
        }
    }
}

impl AdjusterConfig {
    fn area_factor(&self, area: AreaType) -> f64 {
        match area {
            AreaType::Urban => self.urban_factor,
            AreaType::Suburban => self.suburban_factor,
            AreaType::Rural => self.rural_factor,
        }
    }
}

/// Maps a zip code to `(LocationFeatures, multiplier)` via the configured
/// provider, caching results so repeated quotes for the same zip do not
/// re-issue the external call.
pub struct LocationAdjuster {
    provider: Box<dyn LocationInfoProvider>,
    config: AdjusterConfig,
    cache: Mutex<HashMap<String, (LocationFeatures, f64)>>,
}

impl LocationAdjuster {
    pub fn new(provider: Box<dyn LocationInfoProvider>, config: AdjusterConfig) -> Self {
        Self {
            provider,
            config,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &AdjusterConfig {
        &self.config
    }

    /// Resolve a zip code into demographic features and a cost multiplier.
    ///
    /// Never fails: unresolved or malformed lookups return the sentinel.
    pub fn adjust(&self, zip_code: &str) -> (LocationFeatures, f64) {
        {
            let cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(hit) = cache.get(zip_code) {
                return hit.clone();
            }
        }

        let result = match self.provider.resolve(zip_code) {
            Ok(features) if features.is_resolved() => {
                let multiplier = self.multiplier_for(&features);
                (features, multiplier)
            }
            // A "resolved" response with neither city nor state is an
            // unknown zip in disguise.
            Ok(_) | Err(_) => (self.sentinel(zip_code), self.config.fallback_multiplier),
        };

        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        cache.insert(zip_code.to_string(), result.clone());
        result
    }

    /// The weighted-index multiplier for resolved features.
    fn multiplier_for(&self, features: &LocationFeatures) -> f64 {
        let w = &self.config.weights;
        let n = &self.config.norms;

        let blend = w.cost_of_living * (features.cost_of_living_index / n.cost_of_living_index)
            + w.home_value * (features.median_home_value / n.median_home_value)
            + w.density * (features.population_density / n.population_density)
            + w.wage * (features.wage_index / n.wage_index);

        let raw = blend * self.config.area_factor(features.area_type);
        raw.clamp(self.config.multiplier_min, self.config.multiplier_max)
    }

    /// Sentinel features for an unresolved zip: Suburban, national-average
    /// indices, no city/state.
    fn sentinel(&self, zip_code: &str) -> LocationFeatures {
        let n = &self.config.norms;
        LocationFeatures {
            zip_code: zip_code.to_string(),
            city: None,
            state: None,
            cost_of_living_index: n.cost_of_living_index,
            population_density: n.population_density,
            median_home_value: n.median_home_value,
            wage_index: n.wage_index,
            area_type: AreaType::Suburban,
        }
    }
}
