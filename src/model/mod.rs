//! Estimation model variants.
//!
//! Two variants share one `predict` contract so the quote service can swap
//! between them freely:
//!
//! - [`ActiveModel::RuleBased`]: catalog base cost × location multiplier;
//!   deterministic, requires no training, always available as the fallback.
//! - [`ActiveModel::Fitted`]: a trained regression over the canonical
//!   column schema.
//!
//! The service keeps the fitted model behind an `Arc` so a quote in flight
//! during a retrain sees the old or the new model in its entirety, never a
//! partial update.

use std::sync::Arc;

use crate::domain::FeatureMap;
use crate::error::QuoteError;

pub mod fitted;

pub use fitted::{Column, ColumnSchema, FittedModel};

/// Everything a variant might need to produce a point estimate. The service
/// derives this once per request.
#[derive(Debug, Clone)]
pub struct PredictionInput<'a> {
    /// Catalog base cost with the terrain multiplier already applied.
    pub rated_cost: f64,
    /// Regional multiplier from the location adjuster.
    pub location_multiplier: f64,
    /// Full derived feature map (for the fitted variant).
    pub features: &'a FeatureMap,
}

/// The currently active estimation model.
#[derive(Debug, Clone)]
pub enum ActiveModel {
    RuleBased,
    Fitted(Arc<FittedModel>),
}

impl ActiveModel {
    /// Compute the point estimate for the derived input.
    pub fn predict(&self, input: &PredictionInput<'_>) -> Result<f64, QuoteError> {
        match self {
            ActiveModel::RuleBased => Ok(input.rated_cost * input.location_multiplier),
            ActiveModel::Fitted(model) => {
                let y = model.predict(input.features);
                if !y.is_finite() {
                    return Err(QuoteError::FitFailed(
                        "fitted model produced a non-finite prediction".to_string(),
                    ));
                }
                // A regression can extrapolate below zero for inputs far from
                // its training data; a negative price is never a valid quote.
                Ok(y.max(0.0))
            }
        }
    }

    pub fn is_fitted(&self) -> bool {
        matches!(self, ActiveModel::Fitted(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FeatureValue;

    #[test]
    fn rule_based_multiplies_rated_cost_and_location() {
        let features = FeatureMap::new();
        let input = PredictionInput {
            rated_cost: 120.0,
            location_multiplier: 1.1,
            features: &features,
        };
        let y = ActiveModel::RuleBased.predict(&input).unwrap();
        assert!((y - 132.0).abs() < 1e-12);
    }

    #[test]
    fn fitted_prediction_is_floored_at_zero() {
        let rows = vec![[(
            "property_size".to_string(),
            FeatureValue::Number(1.0),
        )]
        .into_iter()
        .collect::<FeatureMap>()];
        let schema = ColumnSchema::build(rows.iter());
        let model = FittedModel {
            schema,
            intercept: -100.0,
            weights: vec![0.0],
            residual_std: 1.0,
        };
        let features = rows[0].clone();
        let input = PredictionInput {
            rated_cost: 0.0,
            location_multiplier: 1.0,
            features: &features,
        };
        let y = ActiveModel::Fitted(Arc::new(model)).predict(&input).unwrap();
        assert_eq!(y, 0.0);
    }
}
