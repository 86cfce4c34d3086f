//! Read/write model JSON files.
//!
//! A model file is the portable representation of a fitted model:
//! - the canonical column schema and learned weights
//! - the fit metrics recorded at training time
//! - tool tag + training date for provenance
//!
//! Persistence is an optional extension: nothing in the engine requires a
//! model to survive a process restart.

use std::fs::File;
use std::path::Path;

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::domain::FitMetrics;
use crate::error::AppError;
use crate::model::FittedModel;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelFile {
    pub tool: String,
    pub trained_at: NaiveDate,
    pub model: FittedModel,
    pub metrics: FitMetrics,
}

/// Write a model JSON file.
pub fn write_model_json(
    path: &Path,
    model: &FittedModel,
    metrics: &FitMetrics,
) -> Result<(), AppError> {
    let file = File::create(path).map_err(|e| {
        AppError::new(2, format!("Failed to create model file '{}': {e}", path.display()))
    })?;

    let doc = ModelFile {
        tool: "quotecast".to_string(),
        trained_at: Local::now().date_naive(),
        model: model.clone(),
        metrics: metrics.clone(),
    };

    serde_json::to_writer_pretty(file, &doc)
        .map_err(|e| AppError::new(2, format!("Failed to write model JSON: {e}")))?;
    Ok(())
}

/// Read a model JSON file.
pub fn read_model_json(path: &Path) -> Result<ModelFile, AppError> {
    let file = File::open(path).map_err(|e| {
        AppError::new(2, format!("Failed to open model file '{}': {e}", path.display()))
    })?;
    serde_json::from_reader(file)
        .map_err(|e| AppError::new(2, format!("Failed to parse model JSON: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FeatureMap, FeatureValue};
    use crate::model::ColumnSchema;

    #[test]
    fn model_file_round_trips() {
        let rows = vec![[(
            "property_size".to_string(),
            FeatureValue::Number(1.0),
        )]
        .into_iter()
        .collect::<FeatureMap>()];
        let model = FittedModel {
            schema: ColumnSchema::build(rows.iter()),
            intercept: 12.5,
            weights: vec![0.04],
            residual_std: 3.0,
        };
        let metrics = FitMetrics {
            mean_absolute_error: 2.0,
            r_squared: 0.98,
            residual_std: 3.0,
            n_train: 16,
            n_holdout: 4,
            lambda: 0.01,
            in_sample: false,
        };

        let path = std::env::temp_dir().join(format!(
            "quotecast_model_roundtrip_{}.json",
            std::process::id()
        ));
        write_model_json(&path, &model, &metrics).unwrap();
        let loaded = read_model_json(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded.tool, "quotecast");
        assert_eq!(loaded.model, model);
        assert_eq!(loaded.metrics, metrics);
    }
}
