//! Synthetic training-dataset generation from the rate table.
//!
//! Produces labeled rows whose prices follow the catalog's rule-based
//! structure plus regional spread and multiplicative noise, so the training
//! path can be exercised offline and the fitted model has real signal to
//! recover. Generation is fully seeded and deterministic.

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::catalog::{RateTable, DEFAULT_TERRAIN_MULTIPLIER};
use crate::domain::{fields, FeatureMap, FeatureValue, TrainingExample};
use crate::error::AppError;

/// Zip codes used for synthetic rows, with the regional multiplier baked
/// into the generated price. Matches the built-in static provider's zips so
/// generated datasets stay consistent with offline quoting.
const SAMPLE_ZIPS: &[(&str, f64)] = &[
    ("10001", 1.45),
    ("94103", 1.55),
    ("53703", 1.02),
    ("27514", 1.05),
    ("59718", 0.95),
    ("67501", 0.78),
];

#[derive(Debug, Clone)]
pub struct SampleOptions {
    pub count: usize,
    pub seed: u64,
    /// Std dev of the multiplicative log-normal price noise.
    pub noise_std: f64,
}

impl Default for SampleOptions {
    fn default() -> Self {
        Self {
            count: 200,
            seed: 42,
            noise_std: 0.08,
        }
    }
}

/// Generate a synthetic labeled dataset against the given catalog.
pub fn generate_examples(
    catalog: &RateTable,
    opts: &SampleOptions,
) -> Result<Vec<TrainingExample>, AppError> {
    if opts.count == 0 {
        return Err(AppError::new(2, "Sample count must be > 0."));
    }
    if !(opts.noise_std.is_finite() && opts.noise_std >= 0.0) {
        return Err(AppError::new(2, "Sample noise std must be finite and non-negative."));
    }
    if catalog.entries().is_empty() {
        return Err(AppError::new(2, "Cannot sample from an empty catalog."));
    }

    let mut rng = StdRng::seed_from_u64(opts.seed);
    let normal = Normal::new(0.0, opts.noise_std.max(1e-12))
        .map_err(|e| AppError::new(4, format!("Noise distribution error: {e}")))?;

    let mut out = Vec::with_capacity(opts.count);
    for _ in 0..opts.count {
        let entry = &catalog.entries()[rng.gen_range(0..catalog.entries().len())];
        let category_idx = rng.gen_range(0..entry.size_categories.len());
        let category = entry.size_categories[category_idx].clone();

        // Terrain keys sorted so draws are deterministic across runs.
        let mut terrains: Vec<&String> = entry.terrain_multiplier.keys().collect();
        terrains.sort();
        let terrain = if terrains.is_empty() {
            "Flat".to_string()
        } else {
            terrains[rng.gen_range(0..terrains.len())].clone()
        };

        let sqft = sample_sqft(entry.size_sqft_breaks.as_slice(), category_idx, &mut rng);
        let (zip, regional) = SAMPLE_ZIPS[rng.gen_range(0..SAMPLE_ZIPS.len())];

        let base = entry
            .base_cost
            .get(&category)
            .copied()
            .unwrap_or_default();
        let terrain_mult = entry
            .terrain_multiplier
            .get(&terrain)
            .copied()
            .unwrap_or(DEFAULT_TERRAIN_MULTIPLIER);
        let noise: f64 = normal.sample(&mut rng);
        let price = (base * terrain_mult * regional * noise.exp()).max(1.0);

        let mut features = FeatureMap::new();
        features.insert(
            fields::SERVICE_TYPE.to_string(),
            FeatureValue::Text(entry.service_name.clone()),
        );
        features.insert(
            fields::SIZE_CATEGORY.to_string(),
            FeatureValue::Text(category),
        );
        features.insert(
            fields::TERRAIN_TYPE.to_string(),
            FeatureValue::Text(terrain),
        );
        features.insert(fields::ZIP_CODE.to_string(), FeatureValue::Text(zip.to_string()));
        if let Some(sqft) = sqft {
            features.insert(
                fields::PROPERTY_SIZE.to_string(),
                FeatureValue::Number(sqft),
            );
        }

        out.push(TrainingExample {
            features,
            observed_price: price,
        });
    }

    Ok(out)
}

/// Draw a square footage consistent with the chosen size bucket.
fn sample_sqft(breaks: &[f64], category_idx: usize, rng: &mut StdRng) -> Option<f64> {
    if breaks.is_empty() {
        return None;
    }
    let (lo, hi) = if category_idx == 0 {
        (breaks[0] * 0.2, breaks[0])
    } else if category_idx <= breaks.len() {
        let lo = breaks[category_idx - 1];
        let hi = breaks.get(category_idx).copied().unwrap_or(lo * 2.0);
        (lo, hi)
    } else {
        let last = *breaks.last()?;
        (last, last * 2.0)
    };
    if !(hi > lo) {
        return Some(lo);
    }
    Some((rng.gen_range(lo..hi)).round())
}
