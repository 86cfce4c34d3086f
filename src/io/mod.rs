//! File IO: dataset CSVs, catalog JSON, and model JSON files.

pub mod dataset;
pub mod model_file;

use std::fs::File;
use std::path::Path;

use crate::catalog::{RateTable, ServiceCatalogEntry};
use crate::error::AppError;

/// Load a catalog from a JSON array of [`ServiceCatalogEntry`].
pub fn load_catalog_json(path: &Path) -> Result<RateTable, AppError> {
    let file = File::open(path).map_err(|e| {
        AppError::new(2, format!("Failed to open catalog '{}': {e}", path.display()))
    })?;
    let entries: Vec<ServiceCatalogEntry> = serde_json::from_reader(file)
        .map_err(|e| AppError::new(2, format!("Failed to parse catalog JSON: {e}")))?;
    RateTable::new(entries).map_err(AppError::from)
}
