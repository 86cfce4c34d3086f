//! Service catalog and rate table.
//!
//! The rate table is the rule-based pricing source: a static (or JSON-loaded)
//! mapping from (service, size category, terrain) to a base cost. Lookups are
//! pure; unknown services and size categories are reportable errors, never a
//! silent `$0`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::QuoteError;

/// Terrain multiplier used when the requested terrain has no configured
/// entry. A lenient fallback by contract: terrain selection is optional.
pub const DEFAULT_TERRAIN_MULTIPLIER: f64 = 1.0;

/// One catalog entry.
///
/// `size_categories` is ordered smallest-first. `size_sqft_breaks`, when
/// present, buckets a raw square footage into a category: `breaks[i]` is the
/// exclusive upper bound of `size_categories[i]`, so it must have exactly
/// one fewer element than `size_categories`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceCatalogEntry {
    pub service_name: String,
    pub size_categories: Vec<String>,
    pub base_cost: HashMap<String, f64>,
    #[serde(default)]
    pub terrain_multiplier: HashMap<String, f64>,
    #[serde(default)]
    pub size_sqft_breaks: Vec<f64>,
}

impl ServiceCatalogEntry {
    /// Map a square footage onto a size category using the configured breaks.
    pub fn categorize_sqft(&self, sqft: f64) -> Option<&str> {
        if self.size_sqft_breaks.is_empty() || self.size_categories.is_empty() {
            return None;
        }
        for (i, &upper) in self.size_sqft_breaks.iter().enumerate() {
            if sqft < upper {
                return self.size_categories.get(i).map(String::as_str);
            }
        }
        self.size_categories.last().map(String::as_str)
    }
}

/// The full rate table.
#[derive(Debug, Clone)]
pub struct RateTable {
    entries: Vec<ServiceCatalogEntry>,
}

impl RateTable {
    /// Build a rate table, validating entry consistency up front so lookups
    /// never hit a half-configured entry.
    pub fn new(entries: Vec<ServiceCatalogEntry>) -> Result<Self, QuoteError> {
        for entry in &entries {
            for category in &entry.size_categories {
                if !entry.base_cost.contains_key(category) {
                    return Err(QuoteError::InvalidCatalog(format!(
                        "entry '{}' has no base cost for size category '{category}'",
                        entry.service_name
                    )));
                }
            }
            if !entry.size_sqft_breaks.is_empty() {
                let expected = entry.size_categories.len().saturating_sub(1);
                if entry.size_sqft_breaks.len() != expected {
                    return Err(QuoteError::InvalidCatalog(format!(
                        "entry '{}' has {} size breaks for {} categories",
                        entry.service_name,
                        entry.size_sqft_breaks.len(),
                        entry.size_categories.len()
                    )));
                }
                if entry
                    .size_sqft_breaks
                    .windows(2)
                    .any(|w| !(w[0] < w[1]) || !w[0].is_finite())
                {
                    return Err(QuoteError::InvalidCatalog(format!(
                        "entry '{}' size breaks must be finite and ascending",
                        entry.service_name
                    )));
                }
            }
        }
        Ok(Self { entries })
    }

    /// The built-in demo catalog.
    pub fn default_catalog() -> Self {
        let entries = vec![
            ServiceCatalogEntry {
                service_name: "Lawn Care".to_string(),
                size_categories: str_vec(&["Small", "Medium", "Large"]),
                base_cost: cost_map(&[("Small", 50.0), ("Medium", 100.0), ("Large", 200.0)]),
                terrain_multiplier: cost_map(&[("Flat", 1.0), ("Sloped", 1.2), ("Rocky", 1.3)]),
                size_sqft_breaks: vec![5_000.0, 12_000.0],
            },
            ServiceCatalogEntry {
                service_name: "Gutter Cleaning".to_string(),
                size_categories: str_vec(&["Small", "Medium", "Large"]),
                base_cost: cost_map(&[("Small", 80.0), ("Medium", 130.0), ("Large", 210.0)]),
                terrain_multiplier: cost_map(&[("Flat", 1.0), ("Sloped", 1.15)]),
                size_sqft_breaks: vec![1_500.0, 3_000.0],
            },
            ServiceCatalogEntry {
                service_name: "Pressure Washing".to_string(),
                size_categories: str_vec(&["Small", "Medium", "Large"]),
                base_cost: cost_map(&[("Small", 90.0), ("Medium", 160.0), ("Large", 260.0)]),
                terrain_multiplier: cost_map(&[("Flat", 1.0), ("Sloped", 1.1), ("Rocky", 1.25)]),
                size_sqft_breaks: vec![1_000.0, 2_500.0],
            },
        ];
        // The built-in catalog is complete by construction.
        Self::new(entries).unwrap_or_else(|_| Self { entries: Vec::new() })
    }

    /// Look up the rule-based cost: configured base cost for the size
    /// category, multiplied by the configured terrain multiplier (or the
    /// explicit `1.0` fallback for unconfigured terrains).
    pub fn lookup(
        &self,
        service_type: &str,
        size_category: &str,
        terrain_type: &str,
    ) -> Result<f64, QuoteError> {
        let entry = self
            .entry(service_type)
            .ok_or_else(|| QuoteError::UnknownService {
                service: service_type.to_string(),
            })?;

        if !entry.size_categories.iter().any(|c| c == size_category) {
            return Err(QuoteError::UnknownSizeCategory {
                service: service_type.to_string(),
                size: size_category.to_string(),
            });
        }
        let base = entry.base_cost.get(size_category).copied().ok_or_else(|| {
            QuoteError::UnknownSizeCategory {
                service: service_type.to_string(),
                size: size_category.to_string(),
            }
        })?;

        let terrain = entry
            .terrain_multiplier
            .get(terrain_type)
            .copied()
            .unwrap_or(DEFAULT_TERRAIN_MULTIPLIER);

        Ok(base * terrain)
    }

    /// Resolve a size category for a service from raw square footage.
    pub fn categorize_size(&self, service_type: &str, sqft: f64) -> Result<&str, QuoteError> {
        let entry = self
            .entry(service_type)
            .ok_or_else(|| QuoteError::UnknownService {
                service: service_type.to_string(),
            })?;
        entry
            .categorize_sqft(sqft)
            .ok_or_else(|| QuoteError::UnknownSizeCategory {
                service: service_type.to_string(),
                size: format!("{sqft} sq ft (no size breaks configured)"),
            })
    }

    pub fn entry(&self, service_type: &str) -> Option<&ServiceCatalogEntry> {
        self.entries.iter().find(|e| e.service_name == service_type)
    }

    pub fn entries(&self) -> &[ServiceCatalogEntry] {
        &self.entries
    }
}

fn str_vec(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn cost_map(pairs: &[(&str, f64)]) -> HashMap<String, f64> {
    pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_applies_base_cost_and_terrain() {
        let table = RateTable::default_catalog();
        let cost = table.lookup("Lawn Care", "Medium", "Sloped").unwrap();
        assert!((cost - 120.0).abs() < 1e-12);

        let flat = table.lookup("Lawn Care", "Small", "Flat").unwrap();
        assert!((flat - 50.0).abs() < 1e-12);
    }

    #[test]
    fn unknown_terrain_falls_back_to_one() {
        let table = RateTable::default_catalog();
        let cost = table.lookup("Lawn Care", "Large", "Swampy").unwrap();
        assert!((cost - 200.0).abs() < 1e-12);
    }

    #[test]
    fn unknown_service_is_an_error() {
        let table = RateTable::default_catalog();
        let err = table.lookup("Pool Cleaning", "Medium", "Flat").unwrap_err();
        assert_eq!(
            err,
            QuoteError::UnknownService {
                service: "Pool Cleaning".to_string()
            }
        );
    }

    #[test]
    fn unknown_size_category_is_an_error() {
        let table = RateTable::default_catalog();
        let err = table.lookup("Lawn Care", "Gigantic", "Flat").unwrap_err();
        assert!(matches!(err, QuoteError::UnknownSizeCategory { .. }));
    }

    #[test]
    fn sqft_buckets_into_categories() {
        let table = RateTable::default_catalog();
        assert_eq!(table.categorize_size("Lawn Care", 3_000.0).unwrap(), "Small");
        assert_eq!(table.categorize_size("Lawn Care", 8_000.0).unwrap(), "Medium");
        assert_eq!(table.categorize_size("Lawn Care", 50_000.0).unwrap(), "Large");
    }

    #[test]
    fn new_rejects_missing_base_cost() {
        let entry = ServiceCatalogEntry {
            service_name: "Snow Removal".to_string(),
            size_categories: str_vec(&["Small", "Large"]),
            base_cost: cost_map(&[("Small", 40.0)]),
            terrain_multiplier: HashMap::new(),
            size_sqft_breaks: Vec::new(),
        };
        assert!(RateTable::new(vec![entry]).is_err());
    }
}
