//! Formatted terminal output.
//!
//! Formatting lives in one place so the pricing code stays clean and
//! testable, and output changes stay localized.

use crate::catalog::ServiceCatalogEntry;
use crate::domain::{BandPolicy, FitMetrics, LocationFeatures, QuoteRequest, QuoteResult, SizeInput};

/// Format a full quote summary.
pub fn format_quote(
    request: &QuoteRequest,
    location: &LocationFeatures,
    multiplier: f64,
    quote: &QuoteResult,
) -> String {
    let mut out = String::new();

    out.push_str("=== quotecast - Service Quote ===\n");
    out.push_str(&format!(
        "Service: {} | Size: {} | Terrain: {}\n",
        request.service_type,
        fmt_size(&request.size),
        request.terrain_type
    ));

    if location.is_resolved() {
        let city = location.city.as_deref().unwrap_or("?");
        let state = location.state.as_deref().unwrap_or("?");
        out.push_str(&format!(
            "Location: {} ({city}, {state}, {}) | multiplier {multiplier:.3}\n",
            location.zip_code,
            location.area_type.label()
        ));
    } else {
        out.push_str(&format!(
            "Location: {} (lookup unavailable; using suburban defaults, multiplier {multiplier:.2})\n",
            location.zip_code
        ));
    }

    if request.has_special_requests() {
        out.push_str(&format!(
            "Special requests: {}\n",
            request.special_requests.as_deref().unwrap_or("")
        ));
    }

    out.push('\n');
    out.push_str(&format!("Estimate: ${:.2}\n", quote.point_estimate));
    out.push_str(&format!(
        "Range   : ${:.2} to ${:.2}\n",
        quote.lower_bound, quote.upper_bound
    ));
    out.push_str(&format!("Band    : {}\n", fmt_band(&quote.band)));

    out
}

/// Format training diagnostics.
pub fn format_fit_report(metrics: &FitMetrics) -> String {
    let mut out = String::new();

    out.push_str("=== quotecast - Model Fit ===\n");
    out.push_str(&format!(
        "Rows: train={} holdout={}\n",
        metrics.n_train, metrics.n_holdout
    ));
    out.push_str(&format!("Ridge lambda: {}\n", metrics.lambda));
    out.push_str(&format!("MAE : ${:.2}\n", metrics.mean_absolute_error));
    out.push_str(&format!("R^2 : {:.4}\n", metrics.r_squared));
    out.push_str(&format!("Residual std: ${:.2}\n", metrics.residual_std));
    if metrics.in_sample {
        out.push_str(
            "Note: metrics are in-sample (dataset too small for a hold-out split); \
             they overstate out-of-sample quality.\n",
        );
    }

    out
}

/// Format the service catalog as a table.
pub fn format_catalog(entries: &[ServiceCatalogEntry]) -> String {
    let mut out = String::new();

    out.push_str("=== quotecast - Service Catalog ===\n");
    for entry in entries {
        out.push_str(&format!("\n{}\n", entry.service_name));
        for category in &entry.size_categories {
            let cost = entry.base_cost.get(category).copied().unwrap_or_default();
            out.push_str(&format!("  {:<10} ${:.2}\n", category, cost));
        }
        if !entry.terrain_multiplier.is_empty() {
            let mut terrains: Vec<(&String, &f64)> = entry.terrain_multiplier.iter().collect();
            terrains.sort_by(|a, b| a.0.cmp(b.0));
            let parts: Vec<String> = terrains
                .iter()
                .map(|(name, mult)| format!("{name} x{mult:.2}"))
                .collect();
            out.push_str(&format!("  terrain: {}\n", parts.join(", ")));
        }
    }

    out
}

fn fmt_size(size: &SizeInput) -> String {
    match size {
        SizeInput::Category(c) => c.clone(),
        SizeInput::SquareFeet(s) => format!("{s} sq ft"),
    }
}

fn fmt_band(band: &BandPolicy) -> String {
    match band {
        BandPolicy::FixedPct { fraction } => format!("fixed +/-{:.0}%", fraction * 100.0),
        BandPolicy::Statistical { z, residual_std } => {
            format!("statistical +/-{z:.2} sigma (sigma=${residual_std:.2})")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::RateTable;
    use crate::domain::AreaType;

    #[test]
    fn quote_summary_mentions_estimate_and_band() {
        let request = QuoteRequest {
            zip_code: "00000".to_string(),
            service_type: "Lawn Care".to_string(),
            size: SizeInput::Category("Medium".to_string()),
            terrain_type: "Sloped".to_string(),
            special_requests: None,
        };
        let location = LocationFeatures {
            zip_code: "00000".to_string(),
            city: None,
            state: None,
            cost_of_living_index: 100.0,
            population_density: 1_500.0,
            median_home_value: 350_000.0,
            wage_index: 100.0,
            area_type: AreaType::Suburban,
        };
        let quote = QuoteResult {
            point_estimate: 120.0,
            lower_bound: 108.0,
            upper_bound: 132.0,
            band: BandPolicy::FixedPct { fraction: 0.10 },
        };

        let text = format_quote(&request, &location, 1.0, &quote);
        assert!(text.contains("$120.00"));
        assert!(text.contains("$108.00 to $132.00"));
        assert!(text.contains("fixed +/-10%"));
        assert!(text.contains("lookup unavailable"));
    }

    #[test]
    fn fit_report_flags_in_sample_metrics() {
        let metrics = FitMetrics {
            mean_absolute_error: 4.2,
            r_squared: 0.97,
            residual_std: 6.1,
            n_train: 10,
            n_holdout: 0,
            lambda: 0.0,
            in_sample: true,
        };
        let text = format_fit_report(&metrics);
        assert!(text.contains("in-sample"));
        assert!(text.contains("$4.20"));
    }

    #[test]
    fn catalog_table_lists_every_service() {
        let text = format_catalog(RateTable::default_catalog().entries());
        assert!(text.contains("Lawn Care"));
        assert!(text.contains("Gutter Cleaning"));
        assert!(text.contains("Pressure Washing"));
        assert!(text.contains("Sloped x1.20"));
    }
}
