//! Dataset ingestion and normalization.
//!
//! This module turns user-supplied quote spreadsheets into clean
//! `TrainingExample`s that are safe to fit.
//!
//! Design goals:
//! - **Strict target handling**: a missing target column is an error, not a
//!   silently empty label.
//! - **Row-level validation** with 1-based row numbers in error messages.
//! - **Deterministic behavior**: header normalization is a pure function.
//! - **Separation of concerns**: no fitting logic here. The engine consumes
//!   already-parsed rows; only the CLI touches CSV files.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::path::Path;

use crate::domain::{fields, FeatureMap, FeatureValue, TrainingExample};
use crate::error::{AppError, QuoteError};
use crate::model::fitted::format_number;

/// One already-parsed dataset row: raw column name → raw cell text.
pub type RawRow = BTreeMap<String, String>;

/// Normalize a CSV header onto the canonical feature vocabulary.
///
/// Lowercases, strips parenthesized unit suffixes, and collapses runs of
/// non-alphanumerics into single underscores:
/// `"Property Size (sq ft)"` → `property_size`, `"Zip Code"` → `zip_code`,
/// `"Quote ($)"` → `quote`.
pub fn normalize_header(raw: &str) -> String {
    let mut cleaned = String::with_capacity(raw.len());
    let mut depth = 0usize;
    for ch in raw.chars() {
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            _ if depth == 0 => cleaned.push(ch),
            _ => {}
        }
    }

    let mut out = String::with_capacity(cleaned.len());
    let mut pending_sep = false;
    for ch in cleaned.chars() {
        if ch.is_alphanumeric() {
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            out.extend(ch.to_lowercase());
        } else {
            pending_sep = true;
        }
    }
    out
}

fn is_target_column(header: &str, target: &str) -> bool {
    header == target || normalize_header(header) == normalize_header(target)
}

/// Load raw rows from a CSV file.
pub fn load_rows_csv(path: &Path) -> Result<Vec<RawRow>, AppError> {
    let file = File::open(path).map_err(|e| {
        AppError::new(2, format!("Failed to open dataset '{}': {e}", path.display()))
    })?;
    let mut reader = csv::Reader::from_reader(file);
    let headers = reader
        .headers()
        .map_err(|e| AppError::new(3, format!("Failed to read CSV headers: {e}")))?
        .clone();

    let mut rows = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record =
            record.map_err(|e| AppError::new(3, format!("CSV parse error at row {}: {e}", i + 1)))?;
        let mut row = RawRow::new();
        for (header, value) in headers.iter().zip(record.iter()) {
            row.insert(header.to_string(), value.to_string());
        }
        rows.push(row);
    }
    Ok(rows)
}

/// Convert parsed rows into training examples against a designated target
/// column.
///
/// Feature columns are renamed through [`normalize_header`]; zip codes stay
/// categorical even when they parse as numbers; empty cells are omitted (the
/// schema zero-fills them at expansion time).
pub fn build_examples(rows: &[RawRow], target: &str) -> Result<Vec<TrainingExample>, QuoteError> {
    if rows.is_empty() {
        return Err(QuoteError::EmptyDataset);
    }

    let mut examples = Vec::with_capacity(rows.len());
    for (i, row) in rows.iter().enumerate() {
        let row_no = i + 1;

        let (_, raw_price) = row
            .iter()
            .find(|(header, _)| is_target_column(header, target))
            .ok_or_else(|| QuoteError::MissingTargetColumn {
                column: target.to_string(),
            })?;
        let observed_price =
            raw_price
                .trim()
                .parse::<f64>()
                .map_err(|_| QuoteError::InvalidRow {
                    row: row_no,
                    message: format!("target '{target}' is not numeric: '{raw_price}'"),
                })?;

        let mut features = FeatureMap::new();
        for (header, value) in row {
            if is_target_column(header, target) {
                continue;
            }
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            let name = normalize_header(header);
            if name.is_empty() {
                continue;
            }
            let feature = if name == fields::ZIP_CODE {
                FeatureValue::Text(value.to_string())
            } else {
                match value.parse::<f64>() {
                    Ok(v) if v.is_finite() => FeatureValue::Number(v),
                    _ => FeatureValue::Text(value.to_string()),
                }
            };
            features.insert(name, feature);
        }

        examples.push(TrainingExample {
            features,
            observed_price,
        });
    }

    Ok(examples)
}

/// Write examples back out as a CSV (used by the sample generator).
///
/// Columns are the sorted union of feature names, with the target column
/// last.
pub fn write_examples_csv(
    path: &Path,
    examples: &[TrainingExample],
    target: &str,
) -> Result<(), AppError> {
    let file = File::create(path).map_err(|e| {
        AppError::new(2, format!("Failed to create dataset '{}': {e}", path.display()))
    })?;
    let mut writer = csv::Writer::from_writer(file);

    let columns: BTreeSet<&str> = examples
        .iter()
        .flat_map(|e| e.features.keys().map(String::as_str))
        .collect();

    let mut header: Vec<&str> = columns.iter().copied().collect();
    header.push(target);
    writer
        .write_record(&header)
        .map_err(|e| AppError::new(4, format!("Failed to write CSV header: {e}")))?;

    for example in examples {
        let mut record: Vec<String> = Vec::with_capacity(header.len());
        for column in &columns {
            let cell = match example.features.get(*column) {
                Some(FeatureValue::Number(v)) => format_number(*v),
                Some(FeatureValue::Text(t)) => t.clone(),
                None => String::new(),
            };
            record.push(cell);
        }
        record.push(format!("{:.2}", example.observed_price));
        writer
            .write_record(&record)
            .map_err(|e| AppError::new(4, format!("Failed to write CSV row: {e}")))?;
    }

    writer
        .flush()
        .map_err(|e| AppError::new(4, format!("Failed to flush CSV: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(pairs: &[(&str, &str)]) -> RawRow {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn headers_normalize_onto_canonical_names() {
        assert_eq!(normalize_header("Property Size (sq ft)"), "property_size");
        assert_eq!(normalize_header("Zip Code"), "zip_code");
        assert_eq!(normalize_header("Service Type"), "service_type");
        assert_eq!(normalize_header("Quote ($)"), "quote");
    }

    #[test]
    fn builds_examples_from_spreadsheet_style_rows() {
        let rows = vec![raw(&[
            ("Zip Code", "12345"),
            ("Property Size (sq ft)", "5000"),
            ("Service Type", "Lawn Care"),
            ("Quote ($)", "200"),
        ])];
        let examples = build_examples(&rows, "Quote ($)").unwrap();
        assert_eq!(examples.len(), 1);
        assert_eq!(examples[0].observed_price, 200.0);
        assert_eq!(
            examples[0].features.get("zip_code"),
            Some(&FeatureValue::Text("12345".to_string()))
        );
        assert_eq!(
            examples[0].features.get("property_size"),
            Some(&FeatureValue::Number(5000.0))
        );
        assert_eq!(
            examples[0].features.get("service_type"),
            Some(&FeatureValue::Text("Lawn Care".to_string()))
        );
    }

    #[test]
    fn missing_target_column_is_reported() {
        let rows = vec![raw(&[("Zip Code", "12345")])];
        let err = build_examples(&rows, "Quote ($)").unwrap_err();
        assert_eq!(
            err,
            QuoteError::MissingTargetColumn {
                column: "Quote ($)".to_string()
            }
        );
    }

    #[test]
    fn non_numeric_price_is_an_invalid_row() {
        let rows = vec![
            raw(&[("Quote ($)", "200"), ("Zip Code", "12345")]),
            raw(&[("Quote ($)", "n/a"), ("Zip Code", "12346")]),
        ];
        let err = build_examples(&rows, "Quote ($)").unwrap_err();
        assert!(matches!(err, QuoteError::InvalidRow { row: 2, .. }));
    }

    #[test]
    fn empty_rows_are_an_empty_dataset() {
        assert_eq!(build_examples(&[], "Quote ($)").unwrap_err(), QuoteError::EmptyDataset);
    }
}
