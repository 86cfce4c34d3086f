//! The fitted regression model and its canonical column schema.
//!
//! The schema is fixed once at fit time and owned by the model, and exactly
//! one expansion routine ([`ColumnSchema::expand`]) turns a feature map into
//! a design row, used identically during training and prediction. A
//! prediction input is re-expanded into the trained column set: missing
//! columns become `0`, extra features are dropped. This is what keeps
//! training-time and quote-time one-hot columns from drifting apart.

use serde::{Deserialize, Serialize};

use crate::domain::{FeatureMap, FeatureValue};

/// One design-matrix column (the intercept is not a column; the model keeps
/// it separately).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Column {
    /// Numeric pass-through of a feature.
    Numeric { field: String },
    /// One-hot indicator: `1.0` when `field` equals `value`.
    Indicator { field: String, value: String },
}

impl Column {
    /// Evaluate this column against a feature map.
    pub fn evaluate(&self, features: &FeatureMap) -> f64 {
        match self {
            Column::Numeric { field } => match features.get(field) {
                Some(FeatureValue::Number(v)) if v.is_finite() => *v,
                _ => 0.0,
            },
            Column::Indicator { field, value } => match features.get(field) {
                Some(FeatureValue::Text(t)) if t == value => 1.0,
                // Numeric categories (e.g. zip codes read as numbers) still
                // match their indicator by canonical text form.
                Some(FeatureValue::Number(v)) if &format_number(*v) == value => 1.0,
                _ => 0.0,
            },
        }
    }
}

/// Canonical text form of a numeric category value (`12345.0` → `"12345"`).
pub fn format_number(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{v}")
    }
}

/// Ordered list of design columns, fixed at fit time.
///
/// Ordering is deterministic: fields in first-seen order across rows
/// (alphabetical within a row, since feature maps are `BTreeMap`s), and
/// indicator values in first-seen order within a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSchema {
    columns: Vec<Column>,
}

impl ColumnSchema {
    /// Build the schema from training feature maps.
    ///
    /// A field that ever carries a text value anywhere in the dataset is
    /// treated as categorical throughout; otherwise it is numeric. This
    /// keeps mixed-type columns (a zip column where some rows parsed as
    /// numbers) from silently splitting into two encodings.
    pub fn build<'a>(rows: impl Iterator<Item = &'a FeatureMap> + Clone) -> Self {
        // Pass 1: field order and categorical/numeric decision.
        let mut field_order: Vec<String> = Vec::new();
        let mut categorical: Vec<bool> = Vec::new();
        for row in rows.clone() {
            for (name, value) in row {
                match field_order.iter().position(|f| f == name) {
                    Some(i) => {
                        if matches!(value, FeatureValue::Text(_)) {
                            categorical[i] = true;
                        }
                    }
                    None => {
                        field_order.push(name.clone());
                        categorical.push(matches!(value, FeatureValue::Text(_)));
                    }
                }
            }
        }

        // Pass 2: columns. Numeric fields get one column, categorical fields one
        // indicator per first-seen value.
        let mut columns = Vec::new();
        for (i, field) in field_order.iter().enumerate() {
            if !categorical[i] {
                columns.push(Column::Numeric {
                    field: field.clone(),
                });
                continue;
            }
            let mut seen: Vec<String> = Vec::new();
            for row in rows.clone() {
                let value = match row.get(field) {
                    Some(FeatureValue::Text(t)) => t.clone(),
                    Some(FeatureValue::Number(v)) => format_number(*v),
                    None => continue,
                };
                if !seen.iter().any(|s| s == &value) {
                    seen.push(value);
                }
            }
            for value in seen {
                columns.push(Column::Indicator {
                    field: field.clone(),
                    value,
                });
            }
        }

        Self { columns }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Expand a feature map into a design row matching this schema exactly.
    pub fn expand(&self, features: &FeatureMap) -> Vec<f64> {
        self.columns.iter().map(|c| c.evaluate(features)).collect()
    }
}

/// Learned regression: intercept + one weight per schema column, plus the
/// residual standard deviation recorded at fit time (drives the ±z·σ band).
///
/// Replaced atomically as a whole on retrain; never updated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedModel {
    pub schema: ColumnSchema,
    pub intercept: f64,
    pub weights: Vec<f64>,
    pub residual_std: f64,
}

impl FittedModel {
    /// Predict a price for the given features.
    ///
    /// Inputs are re-expanded into the trained column set; features the
    /// model has never seen are dropped, trained columns absent from the
    /// input contribute zero.
    pub fn predict(&self, features: &FeatureMap) -> f64 {
        let row = self.schema.expand(features);
        let mut y = self.intercept;
        for (w, x) in self.weights.iter().zip(row.iter()) {
            y += w * x;
        }
        y
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FeatureValue;

    fn map(pairs: &[(&str, FeatureValue)]) -> FeatureMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn schema_one_hots_text_fields_and_passes_numbers() {
        let rows = vec![
            map(&[
                ("property_size", FeatureValue::Number(5000.0)),
                ("service_type", FeatureValue::Text("Lawn Care".to_string())),
            ]),
            map(&[
                ("property_size", FeatureValue::Number(9000.0)),
                ("service_type", FeatureValue::Text("Gutter Cleaning".to_string())),
            ]),
        ];
        let schema = ColumnSchema::build(rows.iter());

        assert_eq!(
            schema.columns(),
            &[
                Column::Numeric {
                    field: "property_size".to_string()
                },
                Column::Indicator {
                    field: "service_type".to_string(),
                    value: "Lawn Care".to_string()
                },
                Column::Indicator {
                    field: "service_type".to_string(),
                    value: "Gutter Cleaning".to_string()
                },
            ]
        );

        let row = schema.expand(&rows[0]);
        assert_eq!(row, vec![5000.0, 1.0, 0.0]);
    }

    #[test]
    fn expansion_zero_fills_missing_and_drops_extras() {
        let rows = vec![map(&[
            ("property_size", FeatureValue::Number(5000.0)),
            ("service_type", FeatureValue::Text("Lawn Care".to_string())),
        ])];
        let schema = ColumnSchema::build(rows.iter());

        let input = map(&[
            ("service_type", FeatureValue::Text("Lawn Care".to_string())),
            ("unseen_field", FeatureValue::Number(42.0)),
        ]);
        assert_eq!(schema.expand(&input), vec![0.0, 1.0]);
    }

    #[test]
    fn mixed_type_field_becomes_categorical() {
        let rows = vec![
            map(&[("zip_code", FeatureValue::Number(12345.0))]),
            map(&[("zip_code", FeatureValue::Text("1234A".to_string()))]),
        ];
        let schema = ColumnSchema::build(rows.iter());
        assert_eq!(schema.len(), 2);
        assert!(matches!(schema.columns()[0], Column::Indicator { .. }));

        // The numeric row still matches its indicator by canonical text.
        assert_eq!(schema.expand(&rows[0]), vec![1.0, 0.0]);
    }

    #[test]
    fn predict_applies_intercept_and_weights() {
        let rows = vec![map(&[("property_size", FeatureValue::Number(1.0))])];
        let schema = ColumnSchema::build(rows.iter());
        let model = FittedModel {
            schema,
            intercept: 10.0,
            weights: vec![0.04],
            residual_std: 0.0,
        };
        let y = model.predict(&map(&[("property_size", FeatureValue::Number(500.0))]));
        assert!((y - 30.0).abs() < 1e-12);
    }
}
