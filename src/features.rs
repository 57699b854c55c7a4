//! Turns the loosely-typed `features` value of a request into the single-row
//! matrix a classifier consumes.

use serde_json::Value;

use crate::error::PredictError;

/// A validated 1 × N matrix of features.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    row: Vec<f64>,
}

impl FeatureMatrix {
    pub fn row(&self) -> &[f64] {
        &self.row
    }

    pub fn n_features(&self) -> usize {
        self.row.len()
    }

    #[cfg(test)]
    pub(crate) fn from_row(row: Vec<f64>) -> Self {
        Self { row }
    }
}

/// Extracts `features` from a request body and checks it against the width
/// the model expects.
///
/// Nested rectangular arrays are flattened row-major into one row, booleans
/// count as 0/1. Anything else non-numeric is rejected.
pub fn validate(
    body: &Value,
    expected: usize,
    model: &str,
) -> Result<FeatureMatrix, PredictError> {
    let features = body
        .as_object()
        .and_then(|object| object.get("features"))
        .ok_or(PredictError::MissingFeatures)?;

    let mut row = Vec::new();
    flatten(features, &mut String::new(), &mut row)?;

    if row.len() != expected {
        return Err(PredictError::FeatureCount {
            got: row.len(),
            expected,
            model: model.to_string(),
        });
    }

    Ok(FeatureMatrix { row })
}

/// Appends the scalars of `value` to `out` and returns the shape of `value`.
fn flatten(
    value: &Value,
    path: &mut String,
    out: &mut Vec<f64>,
) -> Result<Vec<usize>, PredictError> {
    match value {
        Value::Number(number) => {
            let x = number.as_f64().ok_or_else(|| PredictError::NotNumeric {
                path: path.clone(),
            })?;
            out.push(x);
            Ok(Vec::new())
        }
        Value::Bool(flag) => {
            out.push(if *flag { 1.0 } else { 0.0 });
            Ok(Vec::new())
        }
        Value::Array(items) => {
            let mut inner: Option<Vec<usize>> = None;
            for (index, item) in items.iter().enumerate() {
                let mark = path.len();
                path.push_str(&format!("[{index}]"));
                let shape = flatten(item, path, out)?;
                path.truncate(mark);

                match &inner {
                    None => inner = Some(shape),
                    Some(expected) if *expected != shape => return Err(PredictError::Ragged),
                    Some(_) => {}
                }
            }

            let mut shape = vec![items.len()];
            shape.extend(inner.unwrap_or_default());
            Ok(shape)
        }
        _ => Err(PredictError::NotNumeric { path: path.clone() }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn flat_array_is_one_row() {
        let matrix = validate(&json!({"features": [24, 160.5, 55]}), 3, "m").unwrap();
        assert_eq!(matrix.row(), &[24.0, 160.5, 55.0]);
        assert_eq!(matrix.n_features(), 3);
    }

    #[test]
    fn booleans_coerce_to_binary() {
        let matrix = validate(&json!({"features": [true, false, 1]}), 3, "m").unwrap();
        assert_eq!(matrix.row(), &[1.0, 0.0, 1.0]);
    }

    #[test]
    fn nested_rectangular_arrays_are_reshaped() {
        let matrix = validate(&json!({"features": [[1, 2], [3, 4]]}), 4, "m").unwrap();
        assert_eq!(matrix.row(), &[1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn ragged_arrays_are_rejected() {
        let err = validate(&json!({"features": [[1, 2], [3]]}), 3, "m").unwrap_err();
        assert!(matches!(err, PredictError::Ragged));

        let err = validate(&json!({"features": [1, [2]]}), 2, "m").unwrap_err();
        assert!(matches!(err, PredictError::Ragged));
    }

    #[test]
    fn missing_features_field() {
        let err = validate(&json!({"feature": [1]}), 1, "m").unwrap_err();
        assert!(matches!(err, PredictError::MissingFeatures));

        let err = validate(&json!([1, 2]), 2, "m").unwrap_err();
        assert!(matches!(err, PredictError::MissingFeatures));
    }

    #[test]
    fn strings_and_nulls_name_their_position() {
        let err = validate(&json!({"features": [1, "2"]}), 2, "m").unwrap_err();
        assert_eq!(err.to_string(), "features[1] is not a number");

        let err = validate(&json!({"features": null}), 1, "m").unwrap_err();
        assert_eq!(err.to_string(), "features is not a number");
    }

    #[test]
    fn width_mismatch_is_reported() {
        let err = validate(&json!({"features": []}), 12, "RandomForestClassifier").unwrap_err();
        match err {
            PredictError::FeatureCount { got, expected, .. } => {
                assert_eq!((got, expected), (0, 12));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
