use anyhow::{Result, bail};
use candle_core::{Device, Tensor};
use candle_nn::ops::{sigmoid, softmax};
use serde::Deserialize;

use crate::classifier::Classifier;
use crate::error::ModelError;
use crate::features::FeatureMatrix;

#[derive(Debug, Clone, Deserialize)]
pub struct LogisticArtifact {
    pub n_features: usize,
    pub classes: Vec<serde_json::Value>,
    /// One row per decision function: a single row for binary problems,
    /// one per class otherwise.
    pub coef: Vec<Vec<f64>>,
    pub intercept: Vec<f64>,
}

pub struct LogisticRegression {
    /// Transposed coefficients, `n_features × k`.
    weights: Tensor,
    /// `k` intercepts.
    bias: Tensor,
    n_features: usize,
    n_classes: usize,
    device: Device,
}

impl LogisticRegression {
    pub fn new(artifact: LogisticArtifact) -> Result<Self> {
        let n_classes = artifact.classes.len();
        let n_features = artifact.n_features;
        let k = artifact.coef.len();

        let expected_rows = if n_classes == 2 { 1 } else { n_classes };
        if k != expected_rows {
            bail!("coef has {k} rows, expected {expected_rows} for {n_classes} classes");
        }
        if artifact.intercept.len() != k {
            bail!(
                "intercept has {} entries, expected {k}",
                artifact.intercept.len()
            );
        }
        if let Some(row) = artifact.coef.iter().find(|row| row.len() != n_features) {
            bail!(
                "coef row has {} entries, expected {n_features}",
                row.len()
            );
        }

        let mut transposed = vec![0f64; n_features * k];
        for (class, row) in artifact.coef.iter().enumerate() {
            for (feature, &w) in row.iter().enumerate() {
                transposed[feature * k + class] = w;
            }
        }

        let device = Device::Cpu;
        let weights = Tensor::from_vec(transposed, (n_features, k), &device)?;
        let bias = Tensor::from_vec(artifact.intercept, k, &device)?;

        Ok(Self {
            weights,
            bias,
            n_features,
            n_classes,
            device,
        })
    }
}

impl Classifier for LogisticRegression {
    fn name(&self) -> &str {
        "LogisticRegression"
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn n_classes(&self) -> usize {
        self.n_classes
    }

    fn predict_proba(&self, x: &FeatureMatrix) -> Result<Vec<Vec<f64>>, ModelError> {
        let x = Tensor::from_slice(x.row(), (1, x.n_features()), &self.device)?;
        let logits = x.matmul(&self.weights)?.broadcast_add(&self.bias)?;

        if self.n_classes == 2 {
            let positive = sigmoid(&logits)?.to_vec2::<f64>()?;
            Ok(positive.into_iter().map(|row| vec![1.0 - row[0], row[0]]).collect())
        } else {
            Ok(softmax(&logits, 1)?.to_vec2::<f64>()?)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn binary() -> LogisticRegression {
        LogisticRegression::new(LogisticArtifact {
            n_features: 2,
            classes: vec![json!(0), json!(1)],
            coef: vec![vec![1.0, -2.0]],
            intercept: vec![0.5],
        })
        .unwrap()
    }

    #[test]
    fn binary_uses_sigmoid_of_decision_function() {
        let probs = binary()
            .predict_proba(&FeatureMatrix::from_row(vec![3.0, 1.0]))
            .unwrap();
        // z = 3 - 2 + 0.5
        let expected = 1.0 / (1.0 + (-1.5f64).exp());
        assert_eq!(probs.len(), 1);
        assert!((probs[0][1] - expected).abs() < 1e-9);
        assert!((probs[0][0] + probs[0][1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn multinomial_uses_softmax() {
        let model = LogisticRegression::new(LogisticArtifact {
            n_features: 1,
            classes: vec![json!("low"), json!("mid"), json!("high")],
            coef: vec![vec![0.0], vec![1.0], vec![2.0]],
            intercept: vec![0.0, 0.0, 0.0],
        })
        .unwrap();
        let probs = model
            .predict_proba(&FeatureMatrix::from_row(vec![1.0]))
            .unwrap();
        let denom = 1.0 + 1f64.exp() + 2f64.exp();
        assert!((probs[0][1] - 1f64.exp() / denom).abs() < 1e-9);
        assert!((probs[0].iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn rejects_inconsistent_shapes() {
        let err = LogisticRegression::new(LogisticArtifact {
            n_features: 3,
            classes: vec![json!(0), json!(1)],
            coef: vec![vec![1.0, 2.0]],
            intercept: vec![0.0],
        })
        .err()
        .unwrap();
        assert!(err.to_string().contains("expected 3"));

        assert!(
            LogisticRegression::new(LogisticArtifact {
                n_features: 1,
                classes: vec![json!(0), json!(1)],
                coef: vec![vec![1.0]],
                intercept: vec![],
            })
            .is_err()
        );
    }
}
