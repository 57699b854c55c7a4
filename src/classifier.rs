use anyhow::{Context, Result, bail};
use hf_hub::{Repo, RepoType, api::tokio::Api};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::ModelError;
use crate::features::FeatureMatrix;
use crate::forest::{ForestArtifact, RandomForest};
use crate::logistic::{LogisticArtifact, LogisticRegression};

/// A fitted probabilistic classifier. Read-only once loaded.
pub trait Classifier {
    /// Estimator name used in error messages.
    fn name(&self) -> &str;

    fn n_features(&self) -> usize;

    fn n_classes(&self) -> usize;

    /// Per-row class probabilities, columns ordered like the training classes.
    fn predict_proba(&self, x: &FeatureMatrix) -> Result<Vec<Vec<f64>>, ModelError>;
}

pub type SharedClassifier = Arc<dyn Classifier + Send + Sync>;

/// Where the serialized model comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelSource {
    Local(PathBuf),
    Hub {
        repo_id: String,
        revision: String,
        filename: String,
    },
}

/// On-disk representation of an exported estimator.
#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelArtifact {
    LogisticRegression(LogisticArtifact),
    RandomForest(ForestArtifact),
}

impl ModelArtifact {
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).context("Model artifact is not valid JSON for a known estimator")
    }

    pub fn into_classifier(self) -> Result<SharedClassifier> {
        let classifier: SharedClassifier = match self {
            ModelArtifact::LogisticRegression(artifact) => Arc::new(LogisticRegression::new(artifact)?),
            ModelArtifact::RandomForest(artifact) => Arc::new(RandomForest::new(artifact)?),
        };
        if classifier.n_classes() < 2 {
            bail!(
                "{} was fitted on {} class(es); at least two are required",
                classifier.name(),
                classifier.n_classes()
            );
        }
        Ok(classifier)
    }
}

#[tracing::instrument]
pub async fn load(source: &ModelSource) -> Result<SharedClassifier> {
    let path = match source {
        ModelSource::Local(path) => path.clone(),
        ModelSource::Hub {
            repo_id,
            revision,
            filename,
        } => {
            let repo = Repo::with_revision(repo_id.clone(), RepoType::Model, revision.clone());
            let api = Api::new()?;
            api.repo(repo)
                .get(filename)
                .await
                .with_context(|| format!("Failed to fetch {filename} from {repo_id}@{revision}"))?
        }
    };

    if !path.is_file() {
        bail!("Model file {} does not exist.", path.display());
    }

    let raw = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("Failed to read model file {}", path.display()))?;
    let classifier = ModelArtifact::from_json(&raw)?.into_classifier()?;

    tracing::info!(
        model = classifier.name(),
        n_features = classifier.n_features(),
        n_classes = classifier.n_classes(),
        path = %path.display(),
        "Model loaded"
    );
    Ok(classifier)
}

/// Probability of the positive class (column 1) for the first row.
pub fn class_one_probability(probs: &[Vec<f64>]) -> Result<f64, ModelError> {
    let row = probs.first().ok_or(ModelError::EmptyOutput)?;
    row.get(1).copied().ok_or(ModelError::MissingClass {
        index: 1,
        n_classes: row.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOGISTIC: &str = r#"{
        "kind": "logistic_regression",
        "n_features": 2,
        "classes": [0, 1],
        "coef": [[0.5, -0.25]],
        "intercept": [0.1]
    }"#;

    #[test]
    fn parses_tagged_artifacts() {
        let classifier = ModelArtifact::from_json(LOGISTIC)
            .unwrap()
            .into_classifier()
            .unwrap();
        assert_eq!(classifier.name(), "LogisticRegression");
        assert_eq!(classifier.n_features(), 2);
        assert_eq!(classifier.n_classes(), 2);
    }

    #[test]
    fn unknown_kind_is_rejected() {
        assert!(ModelArtifact::from_json(r#"{"kind": "svm", "n_features": 2}"#).is_err());
    }

    #[test]
    fn single_class_models_are_rejected() {
        let raw = r#"{
            "kind": "random_forest",
            "n_features": 1,
            "classes": [1],
            "trees": [{
                "children_left": [-1],
                "children_right": [-1],
                "feature": [-2],
                "threshold": [-2.0],
                "value": [[3.0]]
            }]
        }"#;
        let err = ModelArtifact::from_json(raw).unwrap().into_classifier().err().unwrap();
        assert!(err.to_string().contains("at least two"));
    }

    #[tokio::test]
    async fn missing_file_is_fatal() {
        let source = ModelSource::Local(PathBuf::from("./does/not/exist.json"));
        let err = load(&source).await.err().unwrap();
        assert!(err.to_string().contains("does not exist"));
    }

    #[tokio::test]
    async fn loads_from_disk() {
        let path = std::env::temp_dir().join(format!("pcos-model-{}.json", uuid::Uuid::new_v4()));
        tokio::fs::write(&path, LOGISTIC).await.unwrap();

        let classifier = load(&ModelSource::Local(path.clone())).await.unwrap();
        assert_eq!(classifier.n_features(), 2);

        tokio::fs::remove_file(path).await.unwrap();
    }

    #[test]
    fn positive_class_is_column_one() {
        assert_eq!(class_one_probability(&[vec![0.3, 0.7]]).unwrap(), 0.7);
        assert!(matches!(
            class_one_probability(&[vec![1.0]]),
            Err(ModelError::MissingClass { index: 1, n_classes: 1 })
        ));
        assert!(matches!(
            class_one_probability(&[]),
            Err(ModelError::EmptyOutput)
        ));
    }
}
