use anyhow::{Result, bail};
use serde::Deserialize;

use crate::classifier::Classifier;
use crate::error::ModelError;
use crate::features::FeatureMatrix;

const LEAF: i64 = -1;

/// A single fitted decision tree as parallel node arrays.
#[derive(Debug, Clone, Deserialize)]
pub struct TreeArtifact {
    pub children_left: Vec<i64>,
    pub children_right: Vec<i64>,
    pub feature: Vec<i64>,
    pub threshold: Vec<f64>,
    /// Per-node class weights (sample counts or fractions).
    pub value: Vec<Vec<f64>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ForestArtifact {
    pub n_features: usize,
    pub classes: Vec<serde_json::Value>,
    pub trees: Vec<TreeArtifact>,
}

enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf(Vec<f64>),
}

struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    fn build(artifact: TreeArtifact, n_features: usize, n_classes: usize) -> Result<Self> {
        let len = artifact.children_left.len();
        if len == 0 {
            bail!("tree has no nodes");
        }
        if artifact.children_right.len() != len
            || artifact.feature.len() != len
            || artifact.threshold.len() != len
            || artifact.value.len() != len
        {
            bail!("tree node arrays have different lengths");
        }

        let child = |index: i64| -> Result<usize> {
            match usize::try_from(index) {
                Ok(i) if i < len => Ok(i),
                _ => bail!("child index {index} out of range for {len} nodes"),
            }
        };

        let mut nodes = Vec::with_capacity(len);
        for (i, value) in artifact.value.into_iter().enumerate() {
            if artifact.children_left[i] == LEAF {
                if value.len() != n_classes {
                    bail!("leaf {i} has {} class weights, expected {n_classes}", value.len());
                }
                let total: f64 = value.iter().sum();
                let distribution = if total > 0.0 {
                    value.iter().map(|w| w / total).collect()
                } else {
                    vec![0.0; n_classes]
                };
                nodes.push(Node::Leaf(distribution));
            } else {
                let feature = usize::try_from(artifact.feature[i])
                    .ok()
                    .filter(|&f| f < n_features);
                let Some(feature) = feature else {
                    bail!("node {i} splits on unknown feature {}", artifact.feature[i]);
                };
                let (left, right) = (
                    child(artifact.children_left[i])?,
                    child(artifact.children_right[i])?,
                );
                if left <= i || right <= i {
                    bail!("node {i} points back to an earlier node");
                }
                nodes.push(Node::Split {
                    feature,
                    threshold: artifact.threshold[i],
                    left,
                    right,
                });
            }
        }

        Ok(Self { nodes })
    }

    fn leaf(&self, row: &[f64]) -> &[f64] {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                Node::Leaf(distribution) => return distribution,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }
}

/// Averaged ensemble of decision trees. A lone decision tree is a forest of one.
pub struct RandomForest {
    trees: Vec<Tree>,
    n_features: usize,
    n_classes: usize,
}

impl RandomForest {
    pub fn new(artifact: ForestArtifact) -> Result<Self> {
        if artifact.trees.is_empty() {
            bail!("random forest has no trees");
        }
        let n_classes = artifact.classes.len();
        let trees = artifact
            .trees
            .into_iter()
            .map(|tree| Tree::build(tree, artifact.n_features, n_classes))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            trees,
            n_features: artifact.n_features,
            n_classes,
        })
    }
}

impl Classifier for RandomForest {
    fn name(&self) -> &str {
        "RandomForestClassifier"
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn n_classes(&self) -> usize {
        self.n_classes
    }

    fn predict_proba(&self, x: &FeatureMatrix) -> Result<Vec<Vec<f64>>, ModelError> {
        if x.n_features() != self.n_features {
            return Err(ModelError::FeatureCount {
                got: x.n_features(),
                expected: self.n_features,
                model: self.name().to_string(),
            });
        }

        let mut proba = vec![0.0; self.n_classes];
        for tree in &self.trees {
            for (acc, p) in proba.iter_mut().zip(tree.leaf(x.row())) {
                *acc += p;
            }
        }
        let n_trees = self.trees.len() as f64;
        proba.iter_mut().for_each(|p| *p /= n_trees);
        Ok(vec![proba])
    }
}
