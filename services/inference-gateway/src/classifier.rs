//! Classifier capability and the two model families served by the gateway.
//!
//! Artifacts are JSON documents tagged by `kind`. They are validated on load so
//! that `classify` never indexes out of bounds and always yields an index the
//! label table can resolve.

use crate::features::FeatureVector;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Species names, indexed by class id.
pub const CLASS_LABELS: [&str; 3] = ["Setosa", "Versicolor", "Virginica"];

const N_FEATURES: usize = 4;

pub fn class_label(index: usize) -> Option<&'static str> {
    CLASS_LABELS.get(index).copied()
}

pub trait Classifier: Send + Sync + fmt::Debug {
    fn classify(&self, features: &FeatureVector) -> usize;
}

/// Shared, read-only reference to a loaded model.
pub type ModelHandle = Arc<dyn Classifier>;

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("failed to read model artifact {path}: {source}")]
    Io { path: PathBuf, #[source] source: std::io::Error },
    #[error("failed to parse model artifact: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("artifact has {found} classes, label table has {expected}")]
    ClassCount { expected: usize, found: usize },
    #[error("invalid artifact: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelArtifact {
    LogisticRegression(LogisticRegression),
    RandomForest(RandomForest),
}

impl ModelArtifact {
    pub fn load(path: &Path) -> Result<Self, ArtifactError> {
        let bytes = std::fs::read(path).map_err(|source| ArtifactError::Io { path: path.to_path_buf(), source })?;
        Self::from_slice(&bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, ArtifactError> {
        let artifact: ModelArtifact = serde_json::from_slice(bytes)?;
        artifact.validate()?;
        Ok(artifact)
    }

    pub fn validate(&self) -> Result<(), ArtifactError> {
        match self {
            ModelArtifact::LogisticRegression(m) => m.validate(),
            ModelArtifact::RandomForest(m) => m.validate(),
        }
    }

    pub fn family(&self) -> &'static str {
        match self { ModelArtifact::LogisticRegression(_) => "logistic_regression", ModelArtifact::RandomForest(_) => "random_forest" }
    }

    pub fn into_handle(self) -> ModelHandle {
        match self {
            ModelArtifact::LogisticRegression(m) => Arc::new(m),
            ModelArtifact::RandomForest(m) => Arc::new(m),
        }
    }
}

/// Multinomial logistic regression: one weight row and intercept per class.
#[derive(Debug, Clone, Deserialize)]
pub struct LogisticRegression {
    pub coefficients: Vec<[f64; N_FEATURES]>,
    pub intercepts: Vec<f64>,
}

impl LogisticRegression {
    fn validate(&self) -> Result<(), ArtifactError> {
        if self.coefficients.len() != self.intercepts.len() {
            return Err(ArtifactError::Invalid(format!(
                "{} coefficient rows but {} intercepts",
                self.coefficients.len(),
                self.intercepts.len()
            )));
        }
        expect_classes(self.coefficients.len())
    }

    pub fn decision_function(&self, x: &[f64; N_FEATURES]) -> Vec<f64> {
        self.coefficients
            .iter()
            .zip(&self.intercepts)
            .map(|(w, b)| w.iter().zip(x).map(|(w, x)| w * x).sum::<f64>() + b)
            .collect()
    }
}

impl Classifier for LogisticRegression {
    fn classify(&self, features: &FeatureVector) -> usize {
        argmax(&self.decision_function(&features.as_array()))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RandomForest {
    pub trees: Vec<DecisionTree>,
}

impl RandomForest {
    fn validate(&self) -> Result<(), ArtifactError> {
        if self.trees.is_empty() {
            return Err(ArtifactError::Invalid("forest has no trees".into()));
        }
        self.trees.iter().enumerate().try_for_each(|(i, t)| t.validate(i))
    }

    /// Mean of the leaf distributions reached in every tree.
    pub fn predict_proba(&self, x: &[f64; N_FEATURES]) -> Vec<f64> {
        let mut acc = vec![0.0; CLASS_LABELS.len()];
        for tree in &self.trees {
            for (a, p) in acc.iter_mut().zip(tree.leaf(x)) {
                *a += p;
            }
        }
        let n = self.trees.len() as f64;
        acc.iter_mut().for_each(|a| *a /= n);
        acc
    }
}

impl Classifier for RandomForest {
    fn classify(&self, features: &FeatureVector) -> usize {
        argmax(&self.predict_proba(&features.as_array()))
    }
}

/// Flat node array; node 0 is the root.
#[derive(Debug, Clone, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<TreeNode>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreeNode {
    /// Go `left` when `x[feature] <= threshold`.
    Split { feature: usize, threshold: f64, left: usize, right: usize },
    Leaf { distribution: Vec<f64> },
}

impl DecisionTree {
    fn validate(&self, tree: usize) -> Result<(), ArtifactError> {
        if self.nodes.is_empty() {
            return Err(ArtifactError::Invalid(format!("tree {tree} has no nodes")));
        }
        for (idx, node) in self.nodes.iter().enumerate() {
            match node {
                TreeNode::Split { feature, left, right, .. } => {
                    if *feature >= N_FEATURES {
                        return Err(ArtifactError::Invalid(format!("tree {tree} node {idx} splits on feature {feature}")));
                    }
                    // children after their parent keeps traversal acyclic
                    for child in [*left, *right] {
                        if child <= idx || child >= self.nodes.len() {
                            return Err(ArtifactError::Invalid(format!("tree {tree} node {idx} has bad child {child}")));
                        }
                    }
                }
                TreeNode::Leaf { distribution } => expect_classes(distribution.len())?,
            }
        }
        Ok(())
    }

    fn leaf(&self, x: &[f64; N_FEATURES]) -> &[f64] {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                TreeNode::Split { feature, threshold, left, right } => {
                    idx = if x[*feature] <= *threshold { *left } else { *right };
                }
                TreeNode::Leaf { distribution } => return distribution,
            }
        }
    }
}

fn expect_classes(found: usize) -> Result<(), ArtifactError> {
    if found != CLASS_LABELS.len() {
        return Err(ArtifactError::ClassCount { expected: CLASS_LABELS.len(), found });
    }
    Ok(())
}

/// First index of the maximum; ties resolve to the lowest class.
fn argmax(scores: &[f64]) -> usize {
    let mut best = 0;
    for (i, s) in scores.iter().enumerate().skip(1) {
        if *s > scores[best] {
            best = i;
        }
    }
    best
}
