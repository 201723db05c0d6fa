//! Boosted tree ensemble and its serialized definition

use crate::tree::DecisionTree;
use crate::InferenceError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, error, info};

/// Logistic function
pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// One tree as five equal-length arrays
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeDefinition {
    #[serde(alias = "children_left")]
    pub children_left: Vec<i32>,
    #[serde(alias = "children_right")]
    pub children_right: Vec<i32>,
    #[serde(alias = "feature", alias = "feature_index")]
    pub feature_index: Vec<i32>,
    pub threshold: Vec<f64>,
    #[serde(alias = "value", alias = "leaf_value")]
    pub leaf_value: Vec<f64>,
}

/// Serialized classifier: an ordered list of trees
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelDefinition {
    pub trees: Vec<TreeDefinition>,
}

/// Sum-of-trees classifier with a logistic output
///
/// Boosting weights are already folded into the leaf values, so tree scores
/// are summed without normalization.
#[derive(Debug, Clone)]
pub struct EnsembleModel {
    trees: Vec<DecisionTree>,
    required_features: usize,
}

impl EnsembleModel {
    pub fn new(trees: Vec<DecisionTree>) -> Result<Self, InferenceError> {
        if trees.is_empty() {
            return Err(InferenceError::CorruptModel("ensemble has no trees".into()));
        }
        let required_features = trees
            .iter()
            .map(DecisionTree::required_features)
            .max()
            .unwrap_or(0);
        Ok(Self {
            trees,
            required_features,
        })
    }

    /// Validate and build from a parsed definition
    pub fn from_definition(definition: ModelDefinition) -> Result<Self, InferenceError> {
        let trees = definition
            .trees
            .into_iter()
            .enumerate()
            .map(|(i, t)| {
                DecisionTree::new(
                    t.children_left,
                    t.children_right,
                    t.feature_index,
                    t.threshold,
                    t.leaf_value,
                )
                .map_err(|e| InferenceError::CorruptModel(format!("tree {}: {}", i, e)))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(trees)
    }

    /// Parse a JSON model definition
    pub fn from_json(json: &str) -> Result<Self, InferenceError> {
        let definition: ModelDefinition = serde_json::from_str(json)
            .map_err(|e| InferenceError::ModelFormat(e.to_string()))?;
        Self::from_definition(definition)
    }

    /// Load a JSON model definition from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self, InferenceError> {
        let path = path.as_ref();
        info!("Loading ensemble model from {}", path.display());

        let json = std::fs::read_to_string(path).map_err(|e| {
            error!("Failed to read model {}: {}", path.display(), e);
            InferenceError::ModelLoad(format!("{}: {}", path.display(), e))
        })?;
        let model = Self::from_json(&json)?;

        info!(
            "Loaded {} trees from {} (needs {} features)",
            model.tree_count(),
            path.display(),
            model.required_features
        );
        Ok(model)
    }

    /// Raw score before the logistic transform
    pub fn margin(&self, features: &[f32]) -> Result<f64, InferenceError> {
        self.trees
            .iter()
            .map(|tree| tree.evaluate(features))
            .sum()
    }

    /// Probability of the positive (drowsy) class
    pub fn predict_probability(&self, features: &[f32]) -> Result<f64, InferenceError> {
        let margin = self.margin(features)?;
        let p = sigmoid(margin);
        debug!("Ensemble margin={:.4}, p={:.4}", margin, p);
        Ok(p)
    }

    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }

    /// Smallest feature vector length every tree can be evaluated against
    pub fn required_features(&self) -> usize {
        self.required_features
    }

    /// Copy with every leaf value scaled, as when reweighting a booster
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            trees: self.trees.iter().map(|t| t.scaled(factor)).collect(),
            required_features: self.required_features,
        }
    }
}
