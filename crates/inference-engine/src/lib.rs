//! Drowsiness Inference Engine
//!
//! Scores feature vectors with boosted decision-tree ensembles (one per
//! channel) and fuses the channel probabilities into a drowsy/alert verdict.

mod ensemble;
mod fusion;
mod tree;

pub use ensemble::{sigmoid, EnsembleModel, ModelDefinition, TreeDefinition};
pub use fusion::{ChannelProbabilities, FusionOutcome, FusionPredictor, FusionWeights, ModelPaths};
pub use tree::{DecisionTree, LEAF};

use feature_engine::Channel;
use thiserror::Error;

/// Errors during model loading and inference
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("Model load failed: {0}")]
    ModelLoad(String),
    #[error("Model format invalid: {0}")]
    ModelFormat(String),
    #[error("Corrupt model: {0}")]
    CorruptModel(String),
    #[error("Feature index {index} out of bounds for vector of length {len}")]
    FeatureIndexOutOfBounds { index: usize, len: usize },
    #[error("Model for {expected_by} channel needs {required} features, extractor yields {actual}")]
    InputWidthMismatch {
        expected_by: Channel,
        required: usize,
        actual: usize,
    },
    #[error("{0} classifier not initialized")]
    NotInitialized(Channel),
}
