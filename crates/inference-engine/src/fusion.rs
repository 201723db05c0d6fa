//! Three-channel probability fusion

use crate::ensemble::{sigmoid, EnsembleModel};
use crate::InferenceError;
use feature_engine::{Channel, ChannelFeatures};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, error, info, warn};

/// Linear fusion weights, bias and decision threshold
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionWeights {
    pub eye: f64,
    pub head: f64,
    pub pose: f64,
    pub bias: f64,
    /// Fused probability above which the driver is drowsy, in (0, 1)
    pub threshold: f64,
}

impl Default for FusionWeights {
    fn default() -> Self {
        Self {
            eye: 1.878,
            head: 3.864,
            pose: 3.738,
            bias: -4.839,
            threshold: 0.59,
        }
    }
}

/// Model file per channel
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelPaths {
    pub eye: Option<PathBuf>,
    pub head: Option<PathBuf>,
    pub pose: Option<PathBuf>,
}

impl ModelPaths {
    pub fn get(&self, channel: Channel) -> Option<&PathBuf> {
        match channel {
            Channel::Eye => self.eye.as_ref(),
            Channel::Head => self.head.as_ref(),
            Channel::Pose => self.pose.as_ref(),
        }
    }
}

/// Per-channel classifier outputs
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelProbabilities {
    pub eye: f64,
    pub head: f64,
    pub pose: f64,
}

/// Fused decision for one batch
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FusionOutcome {
    pub channels: ChannelProbabilities,
    /// Fused probability after the sigmoid
    pub probability: f64,
    pub drowsy: bool,
}

/// Runs the eye, head and pose ensembles and fuses their probabilities
///
/// A channel without a model leaves the predictor undetermined: `predict`
/// returns [`InferenceError::NotInitialized`] rather than guessing.
#[derive(Debug, Clone, Default)]
pub struct FusionPredictor {
    weights: FusionWeights,
    eye: Option<EnsembleModel>,
    head: Option<EnsembleModel>,
    pose: Option<EnsembleModel>,
}

impl FusionPredictor {
    /// Predictor with no models loaded yet
    pub fn new(weights: FusionWeights) -> Self {
        Self {
            weights,
            ..Default::default()
        }
    }

    /// Load every configured channel. Failures are logged and leave the
    /// channel empty so the rest of the system keeps running undetermined.
    pub fn load(weights: FusionWeights, paths: &ModelPaths) -> Self {
        let mut predictor = Self::new(weights);
        for channel in Channel::ALL {
            let Some(path) = paths.get(channel) else {
                warn!("No {} model configured; predictions will be undetermined", channel);
                continue;
            };
            match EnsembleModel::load(path) {
                Ok(model) => predictor.set_model(channel, model),
                Err(e) => error!("Failed to initialize {} classifier: {}", channel, e),
            }
        }
        predictor
    }

    pub fn set_model(&mut self, channel: Channel, model: EnsembleModel) {
        *self.slot_mut(channel) = Some(model);
    }

    pub fn model(&self, channel: Channel) -> Option<&EnsembleModel> {
        match channel {
            Channel::Eye => self.eye.as_ref(),
            Channel::Head => self.head.as_ref(),
            Channel::Pose => self.pose.as_ref(),
        }
    }

    fn slot_mut(&mut self, channel: Channel) -> &mut Option<EnsembleModel> {
        match channel {
            Channel::Eye => &mut self.eye,
            Channel::Head => &mut self.head,
            Channel::Pose => &mut self.pose,
        }
    }

    /// True when all three channels have a model
    pub fn is_ready(&self) -> bool {
        Channel::ALL.iter().all(|&c| self.model(c).is_some())
    }

    pub fn weights(&self) -> &FusionWeights {
        &self.weights
    }

    /// Drop any channel whose model reads past the vector length the
    /// extractor produces. Returns the mismatches found.
    pub fn enforce_input_widths<F>(&mut self, vector_len: F) -> Vec<InferenceError>
    where
        F: Fn(Channel) -> usize,
    {
        let mut mismatches = Vec::new();
        for channel in Channel::ALL {
            let actual = vector_len(channel);
            let required = match self.model(channel) {
                Some(model) => model.required_features(),
                None => continue,
            };
            if required > actual {
                let err = InferenceError::InputWidthMismatch {
                    expected_by: channel,
                    required,
                    actual,
                };
                error!("{}", err);
                *self.slot_mut(channel) = None;
                mismatches.push(err);
            }
        }
        mismatches
    }

    /// Combine channel probabilities into a verdict
    pub fn fuse(&self, channels: ChannelProbabilities) -> FusionOutcome {
        let w = &self.weights;
        let z = w.eye * channels.eye + w.head * channels.head + w.pose * channels.pose + w.bias;
        let probability = sigmoid(z);
        FusionOutcome {
            channels,
            probability,
            drowsy: probability > w.threshold,
        }
    }

    fn channel_probability(
        &self,
        channel: Channel,
        features: &ChannelFeatures,
    ) -> Result<f64, InferenceError> {
        let model = self
            .model(channel)
            .ok_or(InferenceError::NotInitialized(channel))?;
        model.predict_probability(features.get(channel))
    }

    /// Classify one batch of channel features
    pub fn predict(&self, features: &ChannelFeatures) -> Result<FusionOutcome, InferenceError> {
        let channels = ChannelProbabilities {
            eye: self.channel_probability(Channel::Eye, features)?,
            head: self.channel_probability(Channel::Head, features)?,
            pose: self.channel_probability(Channel::Pose, features)?,
        };
        let outcome = self.fuse(channels);
        debug!(
            "Fusion: eye={:.3} head={:.3} pose={:.3} -> p={:.3} drowsy={}",
            channels.eye, channels.head, channels.pose, outcome.probability, outcome.drowsy
        );
        Ok(outcome)
    }

    /// Log readiness once at startup
    pub fn log_status(&self) {
        if self.is_ready() {
            info!("Fusion predictor ready with weights {:?}", self.weights);
        } else {
            let missing: Vec<&str> = Channel::ALL
                .iter()
                .filter(|&&c| self.model(c).is_none())
                .map(|c| c.as_str())
                .collect();
            warn!("Fusion predictor undetermined, missing: {}", missing.join(", "));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::DecisionTree;

    fn constant_model(margin: f64) -> EnsembleModel {
        EnsembleModel::new(vec![DecisionTree::leaf(margin)]).unwrap()
    }

    fn features() -> ChannelFeatures {
        ChannelFeatures {
            eye: vec![0.0; 6],
            head: vec![0.0; 9],
            pose: vec![0.0; 6],
            ..Default::default()
        }
    }

    fn ready_predictor(margin: f64) -> FusionPredictor {
        let mut predictor = FusionPredictor::new(FusionWeights::default());
        for channel in Channel::ALL {
            predictor.set_model(channel, constant_model(margin));
        }
        predictor
    }

    #[test]
    fn test_high_channel_probabilities_are_drowsy() {
        let predictor = FusionPredictor::new(FusionWeights::default());
        let outcome = predictor.fuse(ChannelProbabilities {
            eye: 0.9,
            head: 0.9,
            pose: 0.9,
        });
        // z = 0.9 * 9.48 - 4.839 = 3.693
        assert!((outcome.probability - sigmoid(3.693)).abs() < 1e-9);
        assert!(outcome.drowsy);
    }

    #[test]
    fn test_low_channel_probabilities_are_alert() {
        let predictor = FusionPredictor::new(FusionWeights::default());
        let outcome = predictor.fuse(ChannelProbabilities {
            eye: 0.1,
            head: 0.1,
            pose: 0.1,
        });
        assert!(!outcome.drowsy);
    }

    #[test]
    fn test_predict_end_to_end() {
        // sigmoid(2.2) ~= 0.90 on every channel
        let outcome = ready_predictor(2.2).predict(&features()).unwrap();
        assert!(outcome.drowsy);
        assert!((outcome.channels.eye - sigmoid(2.2)).abs() < 1e-12);

        let outcome = ready_predictor(-3.0).predict(&features()).unwrap();
        assert!(!outcome.drowsy);
    }

    #[test]
    fn test_missing_channel_is_undetermined() {
        let mut predictor = FusionPredictor::new(FusionWeights::default());
        predictor.set_model(Channel::Eye, constant_model(5.0));
        predictor.set_model(Channel::Pose, constant_model(5.0));

        assert!(!predictor.is_ready());
        assert!(matches!(
            predictor.predict(&features()),
            Err(InferenceError::NotInitialized(Channel::Head))
        ));
    }

    #[test]
    fn test_load_with_missing_files_degrades() {
        let paths = ModelPaths {
            eye: Some("/nonexistent/eye.json".into()),
            head: None,
            pose: Some("/nonexistent/pose.json".into()),
        };
        let predictor = FusionPredictor::load(FusionWeights::default(), &paths);
        assert!(!predictor.is_ready());
        assert!(predictor.predict(&features()).is_err());
    }

    #[test]
    fn test_enforce_input_widths() {
        let wide = EnsembleModel::new(vec![DecisionTree::new(
            vec![1, -1, -1],
            vec![2, -1, -1],
            vec![100, -1, -1],
            vec![0.0; 3],
            vec![0.0, 1.0, 2.0],
        )
        .unwrap()])
        .unwrap();
        let mut predictor = ready_predictor(0.0);
        predictor.set_model(Channel::Head, wide);

        let mismatches = predictor.enforce_input_widths(|_| 10);

        assert_eq!(mismatches.len(), 1);
        assert!(matches!(
            mismatches[0],
            InferenceError::InputWidthMismatch {
                expected_by: Channel::Head,
                required: 101,
                actual: 10,
            }
        ));
        assert!(predictor.model(Channel::Head).is_none());
        assert!(predictor.model(Channel::Eye).is_some());
    }
}
