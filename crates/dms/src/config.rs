//! DMS configuration

use alerting::AlarmConfig;
use frame_gate::GateConfig;
use inference_engine::{FusionWeights, ModelPaths};
use serde::{Deserialize, Serialize};

/// DMS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DmsConfig {
    /// Frame admission and batching
    pub gate: GateConfig,

    /// Alarm escalation policy
    pub alarm: AlarmConfig,

    /// Channel fusion constants
    pub fusion: FusionWeights,

    /// Model paths (one serialized ensemble per channel)
    pub models: ModelPaths,

    /// Threads running landmark detection within one batch
    pub detection_workers: usize,
}

impl Default for DmsConfig {
    fn default() -> Self {
        Self {
            gate: GateConfig::default(),
            alarm: AlarmConfig::default(),
            fusion: FusionWeights::default(),
            models: ModelPaths::default(),
            detection_workers: 4,
        }
    }
}

impl DmsConfig {
    /// Model paths under a directory using the conventional file names
    pub fn with_model_dir(mut self, dir: impl AsRef<std::path::Path>) -> Self {
        let dir = dir.as_ref();
        self.models = ModelPaths {
            eye: Some(dir.join("eye_model.json")),
            head: Some(dir.join("head_model.json")),
            pose: Some(dir.join("pose_model.json")),
        };
        self
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> Result<(), crate::DmsError> {
        use crate::DmsError::Config;
        if !(self.gate.target_fps > 0.0) {
            return Err(Config(format!(
                "target_fps must be positive, got {}",
                self.gate.target_fps
            )));
        }
        if self.gate.batch_size == 0 {
            return Err(Config("batch_size must be positive".into()));
        }
        if !(self.fusion.threshold > 0.0 && self.fusion.threshold < 1.0) {
            return Err(Config(format!(
                "fusion threshold must lie in (0, 1), got {}",
                self.fusion.threshold
            )));
        }
        let a = &self.alarm;
        if !(0.0..=1.0).contains(&a.volume_floor)
            || a.volume_cap > 1.0
            || a.volume_floor > a.volume_cap
        {
            return Err(Config(format!(
                "alarm volumes must satisfy 0 <= floor <= cap <= 1, got {}..{}",
                a.volume_floor, a.volume_cap
            )));
        }
        if !(a.volume_step > 0.0) || a.tick_period_ms == 0 {
            return Err(Config("alarm step and tick period must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = DmsConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.gate.batch_size, 240);
        assert_eq!(config.alarm.tick_period_ms, 500);
    }

    #[test]
    fn test_rejects_bad_threshold() {
        let mut config = DmsConfig::default();
        config.fusion.threshold = 1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_model_dir() {
        let config = DmsConfig::default().with_model_dir("/opt/models");
        assert_eq!(
            config.models.head.as_deref(),
            Some(std::path::Path::new("/opt/models/head_model.json"))
        );
    }
}
