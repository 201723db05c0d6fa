//! Alarm state machine

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Distance from the cap treated as having reached it
const VOLUME_EPSILON: f32 = 1e-6;

/// Alarm configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlarmConfig {
    /// Volume playback starts at and returns to on dismissal
    pub volume_floor: f32,
    /// Increase per escalation tick
    pub volume_step: f32,
    /// Maximum volume
    pub volume_cap: f32,
    /// Escalation tick period (milliseconds)
    pub tick_period_ms: u64,
}

impl Default for AlarmConfig {
    fn default() -> Self {
        Self {
            volume_floor: 0.1,
            volume_step: 0.1,
            volume_cap: 1.0,
            tick_period_ms: 500,
        }
    }
}

impl AlarmConfig {
    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_period_ms)
    }
}

/// Alarm lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlarmState {
    #[default]
    Idle,
    Alerting,
    Escalating,
    /// Transient: passed through on dismissal before returning to Idle
    Dismissed,
}

/// What the alert surface needs to render
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlarmSnapshot {
    pub state: AlarmState,
    pub volume: f32,
    pub show_alert: bool,
}

/// Pure alarm state; timing is driven from outside via [`Alarm::tick`]
#[derive(Debug, Clone)]
pub struct Alarm {
    config: AlarmConfig,
    state: AlarmState,
    volume: f32,
    escalation_started: Option<Instant>,
}

impl Alarm {
    pub fn new(config: AlarmConfig) -> Self {
        Self {
            state: AlarmState::Idle,
            volume: config.volume_floor,
            escalation_started: None,
            config,
        }
    }

    /// Start alerting. Only valid from Idle; returns whether it took effect.
    pub fn trigger(&mut self) -> bool {
        if self.state != AlarmState::Idle {
            debug!("Alarm already {:?}, ignoring trigger", self.state);
            return false;
        }
        self.state = AlarmState::Alerting;
        self.volume = self.config.volume_floor;
        self.escalation_started = Some(Instant::now());
        info!("Drowsiness alarm triggered at volume {:.2}", self.volume);
        true
    }

    /// Raise the volume by one step. Returns the new volume, or `None` when
    /// no tick is due (alarm inactive or already at the cap).
    pub fn tick(&mut self) -> Option<f32> {
        if !self.needs_escalation() {
            return None;
        }
        let cap = self.config.volume_cap;
        let mut next = (self.volume + self.config.volume_step).min(cap);
        if cap - next < VOLUME_EPSILON {
            next = cap;
        }
        self.volume = next;
        self.state = AlarmState::Escalating;
        debug!("Alarm volume raised to {:.2}", self.volume);
        Some(self.volume)
    }

    /// Stop alerting and reset. Only valid while active; returns whether it took effect.
    pub fn dismiss(&mut self) -> bool {
        if !self.is_active() {
            return false;
        }
        self.state = AlarmState::Dismissed;
        let elapsed = self
            .escalation_started
            .take()
            .map(|t| t.elapsed())
            .unwrap_or_default();
        info!(
            "Alarm dismissed after {:.1}s at volume {:.2}",
            elapsed.as_secs_f32(),
            self.volume
        );
        self.volume = self.config.volume_floor;
        self.state = AlarmState::Idle;
        true
    }

    /// Alerting or Escalating
    pub fn is_active(&self) -> bool {
        matches!(self.state, AlarmState::Alerting | AlarmState::Escalating)
    }

    /// Whether further ticks would change the volume
    pub fn needs_escalation(&self) -> bool {
        self.is_active() && self.volume < self.config.volume_cap
    }

    pub fn state(&self) -> AlarmState {
        self.state
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn escalation_started(&self) -> Option<Instant> {
        self.escalation_started
    }

    pub fn config(&self) -> &AlarmConfig {
        &self.config
    }

    pub fn snapshot(&self) -> AlarmSnapshot {
        AlarmSnapshot {
            state: self.state,
            volume: self.volume,
            show_alert: self.is_active(),
        }
    }
}

impl Default for Alarm {
    fn default() -> Self {
        Self::new(AlarmConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigger_from_idle() {
        let mut alarm = Alarm::default();
        assert!(alarm.trigger());
        assert_eq!(alarm.state(), AlarmState::Alerting);
        assert_eq!(alarm.volume(), 0.1);
        assert!(alarm.snapshot().show_alert);
        assert!(alarm.escalation_started().is_some());

        // Re-trigger while active is a no-op
        alarm.tick();
        assert!(!alarm.trigger());
        assert_eq!(alarm.state(), AlarmState::Escalating);
    }

    #[test]
    fn test_escalates_to_cap_in_nine_ticks() {
        let mut alarm = Alarm::default();
        alarm.trigger();

        for _ in 0..9 {
            assert!(alarm.tick().is_some());
        }
        assert_eq!(alarm.volume(), 1.0);
        assert_eq!(alarm.state(), AlarmState::Escalating);
        assert!(!alarm.needs_escalation());

        assert_eq!(alarm.tick(), None);
        assert_eq!(alarm.volume(), 1.0);
    }

    #[test]
    fn test_first_tick_enters_escalating() {
        let mut alarm = Alarm::default();
        alarm.trigger();
        let v = alarm.tick().unwrap();
        assert!((v - 0.2).abs() < 1e-6);
        assert_eq!(alarm.state(), AlarmState::Escalating);
    }

    #[test]
    fn test_dismiss_resets_from_any_active_state() {
        let mut alarm = Alarm::default();
        alarm.trigger();
        assert!(alarm.dismiss());
        assert_eq!(alarm.state(), AlarmState::Idle);
        assert_eq!(alarm.volume(), 0.1);

        alarm.trigger();
        for _ in 0..5 {
            alarm.tick();
        }
        assert!(alarm.dismiss());
        assert_eq!(alarm.state(), AlarmState::Idle);
        assert_eq!(alarm.volume(), 0.1);
        assert!(!alarm.snapshot().show_alert);
        assert!(alarm.escalation_started().is_none());

        // Ready to fire again
        assert!(alarm.trigger());
    }

    #[test]
    fn test_idle_ignores_tick_and_dismiss() {
        let mut alarm = Alarm::default();
        assert_eq!(alarm.tick(), None);
        assert!(!alarm.dismiss());
        assert_eq!(alarm.volume(), 0.1);
        assert_eq!(alarm.state(), AlarmState::Idle);
    }

    #[test]
    fn test_cap_not_a_multiple_of_step() {
        let mut alarm = Alarm::new(AlarmConfig {
            volume_floor: 0.5,
            volume_step: 0.3,
            volume_cap: 1.0,
            tick_period_ms: 100,
        });
        alarm.trigger();
        assert!((alarm.tick().unwrap() - 0.8).abs() < 1e-6);
        assert_eq!(alarm.tick(), Some(1.0));
        assert_eq!(alarm.tick(), None);
    }
}
