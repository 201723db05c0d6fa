//! Timer-driven alarm controller

use crate::alarm::{Alarm, AlarmConfig, AlarmSnapshot};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use tracing::{debug, info, warn};

/// Audio and alert-surface sink driven by the alarm
pub trait AlarmOutput: Send + Sync + 'static {
    fn start_playback(&self, volume: f32);
    fn set_volume(&self, volume: f32);
    fn stop_playback(&self);
    fn show_alert(&self, visible: bool);
}

/// Output that only logs, for headless deployments
#[derive(Debug, Default, Clone, Copy)]
pub struct LogOutput;

impl AlarmOutput for LogOutput {
    fn start_playback(&self, volume: f32) {
        warn!("ALARM: playback started at volume {:.2}", volume);
    }

    fn set_volume(&self, volume: f32) {
        warn!("ALARM: volume {:.2}", volume);
    }

    fn stop_playback(&self) {
        info!("ALARM: playback stopped");
    }

    fn show_alert(&self, visible: bool) {
        info!("ALARM: alert surface {}", if visible { "shown" } else { "hidden" });
    }
}

struct Inner {
    alarm: Alarm,
    /// Bumped on every trigger/dismiss; a tick from an older generation is void
    generation: u64,
    escalation: Option<JoinHandle<()>>,
}

struct Shared {
    inner: Mutex<Inner>,
    output: Arc<dyn AlarmOutput>,
    status: watch::Sender<AlarmSnapshot>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn publish(&self, alarm: &Alarm) {
        self.status.send_replace(alarm.snapshot());
    }
}

/// Owns the alarm and its escalation timer
///
/// Must be used from within a tokio runtime: triggering spawns the
/// escalation task.
#[derive(Clone)]
pub struct AlarmController {
    shared: Arc<Shared>,
}

impl AlarmController {
    pub fn new(config: AlarmConfig, output: Arc<dyn AlarmOutput>) -> Self {
        let alarm = Alarm::new(config);
        let (status, _) = watch::channel(alarm.snapshot());
        Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner {
                    alarm,
                    generation: 0,
                    escalation: None,
                }),
                output,
                status,
            }),
        }
    }

    /// Start the alarm if idle; returns whether it fired
    pub fn trigger(&self) -> bool {
        let mut inner = self.shared.lock();
        if !inner.alarm.trigger() {
            return false;
        }
        inner.generation += 1;

        let output = &self.shared.output;
        output.start_playback(inner.alarm.volume());
        output.show_alert(true);
        self.shared.publish(&inner.alarm);

        let period = inner.alarm.config().tick_period();
        let generation = inner.generation;
        let shared = Arc::clone(&self.shared);
        inner.escalation = Some(tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            loop {
                ticker.tick().await;
                let mut inner = shared.lock();
                if inner.generation != generation {
                    break;
                }
                let Some(volume) = inner.alarm.tick() else {
                    break;
                };
                shared.output.set_volume(volume);
                shared.publish(&inner.alarm);
                if !inner.alarm.needs_escalation() {
                    debug!("Alarm volume capped at {:.2}", volume);
                    inner.escalation = None;
                    break;
                }
            }
        }));
        true
    }

    /// Driver acknowledged the alert; returns whether an alarm was active
    pub fn dismiss(&self) -> bool {
        let mut inner = self.shared.lock();
        if !inner.alarm.dismiss() {
            return false;
        }
        inner.generation += 1;
        if let Some(handle) = inner.escalation.take() {
            handle.abort();
        }

        let output = &self.shared.output;
        output.stop_playback();
        output.show_alert(false);
        self.shared.publish(&inner.alarm);
        true
    }

    /// Alerting or Escalating
    pub fn is_active(&self) -> bool {
        self.shared.lock().alarm.is_active()
    }

    pub fn snapshot(&self) -> AlarmSnapshot {
        self.shared.lock().alarm.snapshot()
    }

    /// Observe alarm changes
    pub fn subscribe(&self) -> watch::Receiver<AlarmSnapshot> {
        self.shared.status.subscribe()
    }

    /// Whether an escalation task is still scheduled
    pub fn is_escalating(&self) -> bool {
        self.shared
            .lock()
            .escalation
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }
}
