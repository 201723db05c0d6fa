//! Alerting System
//!
//! Drives the drowsiness alarm: shows the alert surface, starts playback at
//! a low volume and raises it on a fixed period until the driver dismisses.

mod alarm;
mod controller;

pub use alarm::{Alarm, AlarmConfig, AlarmSnapshot, AlarmState};
pub use controller::{AlarmController, AlarmOutput, LogOutput};
