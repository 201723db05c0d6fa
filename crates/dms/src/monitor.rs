//! Capture-to-decision pipeline context
//!
//! Frame admission runs on the caller's (producer's) thread under a single
//! mutex; landmark detection and classification run on the blocking pool so
//! the producer is never held up. The gate's processing flag is the only
//! synchronization between consecutive batches.

use crate::analysis::{BatchAnalysis, Verdict};
use crate::detector::{detect_batch, LandmarkEngine};
use crate::state::MonitorStatus;
use crate::{DmsConfig, DmsError};
use alerting::{AlarmController, AlarmOutput};
use camera_capture::VideoFrame;
use feature_engine::{FeatureExtractor, LandmarkLayout};
use frame_gate::{Batch, DropReason, FrameGate, GateOutcome};
use inference_engine::{FusionPredictor, InferenceError};
use metrics::counter;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

struct Shared {
    gate: Mutex<FrameGate>,
    engine: Option<Arc<dyn LandmarkEngine>>,
    extractor: FeatureExtractor,
    predictor: FusionPredictor,
    alarm: AlarmController,
    detection_workers: usize,
    runtime: Handle,
    status: watch::Sender<MonitorStatus>,
    last_analysis: Mutex<Option<BatchAnalysis>>,
}

impl Shared {
    fn lock_gate(&self) -> MutexGuard<'_, FrameGate> {
        self.gate.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn publish(&self, gate: &FrameGate) {
        self.status.send_modify(|s| {
            s.is_recording = gate.is_recording();
            s.is_processing = gate.is_processing();
        });
    }

    /// Landmarks, features and fused verdict for one batch (blocking)
    fn analyze(&self, batch: Batch) -> BatchAnalysis {
        let start = Instant::now();
        let Batch { frames, epoch } = batch;

        let Some(engine) = self.engine.as_deref() else {
            return BatchAnalysis::undetermined(
                epoch,
                frames.len(),
                "landmark engine not initialized",
            );
        };

        let landmarks = detect_batch(engine, &frames, self.detection_workers);
        drop(frames);

        let features = match self.extractor.extract(&landmarks) {
            Ok(features) => features,
            Err(e) => {
                error!("Feature extraction failed: {}", e);
                return BatchAnalysis::undetermined(epoch, landmarks.len(), e.to_string());
            }
        };

        let (verdict, outcome, error) = match self.predictor.predict(&features) {
            Ok(outcome) if outcome.drowsy => (Verdict::Drowsy, Some(outcome), None),
            Ok(outcome) => (Verdict::Alert, Some(outcome), None),
            Err(e @ InferenceError::NotInitialized(_)) => {
                warn!("Verdict undetermined: {}", e);
                (Verdict::Undetermined, None, Some(e.to_string()))
            }
            Err(e) => {
                error!("Classifier failure, verdict undetermined: {}", e);
                (Verdict::Undetermined, None, Some(e.to_string()))
            }
        };

        BatchAnalysis {
            epoch,
            frames: landmarks.len(),
            missing_face: features.missing_face,
            missing_pose: features.missing_pose,
            verdict,
            outcome,
            error,
            latency_ms: start.elapsed().as_millis() as u64,
        }
    }

    /// Release the gate and act on the verdict if its recording is still live
    fn complete(&self, analysis: BatchAnalysis) {
        counter!("batches_processed_total").increment(1);

        let surfaced = {
            let mut gate = self.lock_gate();
            let current = gate.finish_processing(analysis.epoch);
            if current && analysis.is_drowsy() && self.alarm.trigger() {
                counter!("alarms_triggered_total").increment(1);
            }
            self.status.send_modify(|s| {
                s.is_recording = gate.is_recording();
                s.is_processing = gate.is_processing();
                s.batches_completed += 1;
                if current {
                    s.last_verdict = Some(analysis.verdict);
                }
            });
            current
        };

        if !surfaced {
            info!(
                "Discarding {} verdict from stopped recording (epoch {})",
                analysis.verdict.as_str(),
                analysis.epoch
            );
            return;
        }

        counter!("verdicts_total", "verdict" => analysis.verdict.as_str()).increment(1);
        info!(
            "Batch verdict: {} ({} frames, {} without face, {} without pose, {}ms)",
            analysis.verdict.as_str(),
            analysis.frames,
            analysis.missing_face,
            analysis.missing_pose,
            analysis.latency_ms
        );
        *self
            .last_analysis
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(analysis);
    }
}

fn drop_label(reason: DropReason) -> &'static str {
    match reason {
        DropReason::NotRecording => "not_recording",
        DropReason::Processing => "processing",
        DropReason::AlarmActive => "alarm_active",
        DropReason::TooSoon => "too_soon",
    }
}

/// Drowsiness monitoring pipeline
///
/// Cheap to clone; all clones drive the same pipeline.
#[derive(Clone)]
pub struct DrowsinessMonitor {
    shared: Arc<Shared>,
}

impl DrowsinessMonitor {
    /// Assemble a pipeline from its parts. Must be called inside a tokio
    /// runtime, which later runs batch processing.
    pub fn new(
        config: &DmsConfig,
        layout: LandmarkLayout,
        engine: Option<Arc<dyn LandmarkEngine>>,
        mut predictor: FusionPredictor,
        alarm: AlarmController,
    ) -> Result<Self, DmsError> {
        config.validate()?;
        let runtime = Handle::try_current()
            .map_err(|e| DmsError::Config(format!("no tokio runtime: {}", e)))?;

        let extractor = FeatureExtractor::new(layout, config.gate.batch_size);
        predictor.enforce_input_widths(|channel| extractor.vector_len(channel));
        predictor.log_status();
        if engine.is_none() {
            warn!("No landmark engine initialized; verdicts will be undetermined");
        }

        let (status, _) = watch::channel(MonitorStatus::default());
        info!(
            "Drowsiness monitor ready: {} frames/batch at {}fps, {} detection workers",
            config.gate.batch_size, config.gate.target_fps, config.detection_workers
        );

        Ok(Self {
            shared: Arc::new(Shared {
                gate: Mutex::new(FrameGate::new(config.gate.clone())),
                engine,
                extractor,
                predictor,
                alarm,
                detection_workers: config.detection_workers,
                runtime,
                status,
                last_analysis: Mutex::new(None),
            }),
        })
    }

    /// Load the configured models and build the pipeline with the default layout
    pub fn from_config(
        config: &DmsConfig,
        engine: Option<Arc<dyn LandmarkEngine>>,
        output: Arc<dyn AlarmOutput>,
    ) -> Result<Self, DmsError> {
        let predictor = FusionPredictor::load(config.fusion, &config.models);
        let alarm = AlarmController::new(config.alarm.clone(), output);
        Self::new(config, LandmarkLayout::mediapipe(), engine, predictor, alarm)
    }

    /// Offer one camera frame. Never blocks on processing.
    pub fn on_frame(&self, frame: VideoFrame) {
        let outcome = {
            let mut gate = self.shared.lock_gate();
            // Read under the gate lock; completion triggers the alarm while holding it
            let alarm_active = self.shared.alarm.is_active();
            let outcome = gate.on_frame(frame, alarm_active);
            if matches!(outcome, GateOutcome::BatchReady(_)) {
                self.shared.publish(&gate);
            }
            outcome
        };

        match outcome {
            GateOutcome::Dropped(reason) => {
                counter!("frames_dropped_total", "reason" => drop_label(reason)).increment(1);
            }
            GateOutcome::Admitted { .. } => {
                counter!("frames_admitted_total").increment(1);
            }
            GateOutcome::BatchReady(batch) => {
                counter!("frames_admitted_total").increment(1);
                self.spawn_processing(batch);
            }
        }
    }

    fn spawn_processing(&self, batch: Batch) {
        let shared = Arc::clone(&self.shared);
        debug!("Handing off batch of {} frames", batch.frames.len());
        self.shared.runtime.spawn(async move {
            let epoch = batch.epoch;
            let frames = batch.frames.len();
            let worker = Arc::clone(&shared);
            let analysis = match tokio::task::spawn_blocking(move || worker.analyze(batch)).await {
                Ok(analysis) => analysis,
                Err(e) => {
                    error!("Batch processing task failed: {}", e);
                    BatchAnalysis::undetermined(epoch, frames, e.to_string())
                }
            };
            shared.complete(analysis);
        });
    }

    /// Begin recording; returns false if already recording
    pub fn start_recording(&self) -> bool {
        let mut gate = self.shared.lock_gate();
        let started = gate.start_recording();
        self.shared.publish(&gate);
        started
    }

    /// Stop recording; a batch still in flight will not raise an alarm
    pub fn stop_recording(&self) {
        let mut gate = self.shared.lock_gate();
        gate.stop_recording();
        self.shared.publish(&gate);
    }

    /// Flip recording, returning the new state
    pub fn toggle_recording(&self) -> bool {
        let mut gate = self.shared.lock_gate();
        let recording = gate.toggle_recording();
        self.shared.publish(&gate);
        recording
    }

    /// Driver acknowledged the alert
    pub fn dismiss_alarm(&self) -> bool {
        self.shared.alarm.dismiss()
    }

    pub fn alarm(&self) -> &AlarmController {
        &self.shared.alarm
    }

    pub fn status(&self) -> MonitorStatus {
        *self.shared.status.borrow()
    }

    /// Observe recording/processing changes
    pub fn subscribe(&self) -> watch::Receiver<MonitorStatus> {
        self.shared.status.subscribe()
    }

    /// Most recent surfaced batch result
    pub fn last_analysis(&self) -> Option<BatchAnalysis> {
        self.shared
            .last_analysis
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Frames collected toward the next batch
    pub fn pending_frames(&self) -> usize {
        self.shared.lock_gate().batch_len()
    }

    /// Landmark engine and all three classifiers are available
    pub fn is_ready(&self) -> bool {
        self.shared.engine.is_some() && self.shared.predictor.is_ready()
    }

    /// Stop recording and silence any alarm
    pub fn shutdown(&self) {
        self.stop_recording();
        self.dismiss_alarm();
        info!("Drowsiness monitor shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::MockLandmarkEngine;
    use alerting::{AlarmConfig, LogOutput};
    use feature_engine::{Channel, Point3};
    use frame_gate::GateConfig;
    use inference_engine::{DecisionTree, EnsembleModel, FusionWeights};
    use std::time::Duration;

    fn layout() -> LandmarkLayout {
        LandmarkLayout::new(5, &[1, 3], 4, &[0, 2]).unwrap()
    }

    fn config(batch_size: usize) -> DmsConfig {
        DmsConfig {
            gate: GateConfig {
                batch_size,
                ..Default::default()
            },
            detection_workers: 2,
            ..Default::default()
        }
    }

    fn predictor(margin: Option<f64>) -> FusionPredictor {
        let mut predictor = FusionPredictor::new(FusionWeights::default());
        if let Some(m) = margin {
            for channel in Channel::ALL {
                predictor.set_model(
                    channel,
                    EnsembleModel::new(vec![DecisionTree::leaf(m)]).unwrap(),
                );
            }
        }
        predictor
    }

    fn monitor(
        batch_size: usize,
        margin: Option<f64>,
        engine: Option<Arc<dyn LandmarkEngine>>,
    ) -> DrowsinessMonitor {
        let alarm = AlarmController::new(AlarmConfig::default(), Arc::new(LogOutput));
        DrowsinessMonitor::new(&config(batch_size), layout(), engine, predictor(margin), alarm)
            .unwrap()
    }

    fn mock() -> Option<Arc<dyn LandmarkEngine>> {
        Some(Arc::new(MockLandmarkEngine::new(layout())))
    }

    fn frame(seq: u32, secs: f64) -> VideoFrame {
        VideoFrame::solid(2, 2, 120, (secs * 1e9) as u64, seq)
    }

    async fn wait_completed(monitor: &DrowsinessMonitor, n: u64) {
        let mut rx = monitor.subscribe();
        tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|s| s.batches_completed >= n))
            .await
            .expect("batch did not complete")
            .expect("status channel closed");
    }

    struct SlowEngine;

    impl LandmarkEngine for SlowEngine {
        fn detect_face(&self, _frame: &VideoFrame) -> Result<Vec<Point3>, DmsError> {
            std::thread::sleep(Duration::from_millis(100));
            Ok(vec![Point3::new(0.1, 0.2, 0.3); 5])
        }

        fn detect_pose(&self, _frame: &VideoFrame) -> Result<Vec<Point3>, DmsError> {
            Ok(vec![Point3::ZERO; 4])
        }
    }

    #[tokio::test]
    async fn test_drowsy_batch_raises_alarm_and_blocks_admission() {
        let monitor = monitor(4, Some(5.0), mock());
        assert!(monitor.is_ready());
        monitor.start_recording();

        for i in 0..4 {
            monitor.on_frame(frame(i, i as f64 * 0.05));
        }
        assert!(monitor.status().is_processing);
        assert_eq!(monitor.pending_frames(), 0);

        wait_completed(&monitor, 1).await;

        let status = monitor.status();
        assert!(!status.is_processing);
        assert_eq!(status.last_verdict, Some(Verdict::Drowsy));
        assert!(monitor.alarm().is_active());
        assert_eq!(monitor.alarm().snapshot().volume, 0.1);
        assert_eq!(monitor.last_analysis().unwrap().frames, 4);

        // Alarm showing: frames are dropped
        monitor.on_frame(frame(10, 1.0));
        assert_eq!(monitor.pending_frames(), 0);

        assert!(monitor.dismiss_alarm());
        monitor.on_frame(frame(11, 2.0));
        assert_eq!(monitor.pending_frames(), 1);
    }

    #[tokio::test]
    async fn test_alert_batch_keeps_collecting() {
        let monitor = monitor(2, Some(-4.0), mock());
        monitor.start_recording();
        monitor.on_frame(frame(0, 0.0));
        monitor.on_frame(frame(1, 0.1));
        wait_completed(&monitor, 1).await;

        assert_eq!(monitor.status().last_verdict, Some(Verdict::Alert));
        assert!(!monitor.alarm().is_active());
        monitor.on_frame(frame(2, 0.2));
        assert_eq!(monitor.pending_frames(), 1);
    }

    #[tokio::test]
    async fn test_verdict_after_stop_is_discarded() {
        let monitor = monitor(2, Some(5.0), Some(Arc::new(SlowEngine)));
        monitor.start_recording();
        monitor.on_frame(frame(0, 0.0));
        monitor.on_frame(frame(1, 0.1));
        assert!(monitor.status().is_processing);

        monitor.stop_recording();
        assert!(!monitor.status().is_processing);
        wait_completed(&monitor, 1).await;

        assert!(!monitor.alarm().is_active());
        assert_eq!(monitor.status().last_verdict, None);
        assert!(monitor.last_analysis().is_none());
        assert!(!monitor.status().is_recording);
    }

    #[tokio::test]
    async fn test_missing_models_are_undetermined() {
        let monitor = monitor(2, None, mock());
        assert!(!monitor.is_ready());
        monitor.start_recording();
        monitor.on_frame(frame(0, 0.0));
        monitor.on_frame(frame(1, 0.1));
        wait_completed(&monitor, 1).await;

        let analysis = monitor.last_analysis().unwrap();
        assert_eq!(analysis.verdict, Verdict::Undetermined);
        assert!(analysis.error.is_some());
        assert!(!monitor.alarm().is_active());
        assert!(!monitor.status().is_processing);
    }

    #[tokio::test]
    async fn test_missing_engine_is_undetermined() {
        let monitor = monitor(2, Some(5.0), None);
        monitor.start_recording();
        monitor.on_frame(frame(0, 0.0));
        monitor.on_frame(frame(1, 0.1));
        wait_completed(&monitor, 1).await;

        assert_eq!(monitor.status().last_verdict, Some(Verdict::Undetermined));
        assert!(!monitor.alarm().is_active());
    }

    #[tokio::test]
    async fn test_failed_detections_still_classify() {
        let engine = MockLandmarkEngine::new(layout()).failing_every(2);
        let monitor = monitor(4, Some(5.0), Some(Arc::new(engine)));
        monitor.start_recording();
        for i in 0..4 {
            monitor.on_frame(frame(i, i as f64 * 0.05));
        }
        wait_completed(&monitor, 1).await;

        let analysis = monitor.last_analysis().unwrap();
        assert_eq!(analysis.missing_face, 2);
        assert_eq!(analysis.missing_pose, 2);
        assert_eq!(analysis.verdict, Verdict::Drowsy);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_no_batch_starts_after_alarm_fires() {
        for _ in 0..50 {
            let monitor = monitor(1, Some(5.0), mock());
            monitor.start_recording();

            let producer = monitor.clone();
            tokio::task::spawn_blocking(move || {
                let mut after_alarm = 0;
                for i in 0..5_000u32 {
                    producer.on_frame(frame(i, i as f64 * 0.05));
                    if producer.alarm().is_active() {
                        after_alarm += 1;
                        if after_alarm > 20 {
                            break;
                        }
                    }
                    std::thread::yield_now();
                }
            })
            .await
            .unwrap();

            wait_completed(&monitor, 1).await;
            tokio::time::sleep(Duration::from_millis(20)).await;

            let status = monitor.status();
            assert!(monitor.alarm().is_active());
            assert_eq!(status.batches_completed, 1);
            assert!(!status.is_processing);
            assert_eq!(monitor.pending_frames(), 0);
            monitor.shutdown();
        }
    }

    #[tokio::test]
    async fn test_frames_ignored_until_started() {
        let monitor = monitor(2, Some(5.0), mock());
        monitor.on_frame(frame(0, 0.0));
        monitor.on_frame(frame(1, 0.1));
        assert_eq!(monitor.pending_frames(), 0);
        assert_eq!(monitor.status(), MonitorStatus::default());

        assert!(monitor.toggle_recording());
        assert!(monitor.status().is_recording);
        assert!(!monitor.toggle_recording());
        assert!(!monitor.status().is_recording);
    }

    #[test]
    fn test_requires_runtime() {
        let alarm = AlarmController::new(AlarmConfig::default(), Arc::new(LogOutput));
        let result = DrowsinessMonitor::new(&config(2), layout(), mock(), predictor(None), alarm);
        assert!(matches!(result, Err(DmsError::Config(_))));
    }
}
