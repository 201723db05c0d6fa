//! Landmark engine boundary

use crate::DmsError;
use camera_capture::VideoFrame;
use feature_engine::{Channel, LandmarkLayout, LandmarkSet, Point3};
use tracing::debug;

/// External face and body-pose landmark model
///
/// Implementations are shared across detection workers and must be usable
/// concurrently.
pub trait LandmarkEngine: Send + Sync + 'static {
    /// Normalized 3D face mesh points
    fn detect_face(&self, frame: &VideoFrame) -> Result<Vec<Point3>, DmsError>;

    /// Normalized 3D body pose points
    fn detect_pose(&self, frame: &VideoFrame) -> Result<Vec<Point3>, DmsError>;
}

/// Run both detections on one frame; failures become absent channels
pub fn detect_frame(engine: &dyn LandmarkEngine, frame: &VideoFrame) -> LandmarkSet {
    let face = engine
        .detect_face(frame)
        .map_err(|e| debug!("Frame #{}: face detection failed: {}", frame.sequence, e))
        .ok();
    let pose = engine
        .detect_pose(frame)
        .map_err(|e| debug!("Frame #{}: pose detection failed: {}", frame.sequence, e))
        .ok();
    LandmarkSet::new(face, pose)
}

/// Detect landmarks for a whole batch on up to `workers` threads,
/// returning results in frame order
pub fn detect_batch(
    engine: &dyn LandmarkEngine,
    frames: &[VideoFrame],
    workers: usize,
) -> Vec<LandmarkSet> {
    let workers = workers.max(1);
    if workers == 1 || frames.len() <= 1 {
        return frames.iter().map(|f| detect_frame(engine, f)).collect();
    }

    let chunk = frames.len().div_ceil(workers);
    std::thread::scope(|scope| {
        let handles: Vec<_> = frames
            .chunks(chunk)
            .map(|part| {
                scope.spawn(move || {
                    part.iter()
                        .map(|f| detect_frame(engine, f))
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        handles
            .into_iter()
            .flat_map(|h| match h.join() {
                Ok(sets) => sets,
                Err(_) => {
                    debug!("Detection worker panicked; padding its frames");
                    vec![LandmarkSet::missing(); chunk]
                }
            })
            .take(frames.len())
            .collect()
    })
}

/// Deterministic stand-in for the landmark model, used when no real engine
/// is wired in
///
/// Eye openness follows frame brightness: darker frames produce narrower
/// eyelid gaps.
#[derive(Debug, Clone)]
pub struct MockLandmarkEngine {
    layout: LandmarkLayout,
    /// Fail both detections on every n-th frame
    fail_every: Option<u32>,
}

impl MockLandmarkEngine {
    pub fn new(layout: LandmarkLayout) -> Self {
        Self {
            layout,
            fail_every: None,
        }
    }

    /// Fail detection on frames whose sequence number is a multiple of `n`
    pub fn failing_every(mut self, n: u32) -> Self {
        self.fail_every = Some(n.max(1));
        self
    }

    fn fails(&self, frame: &VideoFrame) -> bool {
        self.fail_every
            .is_some_and(|n| frame.sequence % n == 0)
    }
}

impl Default for MockLandmarkEngine {
    fn default() -> Self {
        Self::new(LandmarkLayout::mediapipe())
    }
}

impl LandmarkEngine for MockLandmarkEngine {
    fn detect_face(&self, frame: &VideoFrame) -> Result<Vec<Point3>, DmsError> {
        if self.fails(frame) {
            return Err(DmsError::NoFace);
        }
        let openness = frame.mean_luma();
        let count = self.layout.face_count();
        let eye = self.layout.indices(Channel::Eye);
        let points = (0..count)
            .map(|i| {
                let x = (i % 22) as f32 / 22.0;
                let mut y = (i / 22) as f32 / 22.0;
                if eye.binary_search(&i).is_ok() {
                    y += 0.01 * openness * if i % 2 == 0 { 1.0 } else { -1.0 };
                }
                Point3::new(x, y, 0.0)
            })
            .collect();
        Ok(points)
    }

    fn detect_pose(&self, frame: &VideoFrame) -> Result<Vec<Point3>, DmsError> {
        if self.fails(frame) {
            return Err(DmsError::NoPose);
        }
        let count = self.layout.pose_count();
        Ok((0..count)
            .map(|i| Point3::new(0.5, i as f32 / count as f32, -0.1))
            .collect())
    }
}
