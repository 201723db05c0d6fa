//! Landmark data model and channel index sets

use crate::{Channel, FeatureError};
use serde::{Deserialize, Serialize};

/// Face mesh landmark count (468 mesh points + 10 iris points)
pub const FACE_LANDMARK_COUNT: usize = 478;

/// Body pose landmark count
pub const POSE_LANDMARK_COUNT: usize = 33;

/// Face mesh indices feeding the eye channel: both eye contours plus the irises
pub const MEDIAPIPE_EYE_INDICES: [usize; 42] = [
    // right eye contour
    33, 7, 163, 144, 145, 153, 154, 155, 133, 246, 161, 160, 159, 158, 157, 173,
    // left eye contour
    263, 249, 390, 373, 374, 380, 381, 382, 362, 466, 388, 387, 386, 385, 384, 398,
    // irises
    468, 469, 470, 471, 472, 473, 474, 475, 476, 477,
];

/// Pose indices feeding the pose channel: nose, eyes, ears, mouth, shoulders
pub const MEDIAPIPE_POSE_INDICES: [usize; 13] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12];

/// Normalized 3D keypoint
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Point3 {
    pub const ZERO: Point3 = Point3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// Landmark engine output for one frame; `None` means detection failed
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LandmarkSet {
    pub face: Option<Vec<Point3>>,
    pub pose: Option<Vec<Point3>>,
}

impl LandmarkSet {
    pub fn new(face: Option<Vec<Point3>>, pose: Option<Vec<Point3>>) -> Self {
        Self { face, pose }
    }

    /// Placeholder for a frame where both detections failed
    pub fn missing() -> Self {
        Self::default()
    }
}

/// Which landmark indices feed which channel
///
/// Index sets are kept sorted so channel points are emitted in landmark order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LandmarkLayout {
    face_count: usize,
    pose_count: usize,
    eye_indices: Vec<usize>,
    head_indices: Vec<usize>,
    pose_indices: Vec<usize>,
}

impl LandmarkLayout {
    /// Build a layout; every face index outside `eye_indices` feeds the head channel
    pub fn new(
        face_count: usize,
        eye_indices: &[usize],
        pose_count: usize,
        pose_indices: &[usize],
    ) -> Result<Self, FeatureError> {
        let eye = Self::checked_set(Channel::Eye, eye_indices, face_count)?;
        let pose = Self::checked_set(Channel::Pose, pose_indices, pose_count)?;

        let mut is_eye = vec![false; face_count];
        for &i in &eye {
            is_eye[i] = true;
        }
        let head: Vec<usize> = (0..face_count).filter(|&i| !is_eye[i]).collect();
        if head.is_empty() {
            return Err(FeatureError::EmptyChannel(Channel::Head));
        }

        Ok(Self {
            face_count,
            pose_count,
            eye_indices: eye,
            head_indices: head,
            pose_indices: pose,
        })
    }

    /// Layout matching the face mesh and body pose models the classifiers were trained on
    pub fn mediapipe() -> Self {
        Self {
            face_count: FACE_LANDMARK_COUNT,
            pose_count: POSE_LANDMARK_COUNT,
            eye_indices: sorted(&MEDIAPIPE_EYE_INDICES),
            head_indices: (0..FACE_LANDMARK_COUNT)
                .filter(|i| !MEDIAPIPE_EYE_INDICES.contains(i))
                .collect(),
            pose_indices: sorted(&MEDIAPIPE_POSE_INDICES),
        }
    }

    fn checked_set(
        channel: Channel,
        indices: &[usize],
        count: usize,
    ) -> Result<Vec<usize>, FeatureError> {
        if indices.is_empty() {
            return Err(FeatureError::EmptyChannel(channel));
        }
        let set = sorted(indices);
        if let Some(&index) = set.iter().find(|&&i| i >= count) {
            return Err(FeatureError::IndexOutOfRange {
                channel,
                index,
                count,
            });
        }
        if let Some(w) = set.windows(2).find(|w| w[0] == w[1]) {
            return Err(FeatureError::DuplicateIndex {
                channel,
                index: w[0],
            });
        }
        Ok(set)
    }

    /// Landmark indices feeding `channel`
    pub fn indices(&self, channel: Channel) -> &[usize] {
        match channel {
            Channel::Eye => &self.eye_indices,
            Channel::Head => &self.head_indices,
            Channel::Pose => &self.pose_indices,
        }
    }

    /// Points per frame in `channel`
    pub fn width(&self, channel: Channel) -> usize {
        self.indices(channel).len()
    }

    /// Face landmarks a detection must provide
    pub fn face_count(&self) -> usize {
        self.face_count
    }

    /// Pose landmarks a detection must provide
    pub fn pose_count(&self) -> usize {
        self.pose_count
    }
}

impl Default for LandmarkLayout {
    fn default() -> Self {
        Self::mediapipe()
    }
}

fn sorted(indices: &[usize]) -> Vec<usize> {
    let mut v = indices.to_vec();
    v.sort_unstable();
    v
}
