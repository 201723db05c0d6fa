//! Feature Vector Assembly

use crate::landmarks::{LandmarkLayout, LandmarkSet, Point3};
use crate::{Channel, FeatureError, COORDS_PER_POINT};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Flattened eye/head/pose vectors for one batch
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChannelFeatures {
    /// Eye channel (batch_size * eye_width * 3)
    pub eye: Vec<f32>,
    /// Head channel (batch_size * head_width * 3)
    pub head: Vec<f32>,
    /// Pose channel (batch_size * pose_width * 3)
    pub pose: Vec<f32>,
    /// Frames whose face detection was absent or short
    pub missing_face: usize,
    /// Frames whose pose detection was absent or short
    pub missing_pose: usize,
}

impl ChannelFeatures {
    /// Vector for `channel`
    pub fn get(&self, channel: Channel) -> &[f32] {
        match channel {
            Channel::Eye => &self.eye,
            Channel::Head => &self.head,
            Channel::Pose => &self.pose,
        }
    }
}

/// Feature extractor that flattens landmark batches, frame-major
pub struct FeatureExtractor {
    layout: LandmarkLayout,
    batch_size: usize,
}

impl FeatureExtractor {
    /// Create a new feature extractor
    pub fn new(layout: LandmarkLayout, batch_size: usize) -> Self {
        Self { layout, batch_size }
    }

    /// Length of the flattened vector for `channel`
    pub fn vector_len(&self, channel: Channel) -> usize {
        self.batch_size * self.layout.width(channel) * COORDS_PER_POINT
    }

    pub fn layout(&self) -> &LandmarkLayout {
        &self.layout
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Extract the three channel vectors from one batch of landmark results.
    ///
    /// A frame with a missing (or too short) detection contributes zeros of
    /// the channel width, so lengths never depend on detection success.
    pub fn extract(&self, batch: &[LandmarkSet]) -> Result<ChannelFeatures, FeatureError> {
        if batch.len() != self.batch_size {
            return Err(FeatureError::BatchSize {
                expected: self.batch_size,
                actual: batch.len(),
            });
        }

        let mut features = ChannelFeatures {
            eye: Vec::with_capacity(self.vector_len(Channel::Eye)),
            head: Vec::with_capacity(self.vector_len(Channel::Head)),
            pose: Vec::with_capacity(self.vector_len(Channel::Pose)),
            missing_face: 0,
            missing_pose: 0,
        };

        for set in batch {
            match usable(set.face.as_deref(), self.layout.face_count()) {
                Some(face) => {
                    push_points(&mut features.eye, face, self.layout.indices(Channel::Eye));
                    push_points(&mut features.head, face, self.layout.indices(Channel::Head));
                }
                None => {
                    features.missing_face += 1;
                    pad(&mut features.eye, self.layout.width(Channel::Eye));
                    pad(&mut features.head, self.layout.width(Channel::Head));
                }
            }

            match usable(set.pose.as_deref(), self.layout.pose_count()) {
                Some(pose) => {
                    push_points(&mut features.pose, pose, self.layout.indices(Channel::Pose));
                }
                None => {
                    features.missing_pose += 1;
                    pad(&mut features.pose, self.layout.width(Channel::Pose));
                }
            }
        }

        debug!(
            "Extracted features: eye={}, head={}, pose={} (missing face={}, pose={})",
            features.eye.len(),
            features.head.len(),
            features.pose.len(),
            features.missing_face,
            features.missing_pose
        );

        Ok(features)
    }
}

fn usable(points: Option<&[Point3]>, required: usize) -> Option<&[Point3]> {
    points.filter(|p| p.len() >= required)
}

fn push_points(out: &mut Vec<f32>, points: &[Point3], indices: &[usize]) {
    for &i in indices {
        let p = points[i];
        out.extend_from_slice(&[p.x, p.y, p.z]);
    }
}

fn pad(out: &mut Vec<f32>, width: usize) {
    out.resize(out.len() + width * COORDS_PER_POINT, 0.0);
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn small_layout() -> LandmarkLayout {
        // face: 5 points, eye = {1, 3}, head = {0, 2, 4}; pose: 4 points, pick {0, 2}
        LandmarkLayout::new(5, &[3, 1], 4, &[2, 0]).unwrap()
    }

    fn points(n: usize, base: f32) -> Vec<Point3> {
        (0..n)
            .map(|i| Point3::new(base + i as f32, base + i as f32 + 0.5, base + i as f32 + 0.25))
            .collect()
    }

    #[test]
    fn test_partition_and_flatten_order() {
        let extractor = FeatureExtractor::new(small_layout(), 2);
        let batch = vec![
            LandmarkSet::new(Some(points(5, 0.0)), Some(points(4, 10.0))),
            LandmarkSet::new(Some(points(5, 100.0)), Some(points(4, 110.0))),
        ];

        let f = extractor.extract(&batch).unwrap();

        assert_eq!(
            f.eye,
            vec![
                1.0, 1.5, 1.25, 3.0, 3.5, 3.25, // frame 0
                101.0, 101.5, 101.25, 103.0, 103.5, 103.25, // frame 1
            ]
        );
        assert_eq!(&f.head[..9], &[0.0, 0.5, 0.25, 2.0, 2.5, 2.25, 4.0, 4.5, 4.25]);
        assert_eq!(&f.pose[..6], &[10.0, 10.5, 10.25, 12.0, 12.5, 12.25]);
        assert_eq!(f.missing_face, 0);
        assert_eq!(f.missing_pose, 0);
    }

    #[test]
    fn test_missing_detection_is_zero_padded_in_place() {
        let extractor = FeatureExtractor::new(small_layout(), 3);
        let batch = vec![
            LandmarkSet::new(Some(points(5, 1.0)), None),
            LandmarkSet::missing(),
            LandmarkSet::new(Some(points(2, 1.0)), Some(points(4, 1.0))),
        ];

        let f = extractor.extract(&batch).unwrap();

        assert_eq!(f.eye.len(), 3 * 2 * 3);
        assert_eq!(f.head.len(), 3 * 3 * 3);
        assert_eq!(f.pose.len(), 3 * 2 * 3);
        // frame 1 and the short frame 2 face are zeros, frame 0 is not
        assert!(f.eye[..6].iter().all(|&v| v != 0.0));
        assert!(f.eye[6..].iter().all(|&v| v == 0.0));
        // frame 0 and frame 1 pose are zeros, frame 2 is not
        assert!(f.pose[..12].iter().all(|&v| v == 0.0));
        assert!(f.pose[12..].iter().any(|&v| v != 0.0));
        assert_eq!(f.missing_face, 2);
        assert_eq!(f.missing_pose, 2);
    }

    #[test]
    fn test_rejects_wrong_batch_size() {
        let extractor = FeatureExtractor::new(small_layout(), 3);
        let err = extractor.extract(&[LandmarkSet::missing()]).unwrap_err();
        assert!(matches!(err, FeatureError::BatchSize { expected: 3, actual: 1 }));
    }

    #[test]
    fn test_mediapipe_vector_lengths() {
        let extractor = FeatureExtractor::new(LandmarkLayout::mediapipe(), 240);
        assert_eq!(extractor.vector_len(Channel::Eye), 240 * 42 * 3);
        assert_eq!(extractor.vector_len(Channel::Head), 240 * 436 * 3);
        assert_eq!(extractor.vector_len(Channel::Pose), 240 * 13 * 3);
    }

    proptest! {
        #[test]
        fn lengths_are_invariant_to_failures(
            mask in proptest::collection::vec((any::<bool>(), any::<bool>()), 1..32),
        ) {
            let extractor = FeatureExtractor::new(small_layout(), mask.len());
            let batch: Vec<LandmarkSet> = mask
                .iter()
                .map(|&(face, pose)| LandmarkSet::new(
                    face.then(|| points(5, 1.0)),
                    pose.then(|| points(4, 1.0)),
                ))
                .collect();

            let f = extractor.extract(&batch).unwrap();
            prop_assert_eq!(f.eye.len(), extractor.vector_len(Channel::Eye));
            prop_assert_eq!(f.head.len(), extractor.vector_len(Channel::Head));
            prop_assert_eq!(f.pose.len(), extractor.vector_len(Channel::Pose));
            prop_assert_eq!(f.missing_face, mask.iter().filter(|m| !m.0).count());
        }
    }
}
