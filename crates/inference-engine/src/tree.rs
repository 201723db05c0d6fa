//! Array-backed binary decision tree

use crate::InferenceError;

/// Child sentinel marking a leaf
pub const LEAF: i32 = -1;

/// Binary decision tree stored as parallel arrays
///
/// Node `i` is a leaf when both children are [`LEAF`]; otherwise both
/// children index into the same arrays. Validated on construction.
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionTree {
    children_left: Vec<i32>,
    children_right: Vec<i32>,
    feature_index: Vec<i32>,
    threshold: Vec<f64>,
    leaf_value: Vec<f64>,
}

impl DecisionTree {
    pub fn new(
        children_left: Vec<i32>,
        children_right: Vec<i32>,
        feature_index: Vec<i32>,
        threshold: Vec<f64>,
        leaf_value: Vec<f64>,
    ) -> Result<Self, InferenceError> {
        let n = children_left.len();
        if n == 0 {
            return Err(InferenceError::CorruptModel("tree has no nodes".into()));
        }
        let lens = [
            children_right.len(),
            feature_index.len(),
            threshold.len(),
            leaf_value.len(),
        ];
        if lens.iter().any(|&l| l != n) {
            return Err(InferenceError::CorruptModel(format!(
                "node array lengths differ: left={}, right={}, feature={}, threshold={}, value={}",
                n, lens[0], lens[1], lens[2], lens[3]
            )));
        }

        let in_range = |c: i32| c >= 0 && (c as usize) < n;
        for node in 0..n {
            let (l, r) = (children_left[node], children_right[node]);
            match (l == LEAF, r == LEAF) {
                (true, true) => {}
                (false, false) if in_range(l) && in_range(r) => {
                    if feature_index[node] < 0 {
                        return Err(InferenceError::CorruptModel(format!(
                            "node {} splits on negative feature {}",
                            node, feature_index[node]
                        )));
                    }
                }
                _ => {
                    return Err(InferenceError::CorruptModel(format!(
                        "node {} has invalid children ({}, {})",
                        node, l, r
                    )));
                }
            }
        }

        Ok(Self {
            children_left,
            children_right,
            feature_index,
            threshold,
            leaf_value,
        })
    }

    /// Tree consisting of a single leaf
    pub fn leaf(value: f64) -> Self {
        Self {
            children_left: vec![LEAF],
            children_right: vec![LEAF],
            feature_index: vec![LEAF],
            threshold: vec![0.0],
            leaf_value: vec![value],
        }
    }

    /// Copy with every leaf value multiplied by `factor`
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            leaf_value: self.leaf_value.iter().map(|v| v * factor).collect(),
            ..self.clone()
        }
    }

    pub fn node_count(&self) -> usize {
        self.children_left.len()
    }

    pub fn is_leaf(&self, node: usize) -> bool {
        self.children_left[node] == LEAF && self.children_right[node] == LEAF
    }

    /// Smallest feature vector length this tree can be evaluated against
    pub fn required_features(&self) -> usize {
        (0..self.node_count())
            .filter(|&i| !self.is_leaf(i))
            .map(|i| self.feature_index[i] as usize + 1)
            .max()
            .unwrap_or(0)
    }

    /// Walk from the root to a leaf and return its value.
    ///
    /// `features[feature] <= threshold` goes left, anything else (NaN
    /// included) goes right. A walk longer than the node count can only be a
    /// cycle and is reported as corruption.
    pub fn evaluate(&self, features: &[f32]) -> Result<f64, InferenceError> {
        let max_depth = self.node_count();
        let mut node = 0usize;

        for _ in 0..=max_depth {
            if self.is_leaf(node) {
                return Ok(self.leaf_value[node]);
            }
            let index = self.feature_index[node] as usize;
            let value = *features
                .get(index)
                .ok_or(InferenceError::FeatureIndexOutOfBounds {
                    index,
                    len: features.len(),
                })?;
            node = if (value as f64) <= self.threshold[node] {
                self.children_left[node] as usize
            } else {
                self.children_right[node] as usize
            };
        }

        Err(InferenceError::CorruptModel(format!(
            "traversal exceeded depth guard of {} nodes",
            max_depth
        )))
    }
}
