use crate::config::TreeConfig;
use crate::engine::features::{FEATURE_NAMES, N_FEATURES};
use crate::error::{AppError, Result};
use crate::models::{Segment, SegmentPrediction};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const N_CLASSES: usize = Segment::ALL.len();

/// A node in the segmentation tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
enum TreeNode {
    /// Internal decision node; samples with feature <= threshold go left.
    Split {
        feature: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
    /// Leaf with the dominant class and its fraction of leaf samples.
    Leaf {
        class: usize,
        purity: f64,
        n_samples: usize,
    },
}

/// A trained decision tree segmenter.
///
/// Built by recursive binary partitioning on Gini gain. Prediction
/// confidence is the purity (dominant-class fraction) of the reached
/// leaf. Training is deterministic: gain ties break on the earliest
/// feature index, then the lowest threshold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTreeModel {
    root: TreeNode,
    importance: Vec<f64>,
    pub trained_at: chrono::DateTime<chrono::Utc>,
    pub sample_count: usize,
}

impl DecisionTreeModel {
    /// Train a tree on the feature matrix and segment class indices.
    pub fn fit(x: &Array2<f64>, y: &[usize], config: &TreeConfig) -> Result<Self> {
        let n_samples = y.len();
        if n_samples == 0 || x.nrows() != n_samples {
            return Err(AppError::Internal(
                "training matrix and labels disagree".to_string(),
            ));
        }

        let indices: Vec<usize> = (0..n_samples).collect();
        let mut importance = vec![0.0; N_FEATURES];
        let root = build_node(x, y, &indices, 0, config, n_samples, &mut importance);

        // Normalize importance to sum to 1 (a stump-free tree keeps zeros).
        let total: f64 = importance.iter().sum();
        if total > 0.0 {
            for weight in &mut importance {
                *weight /= total;
            }
        }

        Ok(Self {
            root,
            importance,
            trained_at: chrono::Utc::now(),
            sample_count: n_samples,
        })
    }

    /// Walk the tree from the root and return the leaf's segment and purity.
    pub fn predict(&self, vector: &[f64; N_FEATURES]) -> SegmentPrediction {
        let mut node = &self.root;
        loop {
            match node {
                TreeNode::Leaf { class, purity, .. } => {
                    return SegmentPrediction::new(Segment::from_index(*class), *purity);
                }
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if vector[*feature] <= *threshold {
                        left
                    } else {
                        right
                    };
                }
            }
        }
    }

    /// Normalized impurity-decrease weight per feature.
    pub fn feature_importance(&self) -> BTreeMap<&'static str, f64> {
        FEATURE_NAMES
            .iter()
            .zip(self.importance.iter())
            .map(|(&name, &weight)| (name, weight))
            .collect()
    }

    /// Depth of the trained tree, used by tests and diagnostics.
    pub fn depth(&self) -> usize {
        fn depth_of(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 0,
                TreeNode::Split { left, right, .. } => 1 + depth_of(left).max(depth_of(right)),
            }
        }
        depth_of(&self.root)
    }
}

fn class_counts(y: &[usize], indices: &[usize]) -> [usize; N_CLASSES] {
    let mut counts = [0usize; N_CLASSES];
    for &i in indices {
        counts[y[i]] += 1;
    }
    counts
}

/// Gini impurity: 1 - sum(p_c^2)
fn gini(counts: &[usize; N_CLASSES], total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let n = total as f64;
    let mut impurity = 1.0;
    for &count in counts {
        let p = count as f64 / n;
        impurity -= p * p;
    }
    impurity
}

fn leaf_from(counts: &[usize; N_CLASSES], total: usize) -> TreeNode {
    let (class, dominant) = counts
        .iter()
        .enumerate()
        .max_by_key(|(_, &count)| count)
        .map(|(class, &count)| (class, count))
        .unwrap_or((Segment::Regular.index(), 0));

    let purity = if total > 0 {
        dominant as f64 / total as f64
    } else {
        0.0
    };

    TreeNode::Leaf {
        class,
        purity,
        n_samples: total,
    }
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    gain: f64,
    left: Vec<usize>,
    right: Vec<usize>,
}

/// Scan every (feature, midpoint-threshold) pair for the split with the
/// largest Gini gain. Features and thresholds are visited in ascending
/// order and a candidate replaces the incumbent only on a strictly
/// greater gain, which makes tie-breaking deterministic.
fn best_split(
    x: &Array2<f64>,
    y: &[usize],
    indices: &[usize],
    min_samples_leaf: usize,
) -> Option<BestSplit> {
    let total = indices.len();
    let parent_counts = class_counts(y, indices);
    let parent_impurity = gini(&parent_counts, total);

    let mut best: Option<BestSplit> = None;

    for feature in 0..N_FEATURES {
        let mut values: Vec<f64> = indices.iter().map(|&i| x[[i, feature]]).collect();
        values.sort_by(|a, b| a.total_cmp(b));
        values.dedup();

        for window in values.windows(2) {
            let threshold = (window[0] + window[1]) / 2.0;

            let mut left = Vec::new();
            let mut right = Vec::new();
            for &i in indices {
                if x[[i, feature]] <= threshold {
                    left.push(i);
                } else {
                    right.push(i);
                }
            }

            if left.len() < min_samples_leaf || right.len() < min_samples_leaf {
                continue;
            }

            let left_counts = class_counts(y, &left);
            let right_counts = class_counts(y, &right);
            let weighted = (left.len() as f64 * gini(&left_counts, left.len())
                + right.len() as f64 * gini(&right_counts, right.len()))
                / total as f64;

            let gain = parent_impurity - weighted;
            if gain <= 1e-12 {
                continue;
            }

            if best.as_ref().is_none_or(|b| gain > b.gain) {
                best = Some(BestSplit {
                    feature,
                    threshold,
                    gain,
                    left,
                    right,
                });
            }
        }
    }

    best
}

fn build_node(
    x: &Array2<f64>,
    y: &[usize],
    indices: &[usize],
    depth: usize,
    config: &TreeConfig,
    n_total: usize,
    importance: &mut [f64],
) -> TreeNode {
    let counts = class_counts(y, indices);
    let total = indices.len();

    let is_pure = counts.iter().filter(|&&c| c > 0).count() <= 1;
    if is_pure || depth >= config.max_depth || total < 2 * config.min_samples_leaf {
        return leaf_from(&counts, total);
    }

    let Some(split) = best_split(x, y, indices, config.min_samples_leaf) else {
        return leaf_from(&counts, total);
    };

    importance[split.feature] += (total as f64 / n_total as f64) * split.gain;

    let left = build_node(x, y, &split.left, depth + 1, config, n_total, importance);
    let right = build_node(x, y, &split.right, depth + 1, config, n_total, importance);

    TreeNode::Split {
        feature: split.feature,
        threshold: split.threshold,
        left: Box::new(left),
        right: Box::new(right),
    }
}
