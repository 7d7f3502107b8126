//! CART regression tree over scaled feature rows.
//!
//! Nodes live in a flat arena with the root at index 0; children are always
//! pushed after their parent, which keeps the structure acyclic and easy to
//! validate when restored from disk. Splits minimize the summed squared error
//! of the two children. Candidate features are visited in a per-node shuffled
//! order, so ties between equally good splits are broken by the tree's seed.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::types::NUM_FEATURES;

/// Growth limits for a single tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeParams {
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    Leaf {
        value: f64,
    },
    /// Rows with `x[feature] <= threshold` go left.
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    nodes: Vec<Node>,
}

/// Best split found for one node.
struct SplitCandidate {
    feature: usize,
    threshold: f64,
    /// Summed squared error of both children
    child_sse: f64,
}

struct TreeBuilder<'a> {
    x: &'a [[f64; NUM_FEATURES]],
    y: &'a [f64],
    params: TreeParams,
    nodes: Vec<Node>,
    importances: [f64; NUM_FEATURES],
}

impl RegressionTree {
    /// Grow a tree on the rows listed in `sample` (repeats allowed, as
    /// produced by bootstrap sampling).
    ///
    /// Returns the tree and its unnormalized impurity decrease per feature.
    pub fn fit(
        x: &[[f64; NUM_FEATURES]],
        y: &[f64],
        sample: Vec<usize>,
        params: TreeParams,
        rng: &mut StdRng,
    ) -> (Self, [f64; NUM_FEATURES]) {
        let mut builder = TreeBuilder {
            x,
            y,
            params,
            nodes: Vec::new(),
            importances: [0.0; NUM_FEATURES],
        };
        builder.build(sample, 0, rng);
        (
            Self {
                nodes: builder.nodes,
            },
            builder.importances,
        )
    }

    pub fn predict(&self, x: &[f64; NUM_FEATURES]) -> f64 {
        let mut idx = 0;
        loop {
            match self.nodes.get(idx) {
                Some(Node::Leaf { value }) => return *value,
                Some(Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) if *left > idx && *right > idx => {
                    let Some(v) = x.get(*feature) else {
                        return 0.0;
                    };
                    idx = if *v <= *threshold { *left } else { *right };
                }
                // Unreachable for validated trees
                _ => return 0.0,
            }
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn leaf_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, Node::Leaf { .. }))
            .count()
    }

    /// Number of split levels on the longest root-to-leaf path.
    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], idx: usize) -> usize {
            match nodes.get(idx) {
                Some(Node::Split { left, right, .. }) if *left > idx && *right > idx => {
                    1 + walk(nodes, *left).max(walk(nodes, *right))
                }
                _ => 0,
            }
        }
        walk(&self.nodes, 0)
    }

    /// Structural check used when restoring from a bundle.
    pub(crate) fn check(&self) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }
        for (i, node) in self.nodes.iter().enumerate() {
            match node {
                Node::Leaf { value } if !value.is_finite() => {
                    return Err(format!("node {i}: non-finite leaf value"));
                }
                Node::Leaf { .. } => {}
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= NUM_FEATURES {
                        return Err(format!("node {i}: feature index {feature} out of range"));
                    }
                    if !threshold.is_finite() {
                        return Err(format!("node {i}: non-finite threshold"));
                    }
                    for child in [*left, *right] {
                        if child <= i || child >= self.nodes.len() {
                            return Err(format!("node {i}: invalid child index {child}"));
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

impl TreeBuilder<'_> {
    fn build(&mut self, sample: Vec<usize>, depth: usize, rng: &mut StdRng) -> usize {
        let n = sample.len();
        if n == 0 {
            self.nodes.push(Node::Leaf { value: 0.0 });
            return self.nodes.len() - 1;
        }
        let mean = sample.iter().map(|&i| self.y[i]).sum::<f64>() / n as f64;
        let sse: f64 = sample.iter().map(|&i| (self.y[i] - mean).powi(2)).sum();

        let idx = self.nodes.len();
        self.nodes.push(Node::Leaf { value: mean });

        if depth >= self.params.max_depth || n < self.params.min_samples_split || sse <= 1e-12 {
            return idx;
        }

        let Some(best) = self.best_split(&sample, sse, rng) else {
            return idx;
        };

        self.importances[best.feature] += sse - best.child_sse;

        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = sample
            .into_iter()
            .partition(|&i| self.x[i][best.feature] <= best.threshold);

        let left = self.build(left_rows, depth + 1, rng);
        let right = self.build(right_rows, depth + 1, rng);
        self.nodes[idx] = Node::Split {
            feature: best.feature,
            threshold: best.threshold,
            left,
            right,
        };
        idx
    }

    fn best_split(&self, sample: &[usize], parent_sse: f64, rng: &mut StdRng) -> Option<SplitCandidate> {
        let n = sample.len();
        let min_leaf = self.params.min_samples_leaf.max(1);

        let mut features: Vec<usize> = (0..NUM_FEATURES).collect();
        features.shuffle(rng);

        let mut best: Option<SplitCandidate> = None;
        let mut order = sample.to_vec();

        for feature in features {
            order.sort_by(|&a, &b| self.x[a][feature].total_cmp(&self.x[b][feature]));

            let total_sum: f64 = order.iter().map(|&i| self.y[i]).sum();
            let total_sq: f64 = order.iter().map(|&i| self.y[i] * self.y[i]).sum();
            let mut left_sum = 0.0;
            let mut left_sq = 0.0;

            for k in 1..n {
                let yi = self.y[order[k - 1]];
                left_sum += yi;
                left_sq += yi * yi;

                if k < min_leaf || n - k < min_leaf {
                    continue;
                }
                let lo = self.x[order[k - 1]][feature];
                let hi = self.x[order[k]][feature];
                if lo >= hi {
                    continue;
                }

                let n_left = k as f64;
                let n_right = (n - k) as f64;
                let right_sum = total_sum - left_sum;
                let right_sq = total_sq - left_sq;
                let child_sse = (left_sq - left_sum * left_sum / n_left)
                    + (right_sq - right_sum * right_sum / n_right);

                if best.as_ref().map_or(true, |b| child_sse < b.child_sse) {
                    let mut threshold = (lo + hi) / 2.0;
                    // Adjacent floats can round the midpoint up to `hi`
                    if threshold >= hi {
                        threshold = lo;
                    }
                    best = Some(SplitCandidate {
                        feature,
                        threshold,
                        child_sse,
                    });
                }
            }
        }

        best.filter(|b| parent_sse - b.child_sse > 1e-15)
    }
}
