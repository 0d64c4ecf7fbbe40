//! Weighted CART decision tree with Gini impurity

use ndarray::{ArrayView1, ArrayView2};
use rand::rngs::StdRng;
use rand::seq::index;

const IMPURITY_EPSILON: f64 = 1e-12;

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        /// Weighted share of failure rows that reached this leaf
        failure_share: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// A fully grown binary classification tree
#[derive(Debug, Clone)]
pub struct DecisionTree {
    nodes: Vec<Node>,
}

impl DecisionTree {
    /// Whether this tree votes failure for the row
    pub fn votes_failure(&self, row: ArrayView1<'_, f64>) -> bool {
        self.leaf_share(row) > 0.5
    }

    /// Weighted failure share of the leaf the row lands in
    pub fn leaf_share(&self, row: ArrayView1<'_, f64>) -> f64 {
        let mut id = 0;
        loop {
            match &self.nodes[id] {
                Node::Leaf { failure_share } => return *failure_share,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    id = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn n_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| matches!(n, Node::Leaf { .. })).count()
    }

    pub fn depth(&self) -> usize {
        let mut max_depth = 0;
        let mut stack = vec![(0usize, 0usize)];
        while let Some((id, depth)) = stack.pop() {
            max_depth = max_depth.max(depth);
            if let Node::Split { left, right, .. } = &self.nodes[id] {
                stack.push((*left, depth + 1));
                stack.push((*right, depth + 1));
            }
        }
        max_depth
    }
}

/// Growth settings for a single tree
#[derive(Debug, Clone)]
pub(crate) struct TreeSettings {
    /// Features drawn as split candidates at each node
    pub max_features: usize,
    pub min_samples_split: usize,
    pub max_depth: Option<usize>,
}

/// Result of growing a tree: the tree and its raw impurity decreases
pub(crate) struct GrownTree {
    pub tree: DecisionTree,
    pub importances: Vec<f64>,
}

struct Candidate {
    feature: usize,
    threshold: f64,
    decrease: f64,
    /// Position in the sorted row order where the right child begins
    cut: usize,
}

/// Grow a tree on the rows with positive weight.
///
/// `pool` is the set of features this tree may split on; at each node
/// `max_features` of them are drawn as candidates, and the remaining pool
/// is searched only when none of the drawn ones can split the node.
pub(crate) fn grow(
    x: ArrayView2<'_, f64>,
    y: &[usize],
    weights: &[f64],
    pool: &[usize],
    settings: &TreeSettings,
    rng: &mut StdRng,
) -> GrownTree {
    let mut importances = vec![0.0; x.ncols()];
    let mut nodes = vec![Node::Leaf { failure_share: 0.0 }];
    let rows: Vec<usize> = (0..y.len()).filter(|&i| weights[i] > 0.0).collect();

    let mut stack = vec![(0usize, rows, 0usize)];
    while let Some((id, mut rows, depth)) = stack.pop() {
        let (w_total, w_fail) = class_weights(&rows, y, weights);
        let impurity = gini(w_total, w_fail);
        let failure_share = if w_total > 0.0 { w_fail / w_total } else { 0.0 };

        let depth_exhausted = settings.max_depth.is_some_and(|d| depth >= d);
        let too_small = rows.len() < settings.min_samples_split;
        if impurity <= IMPURITY_EPSILON || too_small || depth_exhausted {
            nodes[id] = Node::Leaf { failure_share };
            continue;
        }

        let best = best_split(x, y, weights, &mut rows, pool, settings, rng, w_total, impurity);
        let Some(best) = best else {
            nodes[id] = Node::Leaf { failure_share };
            continue;
        };

        importances[best.feature] += best.decrease;

        // best_split leaves rows sorted by the winning feature
        let right_rows = rows.split_off(best.cut);
        let left_rows = rows;

        let left = nodes.len();
        nodes.push(Node::Leaf { failure_share: 0.0 });
        let right = nodes.len();
        nodes.push(Node::Leaf { failure_share: 0.0 });
        nodes[id] = Node::Split {
            feature: best.feature,
            threshold: best.threshold,
            left,
            right,
        };
        stack.push((right, right_rows, depth + 1));
        stack.push((left, left_rows, depth + 1));
    }

    GrownTree {
        tree: DecisionTree { nodes },
        importances,
    }
}

#[allow(clippy::too_many_arguments)]
fn best_split(
    x: ArrayView2<'_, f64>,
    y: &[usize],
    weights: &[f64],
    rows: &mut [usize],
    pool: &[usize],
    settings: &TreeSettings,
    rng: &mut StdRng,
    w_total: f64,
    impurity: f64,
) -> Option<Candidate> {
    let k = settings.max_features.clamp(1, pool.len());
    let drawn = index::sample(rng, pool.len(), k).into_vec();
    let order: Vec<usize> = drawn.iter().map(|&i| pool[i]).collect();
    let rest: Vec<usize> = (0..pool.len())
        .filter(|i| !drawn.contains(i))
        .map(|i| pool[i])
        .collect();

    let mut best: Option<Candidate> = None;
    let mut searched = 0;
    for &feature in order.iter().chain(rest.iter()) {
        // Extra features are only visited until a valid split exists
        if searched >= k && best.is_some() {
            break;
        }
        searched += 1;
        if let Some(c) = scan_feature(x, y, weights, rows, feature, w_total, impurity) {
            if best.as_ref().map_or(true, |b| c.decrease > b.decrease) {
                best = Some(c);
            }
        }
    }

    let best = best?;
    rows.sort_by(|&a, &b| {
        x[[a, best.feature]]
            .partial_cmp(&x[[b, best.feature]])
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    Some(best)
}

fn scan_feature(
    x: ArrayView2<'_, f64>,
    y: &[usize],
    weights: &[f64],
    rows: &mut [usize],
    feature: usize,
    w_total: f64,
    impurity: f64,
) -> Option<Candidate> {
    rows.sort_by(|&a, &b| {
        x[[a, feature]]
            .partial_cmp(&x[[b, feature]])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let w_fail_total: f64 = rows.iter().filter(|&&r| y[r] == 1).map(|&r| weights[r]).sum();
    let mut w_left = 0.0;
    let mut w_left_fail = 0.0;
    let mut best: Option<Candidate> = None;

    for pos in 0..rows.len() - 1 {
        let r = rows[pos];
        w_left += weights[r];
        if y[r] == 1 {
            w_left_fail += weights[r];
        }

        let here = x[[r, feature]];
        let next = x[[rows[pos + 1], feature]];
        if next <= here {
            continue;
        }

        let w_right = w_total - w_left;
        let w_right_fail = w_fail_total - w_left_fail;
        let decrease = w_total * impurity
            - w_left * gini(w_left, w_left_fail)
            - w_right * gini(w_right, w_right_fail);

        if best.as_ref().map_or(true, |b| decrease > b.decrease) {
            let mut threshold = here + (next - here) / 2.0;
            if threshold >= next {
                threshold = here;
            }
            best = Some(Candidate {
                feature,
                threshold,
                decrease,
                cut: pos + 1,
            });
        }
    }
    best
}

fn class_weights(rows: &[usize], y: &[usize], weights: &[f64]) -> (f64, f64) {
    rows.iter().fold((0.0, 0.0), |(total, fail), &r| {
        let w = weights[r];
        (total + w, if y[r] == 1 { fail + w } else { fail })
    })
}

fn gini(w_total: f64, w_fail: f64) -> f64 {
    if w_total <= 0.0 {
        return 0.0;
    }
    let p = w_fail / w_total;
    1.0 - p * p - (1.0 - p) * (1.0 - p)
}
