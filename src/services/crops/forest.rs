//! Random Forest classifier: bootstrap-aggregated CART trees split on Gini impurity.

use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_trees: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Features considered per split; `None` means √(feature count)
    pub max_features: Option<usize>,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: 20,
            min_samples_split: 5,
            min_samples_leaf: 2,
            max_features: None,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum Node {
    /// Class distribution of the training rows that reached this leaf
    Leaf { distribution: Vec<f64> },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// A CART tree stored as a flat node arena, root at index 0
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<Node>,
}

impl DecisionTree {
    fn predict_proba(&self, row: &[f64]) -> &[f64] {
        let mut current = 0;
        loop {
            match &self.nodes[current] {
                Node::Leaf { distribution } => return distribution,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    current = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], at: usize) -> usize {
            match &nodes[at] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        walk(&self.nodes, 0)
    }
}

struct TreeBuilder<'a> {
    rows: &'a [Vec<f64>],
    labels: &'a [usize],
    n_classes: usize,
    n_features: usize,
    max_features: usize,
    params: &'a ForestParams,
    rng: StdRng,
    nodes: Vec<Node>,
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    impurity: f64,
}

fn gini(counts: &[usize], total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let total = total as f64;
    1.0 - counts
        .iter()
        .map(|&c| {
            let p = c as f64 / total;
            p * p
        })
        .sum::<f64>()
}

impl TreeBuilder<'_> {
    fn class_counts(&self, samples: &[usize]) -> Vec<usize> {
        let mut counts = vec![0; self.n_classes];
        for &s in samples {
            counts[self.labels[s]] += 1;
        }
        counts
    }

    fn leaf(&mut self, counts: &[usize], total: usize) -> usize {
        let distribution = counts
            .iter()
            .map(|&c| c as f64 / total.max(1) as f64)
            .collect();
        self.nodes.push(Node::Leaf { distribution });
        self.nodes.len() - 1
    }

    fn build(&mut self, samples: &mut [usize], depth: usize) -> usize {
        let counts = self.class_counts(samples);
        let n = samples.len();
        let pure = counts.iter().filter(|&&c| c > 0).count() <= 1;

        if pure || depth >= self.params.max_depth || n < self.params.min_samples_split {
            return self.leaf(&counts, n);
        }

        let Some(split) = self.best_split(samples, &counts) else {
            return self.leaf(&counts, n);
        };

        // Reserve the slot so children get later indices
        let at = self.nodes.len();
        self.nodes.push(Node::Leaf {
            distribution: Vec::new(),
        });

        let mid = partition(samples, |s| self.rows[s][split.feature] <= split.threshold);
        let (left_samples, right_samples) = samples.split_at_mut(mid);
        let left = self.build(left_samples, depth + 1);
        let right = self.build(right_samples, depth + 1);

        self.nodes[at] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        at
    }

    fn best_split(&mut self, samples: &[usize], parent_counts: &[usize]) -> Option<BestSplit> {
        let n = samples.len();
        let min_leaf = self.params.min_samples_leaf.max(1);
        // Random feature order; past `max_features`, keep looking only until a split exists
        let order = index::sample(&mut self.rng, self.n_features, self.n_features);

        let mut best: Option<BestSplit> = None;
        let mut sorted: Vec<usize> = samples.to_vec();

        for (visited, feature) in order.iter().enumerate() {
            if visited >= self.max_features && best.is_some() {
                break;
            }
            sorted.sort_by(|&a, &b| self.rows[a][feature].total_cmp(&self.rows[b][feature]));

            let mut left_counts = vec![0usize; self.n_classes];
            let mut right_counts = parent_counts.to_vec();

            for i in 0..n - 1 {
                let label = self.labels[sorted[i]];
                left_counts[label] += 1;
                right_counts[label] -= 1;

                let left_n = i + 1;
                let right_n = n - left_n;
                if left_n < min_leaf || right_n < min_leaf {
                    continue;
                }

                let here = self.rows[sorted[i]][feature];
                let next = self.rows[sorted[i + 1]][feature];
                if next <= here {
                    continue;
                }

                let impurity = (left_n as f64 * gini(&left_counts, left_n)
                    + right_n as f64 * gini(&right_counts, right_n))
                    / n as f64;

                if best.as_ref().map_or(true, |b| impurity < b.impurity) {
                    let mut threshold = here + (next - here) / 2.0;
                    // Guard against the midpoint rounding up to `next`
                    if threshold >= next {
                        threshold = here;
                    }
                    best = Some(BestSplit {
                        feature,
                        threshold,
                        impurity,
                    });
                }
            }
        }

        best
    }
}

/// Moves elements satisfying `pred` to the front, returning how many did
fn partition(samples: &mut [usize], pred: impl Fn(usize) -> bool) -> usize {
    let mut boundary = 0;
    for i in 0..samples.len() {
        if pred(samples[i]) {
            samples.swap(i, boundary);
            boundary += 1;
        }
    }
    boundary
}

/// A fitted forest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    n_classes: usize,
    n_features: usize,
    trees: Vec<DecisionTree>,
}

impl RandomForest {
    /// Grows `params.n_trees` trees on bootstrap resamples of `rows`.
    ///
    /// `labels` must be class indices below `n_classes`.
    pub fn fit(
        rows: &[Vec<f64>],
        labels: &[usize],
        n_classes: usize,
        params: &ForestParams,
    ) -> Self {
        let n_features = rows.first().map_or(0, Vec::len);
        let max_features = params
            .max_features
            .unwrap_or_else(|| (n_features as f64).sqrt() as usize)
            .clamp(1, n_features.max(1));

        let mut seeder = StdRng::seed_from_u64(params.seed);
        let n = rows.len();

        let trees = (0..params.n_trees)
            .map(|_| {
                let mut rng = StdRng::seed_from_u64(seeder.gen());
                let mut bootstrap: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();

                let mut builder = TreeBuilder {
                    rows,
                    labels,
                    n_classes,
                    n_features,
                    max_features,
                    params,
                    rng,
                    nodes: Vec::new(),
                };
                builder.build(&mut bootstrap, 0);
                DecisionTree {
                    nodes: builder.nodes,
                }
            })
            .collect();

        Self {
            n_classes,
            n_features,
            trees,
        }
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }

    /// Mean of the per-tree leaf class distributions
    pub fn predict_proba(&self, row: &[f64]) -> Vec<f64> {
        let mut probabilities = vec![0.0; self.n_classes];
        if self.trees.is_empty() {
            return probabilities;
        }
        for tree in &self.trees {
            for (p, leaf) in probabilities.iter_mut().zip(tree.predict_proba(row)) {
                *p += leaf;
            }
        }
        let n = self.trees.len() as f64;
        probabilities.iter_mut().for_each(|p| *p /= n);
        probabilities
    }

    /// Index of the most probable class; ties go to the lowest index
    pub fn predict(&self, row: &[f64]) -> usize {
        argmax(&self.predict_proba(row))
    }

    /// Fraction of `rows` whose prediction equals the label
    pub fn accuracy(&self, rows: &[Vec<f64>], labels: &[usize]) -> f64 {
        if rows.is_empty() {
            return 0.0;
        }
        let correct = rows
            .iter()
            .zip(labels)
            .filter(|(row, &label)| self.predict(row) == label)
            .count();
        correct as f64 / rows.len() as f64
    }
}

pub fn argmax(values: &[f64]) -> usize {
    values
        .iter()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |(best_i, best_v), (i, &v)| {
            if v > best_v {
                (i, v)
            } else {
                (best_i, best_v)
            }
        })
        .0
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two well-separated clusters in 2D plus a third class far away
    fn clusters() -> (Vec<Vec<f64>>, Vec<usize>) {
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for i in 0..30 {
            let j = (i % 5) as f64 * 0.1;
            rows.push(vec![0.0 + j, 0.0 - j]);
            labels.push(0);
            rows.push(vec![10.0 - j, 10.0 + j]);
            labels.push(1);
            rows.push(vec![-10.0 + j, 10.0 - j]);
            labels.push(2);
        }
        (rows, labels)
    }

    fn small_params() -> ForestParams {
        ForestParams {
            n_trees: 15,
            ..ForestParams::default()
        }
    }

    #[test]
    fn test_forest_separates_clusters() {
        let (rows, labels) = clusters();
        let forest = RandomForest::fit(&rows, &labels, 3, &small_params());

        assert_eq!(forest.predict(&[0.1, -0.1]), 0);
        assert_eq!(forest.predict(&[9.8, 10.2]), 1);
        assert_eq!(forest.predict(&[-9.9, 9.9]), 2);
        assert_eq!(forest.accuracy(&rows, &labels), 1.0);
    }

    #[test]
    fn test_probabilities_sum_to_one() {
        let (rows, labels) = clusters();
        let forest = RandomForest::fit(&rows, &labels, 3, &small_params());

        for probe in [[0.0, 0.0], [5.0, 5.0], [-3.0, 7.0]] {
            let proba = forest.predict_proba(&probe);
            assert_eq!(proba.len(), 3);
            let total: f64 = proba.iter().sum();
            assert!((total - 1.0).abs() < 1e-9);
            assert!(proba.iter().all(|p| (0.0..=1.0).contains(p)));
        }
    }

    #[test]
    fn test_fit_is_deterministic_for_a_seed() {
        let (rows, labels) = clusters();
        let a = RandomForest::fit(&rows, &labels, 3, &small_params());
        let b = RandomForest::fit(&rows, &labels, 3, &small_params());
        assert_eq!(a, b);
    }

    #[test]
    fn test_depth_limit_is_respected() {
        let (rows, labels) = clusters();
        let params = ForestParams {
            n_trees: 5,
            max_depth: 1,
            ..ForestParams::default()
        };
        let forest = RandomForest::fit(&rows, &labels, 3, &params);
        assert!(forest.trees().iter().all(|t| t.depth() <= 1));
    }

    #[test]
    fn test_forest_round_trips_through_json() {
        let (rows, labels) = clusters();
        let forest = RandomForest::fit(&rows, &labels, 3, &small_params());
        let json = serde_json::to_string(&forest).unwrap();
        let restored: RandomForest = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.predict_proba(&[10.0, 10.0]), forest.predict_proba(&[10.0, 10.0]));
    }

    #[test]
    fn test_gini_and_argmax() {
        assert_eq!(gini(&[5, 0], 5), 0.0);
        assert!((gini(&[5, 5], 10) - 0.5).abs() < 1e-12);
        assert_eq!(argmax(&[0.2, 0.5, 0.5]), 1);
        assert_eq!(argmax(&[]), 0);
    }
}
