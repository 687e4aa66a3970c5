use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

/// Per-feature standardisation to zero mean and unit variance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    /// Fits on `rows`; constant features keep a scale of 1
    pub fn fit(rows: &[Vec<f64>]) -> Self {
        let width = rows.first().map_or(0, Vec::len);
        let n = rows.len().max(1) as f64;

        let mut mean = vec![0.0; width];
        for row in rows {
            for (m, v) in mean.iter_mut().zip(row) {
                *m += v;
            }
        }
        mean.iter_mut().for_each(|m| *m /= n);

        let mut variance = vec![0.0; width];
        for row in rows {
            for ((var, v), m) in variance.iter_mut().zip(row).zip(&mean) {
                *var += (v - m).powi(2);
            }
        }
        let scale = variance
            .into_iter()
            .map(|var| {
                let std = (var / n).sqrt();
                if std > 0.0 {
                    std
                } else {
                    1.0
                }
            })
            .collect();

        Self { mean, scale }
    }

    pub fn transform(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(v, (m, s))| (v - m) / s)
            .collect()
    }

    pub fn transform_all(&self, rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
        rows.iter().map(|row| self.transform(row)).collect()
    }
}

/// Maps class labels to contiguous indices in sorted label order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelEncoder {
    pub classes: Vec<String>,
}

impl LabelEncoder {
    pub fn fit<'a>(labels: impl IntoIterator<Item = &'a str>) -> Self {
        let mut classes: Vec<String> = labels.into_iter().map(str::to_string).collect();
        classes.sort();
        classes.dedup();
        Self { classes }
    }

    pub fn encode(&self, label: &str) -> Option<usize> {
        self.classes
            .binary_search_by(|c| c.as_str().cmp(label))
            .ok()
    }

    pub fn decode(&self, index: usize) -> Option<&str> {
        self.classes.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

/// Splits row indices into (train, test) keeping each class's proportion.
///
/// Every class with at least two rows contributes at least one test row and
/// keeps at least one training row.
pub fn stratified_split(
    labels: &[usize],
    test_fraction: f64,
    rng: &mut StdRng,
) -> (Vec<usize>, Vec<usize>) {
    let mut by_class: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (i, &label) in labels.iter().enumerate() {
        by_class.entry(label).or_default().push(i);
    }

    let mut train = Vec::with_capacity(labels.len());
    let mut test = Vec::new();
    for (_, mut indices) in by_class {
        indices.shuffle(rng);
        let n = indices.len();
        let n_test = if n < 2 {
            0
        } else {
            ((n as f64 * test_fraction).round() as usize).clamp(1, n - 1)
        };
        test.extend_from_slice(&indices[..n_test]);
        train.extend_from_slice(&indices[n_test..]);
    }

    train.shuffle(rng);
    test.shuffle(rng);
    (train, test)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_scaler_standardises_columns() {
        let rows = vec![vec![1.0, 5.0], vec![3.0, 5.0], vec![5.0, 5.0]];
        let scaler = StandardScaler::fit(&rows);

        assert_eq!(scaler.mean, vec![3.0, 5.0]);
        // population std of 1,3,5
        assert!((scaler.scale[0] - (8.0f64 / 3.0).sqrt()).abs() < 1e-12);
        // constant column keeps unit scale
        assert_eq!(scaler.scale[1], 1.0);

        let scaled = scaler.transform(&[3.0, 7.0]);
        assert_eq!(scaled, vec![0.0, 2.0]);
    }

    #[test]
    fn test_label_encoder_is_sorted() {
        let encoder = LabelEncoder::fit(["rice", "maize", "rice", "apple"]);

        assert_eq!(encoder.classes, vec!["apple", "maize", "rice"]);
        assert_eq!(encoder.encode("maize"), Some(1));
        assert_eq!(encoder.encode("wheat"), None);
        assert_eq!(encoder.decode(2), Some("rice"));
        assert_eq!(encoder.decode(3), None);
    }

    #[test]
    fn test_stratified_split_keeps_class_proportions() {
        let labels: Vec<usize> = (0..100).map(|i| if i < 50 { 0 } else { 1 }).collect();
        let mut rng = StdRng::seed_from_u64(42);
        let (train, test) = stratified_split(&labels, 0.2, &mut rng);

        assert_eq!(train.len(), 80);
        assert_eq!(test.len(), 20);
        assert_eq!(test.iter().filter(|&&i| labels[i] == 0).count(), 10);

        let mut all: Vec<usize> = train.iter().chain(&test).copied().collect();
        all.sort();
        assert_eq!(all, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn test_stratified_split_is_seeded() {
        let labels: Vec<usize> = (0..30).map(|i| i % 3).collect();
        let first = stratified_split(&labels, 0.2, &mut StdRng::seed_from_u64(42));
        let second = stratified_split(&labels, 0.2, &mut StdRng::seed_from_u64(42));
        assert_eq!(first, second);
    }
}
