use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::CropModelError;

/// Number of soil and climate features per sample
pub const FEATURE_COUNT: usize = 7;

/// Soil and climate readings in model feature order:
/// N, P, K, temperature, humidity, pH, rainfall.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SoilReading {
    #[serde(rename = "N")]
    pub nitrogen: f64,
    #[serde(rename = "P")]
    pub phosphorous: f64,
    #[serde(rename = "K")]
    pub potassium: f64,
    pub temperature: f64,
    pub humidity: f64,
    pub ph: f64,
    pub rainfall: f64,
}

impl SoilReading {
    pub fn features(&self) -> [f64; FEATURE_COUNT] {
        [
            self.nitrogen,
            self.phosphorous,
            self.potassium,
            self.temperature,
            self.humidity,
            self.ph,
            self.rainfall,
        ]
    }
}

/// One labelled row of the training CSV
#[derive(Debug, Clone, PartialEq)]
pub struct CropSample {
    pub reading: SoilReading,
    pub label: String,
}

/// CSV row layout; `csv` cannot deserialize numbers through `#[serde(flatten)]`
#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(rename = "N")]
    nitrogen: f64,
    #[serde(rename = "P")]
    phosphorous: f64,
    #[serde(rename = "K")]
    potassium: f64,
    temperature: f64,
    humidity: f64,
    ph: f64,
    rainfall: f64,
    label: String,
}

impl From<CsvRow> for CropSample {
    fn from(row: CsvRow) -> Self {
        Self {
            reading: SoilReading {
                nitrogen: row.nitrogen,
                phosphorous: row.phosphorous,
                potassium: row.potassium,
                temperature: row.temperature,
                humidity: row.humidity,
                ph: row.ph,
                rainfall: row.rainfall,
            },
            label: row.label,
        }
    }
}

/// min / max / mean of one feature
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Range {
    pub min: f64,
    pub max: f64,
    pub avg: f64,
}

impl Range {
    fn of(values: impl Iterator<Item = f64>) -> Option<Self> {
        let mut count = 0usize;
        let mut sum = 0.0;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for value in values {
            count += 1;
            sum += value;
            min = min.min(value);
            max = max.max(value);
        }
        (count > 0).then(|| Range {
            min,
            max,
            avg: sum / count as f64,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimalConditions {
    pub nitrogen: Range,
    pub phosphorous: Range,
    pub potassium: Range,
    pub temperature: Range,
    pub humidity: Range,
    pub ph: Range,
    pub rainfall: Range,
}

/// Observed growing conditions for one crop
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CropRequirements {
    pub crop_name: String,
    pub optimal_conditions: OptimalConditions,
    pub samples_count: usize,
}

/// The labelled crop dataset
#[derive(Debug, Clone, Default)]
pub struct CropDataset {
    samples: Vec<CropSample>,
}

impl CropDataset {
    pub fn new(samples: Vec<CropSample>) -> Self {
        Self { samples }
    }

    /// Reads `N,P,K,temperature,humidity,ph,rainfall,label` rows from a CSV file
    pub fn load(path: &Path) -> Result<Self, CropModelError> {
        if !path.exists() {
            return Err(CropModelError::DatasetMissing(path.to_path_buf()));
        }

        let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_path(path)?;
        let samples = reader
            .deserialize::<CsvRow>()
            .map(|row| row.map(CropSample::from))
            .collect::<Result<Vec<_>, _>>()?;

        if samples.is_empty() {
            return Err(CropModelError::InvalidDataset(format!(
                "{} contains no samples",
                path.display()
            )));
        }

        tracing::debug!(path = %path.display(), samples = samples.len(), "Crop dataset loaded");
        Ok(Self { samples })
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[CropSample] {
        &self.samples
    }

    /// Sorted distinct labels
    pub fn crops(&self) -> Vec<String> {
        self.samples
            .iter()
            .map(|s| s.label.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Statistics over rows whose label equals `name`, ignoring case
    pub fn requirements(&self, name: &str) -> Option<CropRequirements> {
        let needle = name.trim().to_lowercase();
        let rows: Vec<&SoilReading> = self
            .samples
            .iter()
            .filter(|s| s.label.to_lowercase() == needle)
            .map(|s| &s.reading)
            .collect();

        let range = |f: fn(&SoilReading) -> f64| Range::of(rows.iter().map(|r| f(r)));

        Some(CropRequirements {
            crop_name: name.to_string(),
            optimal_conditions: OptimalConditions {
                nitrogen: range(|r| r.nitrogen)?,
                phosphorous: range(|r| r.phosphorous)?,
                potassium: range(|r| r.potassium)?,
                temperature: range(|r| r.temperature)?,
                humidity: range(|r| r.humidity)?,
                ph: range(|r| r.ph)?,
                rainfall: range(|r| r.rainfall)?,
            },
            samples_count: rows.len(),
        })
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use std::io::Write;
    use std::path::{Path, PathBuf};

    /// Centre of each fixture crop's cluster
    pub const CROP_CENTRES: &[(&str, [f64; 7])] = &[
        ("rice", [80.0, 45.0, 40.0, 23.0, 82.0, 6.4, 230.0]),
        ("chickpea", [40.0, 68.0, 80.0, 18.0, 16.0, 7.3, 80.0]),
        ("cotton", [118.0, 46.0, 20.0, 24.0, 80.0, 6.9, 80.0]),
        ("mango", [20.0, 27.0, 30.0, 31.0, 50.0, 5.8, 95.0]),
    ];

    /// Writes a small, well-separated dataset into `dir` and returns its path
    pub fn write_dataset(dir: &Path, rows_per_crop: usize) -> PathBuf {
        write_crops(dir, CROP_CENTRES, rows_per_crop)
    }

    /// Writes (or overwrites) `dir/crops.csv` with clusters around `centres`
    pub fn write_crops(dir: &Path, centres: &[(&str, [f64; 7])], rows_per_crop: usize) -> PathBuf {
        let path = dir.join("crops.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "N,P,K,temperature,humidity,ph,rainfall,label").unwrap();
        for (label, centre) in centres {
            for i in 0..rows_per_crop {
                // deterministic jitter in [-1, 1]
                let jitter = ((i * 7919) % 21) as f64 / 10.0 - 1.0;
                let row: Vec<String> = centre
                    .iter()
                    .enumerate()
                    .map(|(f, v)| {
                        let spread = if f == 5 { 0.1 } else { 2.0 };
                        format!("{:.3}", v + jitter * spread)
                    })
                    .collect();
                writeln!(file, "{},{}", row.join(","), label).unwrap();
            }
        }
        path
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::write_dataset;
    use super::*;

    #[test]
    fn test_load_and_list_crops() {
        let dir = tempfile::tempdir().unwrap();
        let dataset = CropDataset::load(&write_dataset(dir.path(), 10)).unwrap();

        assert_eq!(dataset.len(), 40);
        assert_eq!(dataset.crops(), vec!["chickpea", "cotton", "mango", "rice"]);
    }

    #[test]
    fn test_requirements_are_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        let dataset = CropDataset::load(&write_dataset(dir.path(), 10)).unwrap();

        let rice = dataset.requirements("RICE").unwrap();
        assert_eq!(rice.crop_name, "RICE");
        assert_eq!(rice.samples_count, 10);
        let n = rice.optimal_conditions.nitrogen;
        assert!(n.min <= n.avg && n.avg <= n.max);
        assert!((n.avg - 80.0).abs() < 2.0);
    }

    #[test]
    fn test_unknown_crop_has_no_requirements() {
        let dir = tempfile::tempdir().unwrap();
        let dataset = CropDataset::load(&write_dataset(dir.path(), 5)).unwrap();
        assert!(dataset.requirements("nonexistent_crop").is_none());
    }

    #[test]
    fn test_missing_file_is_reported() {
        let err = CropDataset::load(Path::new("/definitely/not/here.csv")).unwrap_err();
        assert!(matches!(err, CropModelError::DatasetMissing(_)));
    }

    #[test]
    fn test_header_only_file_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        std::fs::write(&path, "N,P,K,temperature,humidity,ph,rainfall,label\n").unwrap();
        assert!(matches!(
            CropDataset::load(&path),
            Err(CropModelError::InvalidDataset(_))
        ));
    }
}
