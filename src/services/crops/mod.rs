//! Crop recommendation from soil and climate readings.
//!
//! A [`CropRecommender`] lives for the whole process. The first caller loads
//! the persisted model (training it from the dataset when no artifacts exist);
//! concurrent first callers wait on the same initialisation.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::{OnceCell, RwLock};

use crate::error::AppError;
use crate::models::CropScore;

pub mod dataset;
pub mod forest;
pub mod preprocessing;

pub use dataset::{CropDataset, CropRequirements, SoilReading};
pub use forest::{ForestParams, RandomForest};
pub use preprocessing::{LabelEncoder, StandardScaler};

pub const MODEL_FILE: &str = "crop_model.json";
pub const SCALER_FILE: &str = "crop_scaler.json";
pub const LABEL_ENCODER_FILE: &str = "crop_label_encoder.json";

/// Version string stored with every persisted recommendation
pub const MODEL_VERSION: &str = "v1.0";

/// Number of ranked alternatives returned with a recommendation
pub const TOP_K: usize = 5;

const TEST_FRACTION: f64 = 0.2;

#[derive(thiserror::Error, Debug)]
pub enum CropModelError {
    #[error("Dataset not found at {0}")]
    DatasetMissing(PathBuf),

    #[error("Invalid dataset: {0}")]
    InvalidDataset(String),

    #[error("Artifact I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Dataset parse error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Artifact serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Model task failed: {0}")]
    Task(String),
}

impl From<CropModelError> for AppError {
    fn from(err: CropModelError) -> Self {
        AppError::ServiceUnavailable(format!("Crop recommender not available: {}", err))
    }
}

/// Classifier, scaler and label encoder that together make a prediction
#[derive(Debug, Clone)]
pub struct CropModel {
    pub forest: RandomForest,
    pub scaler: StandardScaler,
    pub encoder: LabelEncoder,
}

/// Result of a single recommendation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CropPrediction {
    pub recommended_crop: String,
    pub confidence: f64,
    pub top_5_recommendations: Vec<CropScore>,
}

/// A batch entry echoes its input
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchPrediction {
    #[serde(flatten)]
    pub prediction: CropPrediction,
    pub input_data: SoilReading,
}

impl CropModel {
    /// Fits scaler, encoder and forest on a stratified 80% of `dataset`.
    ///
    /// Returns the model together with its accuracy on the held-out 20%.
    pub fn train(dataset: &CropDataset, params: &ForestParams) -> Result<(Self, f64), CropModelError> {
        if dataset.is_empty() {
            return Err(CropModelError::InvalidDataset("no samples".to_string()));
        }

        let encoder = LabelEncoder::fit(dataset.samples().iter().map(|s| s.label.as_str()));
        let mut rows = Vec::with_capacity(dataset.len());
        let mut labels = Vec::with_capacity(dataset.len());
        for sample in dataset.samples() {
            let label = encoder.encode(&sample.label).ok_or_else(|| {
                CropModelError::InvalidDataset(format!("unencodable label '{}'", sample.label))
            })?;
            rows.push(sample.reading.features().to_vec());
            labels.push(label);
        }

        let mut rng = StdRng::seed_from_u64(params.seed);
        let (train_idx, test_idx) = preprocessing::stratified_split(&labels, TEST_FRACTION, &mut rng);

        let pick = |idx: &[usize]| -> (Vec<Vec<f64>>, Vec<usize>) {
            idx.iter().map(|&i| (rows[i].clone(), labels[i])).unzip()
        };
        let (train_rows, train_labels) = pick(&train_idx);
        let (test_rows, test_labels) = pick(&test_idx);

        let scaler = StandardScaler::fit(&train_rows);
        let forest = RandomForest::fit(
            &scaler.transform_all(&train_rows),
            &train_labels,
            encoder.len(),
            params,
        );
        let accuracy = forest.accuracy(&scaler.transform_all(&test_rows), &test_labels);

        Ok((
            Self {
                forest,
                scaler,
                encoder,
            },
            accuracy,
        ))
    }

    pub fn predict(&self, reading: &SoilReading) -> CropPrediction {
        let scaled = self.scaler.transform(&reading.features());
        let probabilities = self.forest.predict_proba(&scaled);

        let mut ranked: Vec<(usize, f64)> = probabilities.iter().copied().enumerate().collect();
        // Stable: equal probabilities keep label order
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

        let label = |i: usize| self.encoder.decode(i).unwrap_or_default().to_string();
        let (best, confidence) = ranked.first().copied().unwrap_or((0, 0.0));

        CropPrediction {
            recommended_crop: label(best),
            confidence,
            top_5_recommendations: ranked
                .iter()
                .take(TOP_K)
                .map(|&(i, p)| CropScore {
                    crop: label(i),
                    confidence: p,
                })
                .collect(),
        }
    }

    fn artifacts_exist(dir: &Path) -> bool {
        [MODEL_FILE, SCALER_FILE, LABEL_ENCODER_FILE]
            .iter()
            .all(|file| dir.join(file).exists())
    }

    pub fn load(dir: &Path) -> Result<Self, CropModelError> {
        Ok(Self {
            forest: read_json(&dir.join(MODEL_FILE))?,
            scaler: read_json(&dir.join(SCALER_FILE))?,
            encoder: read_json(&dir.join(LABEL_ENCODER_FILE))?,
        })
    }

    pub fn save(&self, dir: &Path) -> Result<(), CropModelError> {
        std::fs::create_dir_all(dir)?;
        write_json(&dir.join(MODEL_FILE), &self.forest)?;
        write_json(&dir.join(SCALER_FILE), &self.scaler)?;
        write_json(&dir.join(LABEL_ENCODER_FILE), &self.encoder)?;
        Ok(())
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, CropModelError> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), CropModelError> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer(&mut writer, value)?;
    writer.flush()?;
    Ok(())
}

/// Process-wide crop recommendation service
pub struct CropRecommender {
    model_dir: PathBuf,
    dataset_path: PathBuf,
    params: ForestParams,
    model: OnceCell<RwLock<Arc<CropModel>>>,
    dataset: OnceCell<RwLock<Arc<CropDataset>>>,
}

impl CropRecommender {
    pub fn new(model_dir: impl Into<PathBuf>, dataset_path: impl Into<PathBuf>) -> Self {
        Self::with_params(model_dir, dataset_path, ForestParams::default())
    }

    pub fn with_params(
        model_dir: impl Into<PathBuf>,
        dataset_path: impl Into<PathBuf>,
        params: ForestParams,
    ) -> Self {
        Self {
            model_dir: model_dir.into(),
            dataset_path: dataset_path.into(),
            params,
            model: OnceCell::new(),
            dataset: OnceCell::new(),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.model.initialized()
    }

    /// Reads the CSV from disk, bypassing the cached copy
    async fn read_dataset(&self) -> Result<Arc<CropDataset>, CropModelError> {
        let path = self.dataset_path.clone();
        let dataset = tokio::task::spawn_blocking(move || CropDataset::load(&path))
            .await
            .map_err(|e| CropModelError::Task(e.to_string()))??;
        Ok(Arc::new(dataset))
    }

    /// The cached dataset, read on first use
    async fn dataset(&self) -> Result<Arc<CropDataset>, CropModelError> {
        let slot = self
            .dataset
            .get_or_try_init(|| async {
                let dataset = self.read_dataset().await?;
                Ok::<_, CropModelError>(RwLock::new(dataset))
            })
            .await?;
        Ok(slot.read().await.clone())
    }

    async fn train_and_save(&self, dataset: Arc<CropDataset>) -> Result<CropModel, CropModelError> {
        let params = self.params.clone();
        let model_dir = self.model_dir.clone();

        tokio::task::spawn_blocking(move || {
            tracing::info!(
                samples = dataset.len(),
                crops = dataset.crops().len(),
                trees = params.n_trees,
                "Training crop recommendation model"
            );
            let (model, accuracy) = CropModel::train(&dataset, &params)?;
            tracing::info!(accuracy = %format!("{:.2}%", accuracy * 100.0), "Crop model trained");

            model.save(&model_dir)?;
            tracing::info!(dir = %model_dir.display(), "Crop model saved");
            Ok(model)
        })
        .await
        .map_err(|e| CropModelError::Task(e.to_string()))?
    }

    async fn load_or_train(&self) -> Result<CropModel, CropModelError> {
        let dir = self.model_dir.clone();
        if CropModel::artifacts_exist(&dir) {
            let loaded = tokio::task::spawn_blocking(move || CropModel::load(&dir))
                .await
                .map_err(|e| CropModelError::Task(e.to_string()))?;
            match loaded {
                Ok(model) => {
                    tracing::info!(dir = %self.model_dir.display(), "Loaded existing crop model");
                    return Ok(model);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Stored crop model unreadable, retraining");
                }
            }
        }
        let dataset = self.dataset().await?;
        self.train_and_save(dataset).await
    }

    /// The current model, initialising it on first use
    pub async fn model(&self) -> Result<Arc<CropModel>, CropModelError> {
        let slot = self
            .model
            .get_or_try_init(|| async {
                let model = self.load_or_train().await?;
                Ok::<_, CropModelError>(RwLock::new(Arc::new(model)))
            })
            .await?;
        Ok(slot.read().await.clone())
    }

    pub async fn recommend_crop(&self, reading: SoilReading) -> Result<CropPrediction, CropModelError> {
        let model = self.model().await?;
        Ok(model.predict(&reading))
    }

    pub async fn recommend_crops_batch(
        &self,
        readings: Vec<SoilReading>,
    ) -> Result<Vec<BatchPrediction>, CropModelError> {
        let model = self.model().await?;
        Ok(readings
            .into_iter()
            .map(|reading| BatchPrediction {
                prediction: model.predict(&reading),
                input_data: reading,
            })
            .collect())
    }

    /// Observed conditions for `name`; `Ok(None)` when the dataset has no such crop
    pub async fn get_crop_requirements(
        &self,
        name: &str,
    ) -> Result<Option<CropRequirements>, CropModelError> {
        Ok(self.dataset().await?.requirements(name))
    }

    pub async fn get_all_crops(&self) -> Result<Vec<String>, CropModelError> {
        Ok(self.dataset().await?.crops())
    }

    /// Rereads the dataset, trains regardless of stored artifacts and swaps
    /// both the cached dataset and the cached model
    pub async fn retrain(&self) -> Result<Arc<CropModel>, CropModelError> {
        let dataset = self.read_dataset().await?;
        let fresh = Arc::new(self.train_and_save(dataset.clone()).await?);

        match self.dataset.get() {
            Some(slot) => *slot.write().await = dataset,
            None => {
                let _ = self.dataset.set(RwLock::new(dataset));
            }
        }
        match self.model.get() {
            Some(slot) => *slot.write().await = fresh.clone(),
            None => {
                // Lost a race with a first-time load; the loaded model is equivalent
                let _ = self.model.set(RwLock::new(fresh.clone()));
            }
        }
        tracing::info!("Crop model retrained");
        Ok(fresh)
    }
}

#[cfg(test)]
mod tests {
    use super::dataset::fixtures::{write_crops, write_dataset, CROP_CENTRES};
    use super::*;

    fn quick_params() -> ForestParams {
        ForestParams {
            n_trees: 10,
            ..ForestParams::default()
        }
    }

    fn rice_reading() -> SoilReading {
        SoilReading {
            nitrogen: 80.0,
            phosphorous: 45.0,
            potassium: 40.0,
            temperature: 23.0,
            humidity: 82.0,
            ph: 6.4,
            rainfall: 230.0,
        }
    }

    #[tokio::test]
    async fn test_trains_when_artifacts_missing_and_persists_them() {
        let dir = tempfile::tempdir().unwrap();
        let dataset = write_dataset(dir.path(), 20);
        let model_dir = dir.path().join("models");
        let recommender = CropRecommender::with_params(&model_dir, &dataset, quick_params());

        assert!(!recommender.is_loaded());
        let prediction = recommender.recommend_crop(rice_reading()).await.unwrap();

        assert!(recommender.is_loaded());
        assert_eq!(prediction.recommended_crop, "rice");
        assert!(model_dir.join(MODEL_FILE).exists());
        assert!(model_dir.join(SCALER_FILE).exists());
        assert!(model_dir.join(LABEL_ENCODER_FILE).exists());
    }

    #[tokio::test]
    async fn test_top_five_sorted_and_bounded() {
        let dir = tempfile::tempdir().unwrap();
        let dataset = write_dataset(dir.path(), 20);
        let recommender =
            CropRecommender::with_params(dir.path().join("models"), &dataset, quick_params());

        let prediction = recommender.recommend_crop(rice_reading()).await.unwrap();
        let top = &prediction.top_5_recommendations;

        // four fixture crops, so fewer than five alternatives
        assert_eq!(top.len(), 4);
        assert!(top.windows(2).all(|w| w[0].confidence >= w[1].confidence));
        assert_eq!(top[0].crop, prediction.recommended_crop);
        assert_eq!(top[0].confidence, prediction.confidence);
        let total: f64 = top.iter().map(|c| c.confidence).sum();
        assert!(total <= 1.0 + 1e-9);
    }

    #[tokio::test]
    async fn test_reloads_persisted_model() {
        let dir = tempfile::tempdir().unwrap();
        let dataset = write_dataset(dir.path(), 20);
        let model_dir = dir.path().join("models");

        let first = CropRecommender::with_params(&model_dir, &dataset, quick_params());
        let trained = first.recommend_crop(rice_reading()).await.unwrap();

        // Same artifacts, dataset removed: the model must come from disk
        std::fs::remove_file(&dataset).unwrap();
        let second = CropRecommender::with_params(&model_dir, &dataset, quick_params());
        let reloaded = second.recommend_crop(rice_reading()).await.unwrap();

        assert_eq!(trained.recommended_crop, reloaded.recommended_crop);
        assert!((trained.confidence - reloaded.confidence).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_missing_dataset_is_unavailable_and_retried() {
        let dir = tempfile::tempdir().unwrap();
        let dataset = dir.path().join("later.csv");
        let recommender =
            CropRecommender::with_params(dir.path().join("models"), &dataset, quick_params());

        let err = recommender.recommend_crop(rice_reading()).await.unwrap_err();
        assert!(matches!(err, CropModelError::DatasetMissing(_)));
        assert!(matches!(AppError::from(err), AppError::ServiceUnavailable(_)));
        assert!(!recommender.is_loaded());

        // A failed initialisation leaves the cell empty; the next call retries
        let written = write_dataset(dir.path(), 20);
        std::fs::rename(written, &dataset).unwrap();
        let prediction = recommender.recommend_crop(rice_reading()).await.unwrap();
        assert_eq!(prediction.recommended_crop, "rice");
        assert!(recommender.is_loaded());
    }

    #[tokio::test]
    async fn test_requirements_and_crop_list() {
        let dir = tempfile::tempdir().unwrap();
        let dataset = write_dataset(dir.path(), 12);
        let recommender =
            CropRecommender::with_params(dir.path().join("models"), &dataset, quick_params());

        let crops = recommender.get_all_crops().await.unwrap();
        assert_eq!(crops, vec!["chickpea", "cotton", "mango", "rice"]);

        let mango = recommender.get_crop_requirements("Mango").await.unwrap().unwrap();
        assert_eq!(mango.samples_count, 12);
        assert!(recommender
            .get_crop_requirements("nonexistent_crop")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_batch_echoes_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let dataset = write_dataset(dir.path(), 20);
        let recommender =
            CropRecommender::with_params(dir.path().join("models"), &dataset, quick_params());

        let chickpea = SoilReading {
            nitrogen: 40.0,
            phosphorous: 68.0,
            potassium: 80.0,
            temperature: 18.0,
            humidity: 16.0,
            ph: 7.3,
            rainfall: 80.0,
        };
        let results = recommender
            .recommend_crops_batch(vec![rice_reading(), chickpea])
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].input_data, rice_reading());
        assert_eq!(results[1].prediction.recommended_crop, "chickpea");
    }

    #[tokio::test]
    async fn test_retrain_swaps_model() {
        let dir = tempfile::tempdir().unwrap();
        let dataset = write_dataset(dir.path(), 20);
        let recommender =
            CropRecommender::with_params(dir.path().join("models"), &dataset, quick_params());

        let before = recommender.model().await.unwrap();
        let after = recommender.retrain().await.unwrap();
        let current = recommender.model().await.unwrap();

        assert!(!Arc::ptr_eq(&before, &current));
        assert!(Arc::ptr_eq(&after, &current));
    }

    #[tokio::test]
    async fn test_retrain_rereads_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let dataset = write_crops(dir.path(), &CROP_CENTRES[..2], 20);
        let recommender =
            CropRecommender::with_params(dir.path().join("models"), &dataset, quick_params());

        assert_eq!(recommender.get_all_crops().await.unwrap(), vec!["chickpea", "rice"]);
        assert_eq!(recommender.model().await.unwrap().encoder.len(), 2);

        let wheat = ("wheat", [100.0, 50.0, 50.0, 12.0, 60.0, 6.8, 60.0]);
        let mut crops = CROP_CENTRES[..2].to_vec();
        crops.push(wheat);
        write_crops(dir.path(), &crops, 20);

        let model = recommender.retrain().await.unwrap();
        assert_eq!(model.encoder.classes, vec!["chickpea", "rice", "wheat"]);
        assert_eq!(
            recommender.get_all_crops().await.unwrap(),
            vec!["chickpea", "rice", "wheat"]
        );
        let requirements = recommender.get_crop_requirements("wheat").await.unwrap();
        assert_eq!(requirements.unwrap().samples_count, 20);

        let [nitrogen, phosphorous, potassium, temperature, humidity, ph, rainfall] = wheat.1;
        let prediction = recommender
            .recommend_crop(SoilReading {
                nitrogen,
                phosphorous,
                potassium,
                temperature,
                humidity,
                ph,
                rainfall,
            })
            .await
            .unwrap();
        assert_eq!(prediction.recommended_crop, "wheat");
    }

    #[tokio::test]
    async fn test_concurrent_first_calls_share_one_model() {
        let dir = tempfile::tempdir().unwrap();
        let dataset = write_dataset(dir.path(), 20);
        let recommender = Arc::new(CropRecommender::with_params(
            dir.path().join("models"),
            &dataset,
            quick_params(),
        ));

        let (a, b) = tokio::join!(recommender.model(), recommender.model());
        assert!(Arc::ptr_eq(&a.unwrap(), &b.unwrap()));
    }
}
