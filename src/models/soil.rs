use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

text_enum! {
    /// Coarse rating derived from classifier confidence
    pub enum SoilSuitability {
        Excellent => "excellent",
        Good => "good",
        Moderate => "moderate",
        Poor => "poor",
    }
}

impl SoilSuitability {
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence >= 0.8 {
            SoilSuitability::Excellent
        } else if confidence >= 0.6 {
            SoilSuitability::Good
        } else if confidence >= 0.4 {
            SoilSuitability::Moderate
        } else {
            SoilSuitability::Poor
        }
    }
}

/// A soil test: NPK, pH and climate readings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct SoilData {
    pub id: i64,
    pub land_id: Option<i64>,
    pub user_id: i64,
    pub nitrogen: f64,
    pub phosphorous: f64,
    pub potassium: f64,
    pub ph: f64,
    pub temperature: f64,
    pub humidity: f64,
    pub rainfall: f64,
    pub location: String,
    pub test_date: NaiveDate,
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct NewSoilData {
    #[serde(default, alias = "land")]
    pub land_id: Option<i64>,
    pub nitrogen: f64,
    pub phosphorous: f64,
    pub potassium: f64,
    pub ph: f64,
    pub temperature: f64,
    pub humidity: f64,
    pub rainfall: f64,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub notes: String,
}

/// One entry of a classifier ranking
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CropScore {
    pub crop: String,
    pub confidence: f64,
}

/// A persisted classifier result
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct CropRecommendationRecord {
    pub id: i64,
    pub user_id: i64,
    pub soil_data_id: i64,
    pub recommended_crop: String,
    pub confidence_score: f64,
    #[sqlx(json)]
    pub top_recommendations: Vec<CropScore>,
    #[sqlx(try_from = "String")]
    pub soil_suitability: SoilSuitability,
    pub model_version: String,
    pub created_at: DateTime<Utc>,
}

impl CropRecommendationRecord {
    pub fn confidence_percentage(&self) -> f64 {
        super::round2(self.confidence_score * 100.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewCropRecommendation {
    pub user_id: i64,
    pub soil_data_id: i64,
    pub recommended_crop: String,
    pub confidence_score: f64,
    pub top_recommendations: Vec<CropScore>,
    pub soil_suitability: SoilSuitability,
    pub model_version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct CropCount {
    pub recommended_crop: String,
    pub count: i64,
}

/// Aggregate view over a user's recommendations
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CropStats {
    pub total_recommendations: i64,
    /// Mean confidence as a percentage, 0 when there are no recommendations
    pub avg_confidence: f64,
    pub most_recommended_crops: Vec<CropCount>,
    pub last_recommendation: Option<DateTime<Utc>>,
}
