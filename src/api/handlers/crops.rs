use std::time::Instant;

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::api::extract::{ApiJson, ApiPath, CurrentUser};
use crate::api::AppState;
use crate::error::{AppError, AppResult, FieldErrors};
use crate::models::{
    CropRecommendationRecord, NewCropRecommendation, NewSoilData, SoilSuitability, UserType,
};
use crate::services::crops::{SoilReading, MODEL_VERSION};

/// Largest number of readings accepted in one batch
pub const MAX_BATCH: usize = 100;

/// Field names of a classifier request, in feature order
pub(crate) const READING_FIELDS: [&str; 7] =
    ["N", "P", "K", "temperature", "humidity", "ph", "rainfall"];
/// Field names of a stored soil test, in feature order
pub(crate) const SOIL_FIELDS: [&str; 7] = [
    "nitrogen",
    "phosphorous",
    "potassium",
    "temperature",
    "humidity",
    "ph",
    "rainfall",
];

const READING_BOUNDS: [(f64, f64); 7] = [
    (0.0, 200.0),
    (0.0, 200.0),
    (0.0, 250.0),
    (-10.0, 50.0),
    (0.0, 100.0),
    (0.0, 14.0),
    (0.0, 3500.0),
];

/// Records out-of-range soil and climate values under `prefix` + the matching name
pub(crate) fn check_reading(
    errors: &mut FieldErrors,
    prefix: &str,
    names: &[&str; 7],
    reading: &SoilReading,
) {
    for ((name, (min, max)), value) in names.iter().zip(READING_BOUNDS).zip(reading.features()) {
        errors.check_range(&format!("{}{}", prefix, name), value, min, max);
    }
}

#[derive(Debug, Deserialize)]
pub struct CropRecommendRequest {
    #[serde(flatten)]
    pub reading: SoilReading,
    #[serde(default)]
    pub land_id: Option<i64>,
    #[serde(default)]
    pub location: Option<String>,
}

/// Recommend a crop for one reading and keep the soil test and result
pub async fn recommend(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(request): ApiJson<CropRecommendRequest>,
) -> AppResult<Json<Value>> {
    let started = Instant::now();

    let mut errors = FieldErrors::new();
    check_reading(&mut errors, "", &READING_FIELDS, &request.reading);
    if let Some(location) = &request.location {
        errors.check_max_len("location", location, 255);
    }
    errors.into_result()?;

    let land = match request.land_id {
        Some(land_id) => Some(
            state
                .store
                .get_land(land_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Land {} not found", land_id)))?,
        ),
        None => None,
    };

    let prediction = state.crops.recommend_crop(request.reading).await?;

    let reading = request.reading;
    let location = request
        .location
        .or_else(|| land.as_ref().map(|l| l.city.clone()))
        .unwrap_or_default();
    let soil = state
        .store
        .create_soil_data(
            user.id,
            NewSoilData {
                land_id: land.as_ref().map(|l| l.id),
                nitrogen: reading.nitrogen,
                phosphorous: reading.phosphorous,
                potassium: reading.potassium,
                ph: reading.ph,
                temperature: reading.temperature,
                humidity: reading.humidity,
                rainfall: reading.rainfall,
                location,
                notes: String::new(),
            },
        )
        .await?;

    let suitability = SoilSuitability::from_confidence(prediction.confidence);
    let record = state
        .store
        .create_crop_recommendation(NewCropRecommendation {
            user_id: user.id,
            soil_data_id: soil.id,
            recommended_crop: prediction.recommended_crop.clone(),
            confidence_score: prediction.confidence,
            top_recommendations: prediction.top_5_recommendations.clone(),
            soil_suitability: suitability,
            model_version: MODEL_VERSION.to_string(),
        })
        .await?;

    let response_time_ms = started.elapsed().as_millis() as u64;
    tracing::info!(
        user_id = user.id,
        crop = %prediction.recommended_crop,
        confidence = prediction.confidence,
        response_time_ms,
        "Crop recommended"
    );

    Ok(Json(json!({
        "success": true,
        "response_time_ms": response_time_ms,
        "recommendation": {
            "id": record.id,
            "recommended_crop": prediction.recommended_crop,
            "confidence": prediction.confidence,
            "confidence_percentage": format!("{:.2}%", prediction.confidence * 100.0),
            "top_5_recommendations": prediction.top_5_recommendations,
            "soil_suitability": suitability,
        },
        "input_data": {
            "nitrogen": reading.nitrogen,
            "phosphorous": reading.phosphorous,
            "potassium": reading.potassium,
            "temperature": reading.temperature,
            "humidity": reading.humidity,
            "ph": reading.ph,
            "rainfall": reading.rainfall,
        },
    })))
}

#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    pub inputs: Vec<SoilReading>,
}

/// Recommend for many readings; nothing is stored
pub async fn recommend_batch(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<BatchRequest>,
) -> AppResult<Json<Value>> {
    let mut errors = FieldErrors::new();
    if request.inputs.is_empty() {
        errors.add("inputs", "This list may not be empty.");
    } else if request.inputs.len() > MAX_BATCH {
        errors.add(
            "inputs",
            format!("Ensure this list has no more than {} elements.", MAX_BATCH),
        );
    }
    for (i, reading) in request.inputs.iter().enumerate() {
        check_reading(&mut errors, &format!("inputs[{}].", i), &READING_FIELDS, reading);
    }
    errors.into_result()?;

    let results = state.crops.recommend_crops_batch(request.inputs).await?;

    Ok(Json(json!({
        "success": true,
        "count": results.len(),
        "results": results,
    })))
}

/// Observed growing conditions of a crop in the dataset
pub async fn requirements(
    State(state): State<AppState>,
    ApiPath(name): ApiPath<String>,
) -> AppResult<Json<Value>> {
    let requirements = state
        .crops
        .get_crop_requirements(&name)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Crop '{}' not found in dataset", name)))?;

    Ok(Json(json!({ "success": true, "data": requirements })))
}

pub async fn available_crops(State(state): State<AppState>) -> AppResult<Json<Value>> {
    let crops = state.crops.get_all_crops().await?;
    Ok(Json(json!({
        "success": true,
        "count": crops.len(),
        "crops": crops,
    })))
}

pub async fn stats(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<Value>> {
    let stats = state.store.crop_recommendation_stats(user.id).await?;
    Ok(Json(json!({ "success": true, "stats": stats })))
}

/// Number of recommendations returned by [`history`]
pub const HISTORY_LIMIT: i64 = 20;

#[derive(Debug, Serialize)]
struct HistoryEntry<'a> {
    #[serde(flatten)]
    record: &'a CropRecommendationRecord,
    confidence_percentage: f64,
}

/// The caller's most recent recommendations
pub async fn history(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<Value>> {
    let records = state
        .store
        .list_crop_recommendations(user.id, HISTORY_LIMIT)
        .await?;
    let entries: Vec<HistoryEntry> = records
        .iter()
        .map(|record| HistoryEntry {
            record,
            confidence_percentage: record.confidence_percentage(),
        })
        .collect();

    Ok(Json(json!({
        "success": true,
        "count": entries.len(),
        "recommendations": entries,
    })))
}

/// Retrain the classifier from the dataset; admins only
pub async fn retrain(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<Value>> {
    if user.user_type != UserType::Admin {
        return Err(AppError::Unauthorized("Admin access required".to_string()));
    }

    let model = state.crops.retrain().await?;
    tracing::info!(user_id = user.id, classes = model.encoder.len(), "Crop model retrain requested");

    Ok(Json(json!({
        "success": true,
        "message": "Crop model retrained",
        "crops": model.encoder.classes,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading() -> SoilReading {
        SoilReading {
            nitrogen: 90.0,
            phosphorous: 42.0,
            potassium: 43.0,
            temperature: 20.9,
            humidity: 82.0,
            ph: 6.5,
            rainfall: 202.9,
        }
    }

    #[test]
    fn test_reading_bounds() {
        let mut errors = FieldErrors::new();
        check_reading(&mut errors, "", &READING_FIELDS, &reading());
        assert!(errors.is_empty());

        let mut bad = reading();
        bad.ph = 14.5;
        bad.potassium = 250.0;
        bad.temperature = -11.0;
        check_reading(&mut errors, "inputs[2].", &READING_FIELDS, &bad);
        assert!(errors.get("inputs[2].ph").is_some());
        assert!(errors.get("inputs[2].temperature").is_some());
        assert!(errors.get("inputs[2].K").is_none());
    }

    #[test]
    fn test_request_accepts_short_nutrient_names() {
        let request: CropRecommendRequest = serde_json::from_value(json!({
            "N": 90, "P": 42, "K": 43,
            "temperature": 20.9, "humidity": 82.0, "ph": 6.5, "rainfall": 202.9,
            "land_id": 4
        }))
        .unwrap();
        assert_eq!(request.reading, reading());
        assert_eq!(request.land_id, Some(4));
        assert_eq!(request.location, None);
    }
}
