use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};

use crate::api::extract::{ApiJson, CurrentUser};
use crate::api::AppState;
use crate::error::{AppError, AppResult, FieldErrors};
use crate::models::NewSoilData;
use crate::services::crops::SoilReading;

use super::crops::{check_reading, SOIL_FIELDS};

/// The caller's soil tests, newest first
pub async fn list_soil_data(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<Value>> {
    let soil_tests = state.store.list_soil_data(user.id).await?;
    Ok(Json(json!({
        "success": true,
        "count": soil_tests.len(),
        "soil_tests": soil_tests,
    })))
}

/// Save a soil test, optionally tied to a listing
pub async fn create_soil_data(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(request): ApiJson<NewSoilData>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let mut errors = FieldErrors::new();
    check_reading(
        &mut errors,
        "",
        &SOIL_FIELDS,
        &SoilReading {
            nitrogen: request.nitrogen,
            phosphorous: request.phosphorous,
            potassium: request.potassium,
            temperature: request.temperature,
            humidity: request.humidity,
            ph: request.ph,
            rainfall: request.rainfall,
        },
    );
    errors.check_max_len("location", &request.location, 255);
    errors.into_result()?;

    if let Some(land_id) = request.land_id {
        if state.store.get_land(land_id).await?.is_none() {
            return Err(AppError::NotFound(format!("Land {} not found", land_id)));
        }
    }

    let soil = state.store.create_soil_data(user.id, request).await?;
    tracing::info!(soil_data_id = soil.id, user_id = user.id, "Soil data saved");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Soil data saved successfully",
            "data": soil,
        })),
    ))
}
