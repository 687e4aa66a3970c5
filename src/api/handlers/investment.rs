use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::extract::{ApiJson, ApiPath, ApiQuery, CurrentUser};
use crate::api::AppState;
use crate::error::{AppError, AppResult, FieldErrors};
use crate::models::{NewDevelopmentUseCase, NewGovernmentProject, NewInfrastructure};
use crate::services::investment;

use super::check_coordinates;

#[derive(Debug, Default, Deserialize)]
pub struct CityParams {
    pub city: Option<String>,
}

impl CityParams {
    fn city(self) -> Option<String> {
        self.city.filter(|c| !c.trim().is_empty())
    }
}

/// Stored investor recommendations of a listing, best first
pub async fn list_recommendations(
    State(state): State<AppState>,
    ApiPath(land_id): ApiPath<i64>,
) -> AppResult<Json<Value>> {
    if state.store.get_land(land_id).await?.is_none() {
        return Err(AppError::NotFound(format!("Land {} not found", land_id)));
    }
    let recommendations = state.store.list_land_recommendations(land_id).await?;

    Ok(Json(json!({
        "success": true,
        "land_id": land_id,
        "count": recommendations.len(),
        "recommendations": recommendations,
    })))
}

/// Recompute a listing's investor recommendations, replacing the stored ones
pub async fn regenerate_recommendations(
    State(state): State<AppState>,
    ApiPath(land_id): ApiPath<i64>,
) -> AppResult<Json<Value>> {
    let land = state
        .store
        .get_land(land_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Land {} not found", land_id)))?;

    let recommendations = investment::refresh_recommendations(state.store.as_ref(), &land).await?;

    Ok(Json(json!({
        "success": true,
        "land_id": land_id,
        "count": recommendations.len(),
        "recommendations": recommendations,
    })))
}

pub async fn list_use_cases(State(state): State<AppState>) -> AppResult<Json<Value>> {
    let use_cases = state.store.list_use_cases().await?;
    Ok(Json(json!({
        "success": true,
        "count": use_cases.len(),
        "use_cases": use_cases,
    })))
}

pub async fn create_use_case(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    ApiJson(request): ApiJson<NewDevelopmentUseCase>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let mut errors = FieldErrors::new();
    errors.check_not_blank("name", &request.name);
    errors.check_max_len("name", &request.name, 50);
    errors.check_not_blank("display_name", &request.display_name);
    errors.check_range("min_size_acres", request.min_size_acres, 0.0, f64::MAX);
    errors.check_range("typical_roi_min", request.typical_roi_min, 0.0, 1000.0);
    errors.check_range("typical_roi_max", request.typical_roi_max, 0.0, 1000.0);
    if request.typical_roi_max < request.typical_roi_min {
        errors.add("typical_roi_max", "Must be greater than or equal to typical_roi_min.");
    }
    errors.check_range("typical_payback_years", request.typical_payback_years, 0.0, 100.0);
    errors.into_result()?;

    let use_case = state.store.create_use_case(request).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "use_case": use_case })),
    ))
}

pub async fn list_infrastructure(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<CityParams>,
) -> AppResult<Json<Value>> {
    let infrastructure = state.store.list_infrastructure(params.city()).await?;
    Ok(Json(json!({
        "success": true,
        "count": infrastructure.len(),
        "infrastructure": infrastructure,
    })))
}

pub async fn create_infrastructure(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    ApiJson(request): ApiJson<NewInfrastructure>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let mut errors = FieldErrors::new();
    errors.check_not_blank("name", &request.name);
    errors.check_max_len("name", &request.name, 200);
    errors.check_not_blank("city", &request.city);
    check_coordinates(&mut errors, request.latitude, request.longitude);
    errors.into_result()?;

    let infrastructure = state.store.create_infrastructure(request).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "infrastructure": infrastructure })),
    ))
}

pub async fn list_government_projects(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<CityParams>,
) -> AppResult<Json<Value>> {
    let projects = state.store.list_government_projects(params.city()).await?;
    Ok(Json(json!({
        "success": true,
        "count": projects.len(),
        "government_projects": projects,
    })))
}

pub async fn create_government_project(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    ApiJson(request): ApiJson<NewGovernmentProject>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let mut errors = FieldErrors::new();
    errors.check_not_blank("name", &request.name);
    errors.check_max_len("name", &request.name, 200);
    errors.check_not_blank("city", &request.city);
    check_coordinates(&mut errors, request.latitude, request.longitude);
    if request.radius_km.is_nan() || request.radius_km <= 0.0 {
        errors.add("radius_km", "Ensure this value is greater than 0.");
    }
    if let Some(appreciation) = request.expected_land_appreciation {
        errors.check_range("expected_land_appreciation", appreciation, 0.0, 1000.0);
    }
    errors.into_result()?;

    let project = state.store.create_government_project(request).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "government_project": project })),
    ))
}
