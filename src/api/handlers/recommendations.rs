use std::time::Instant;

use axum::{extract::State, Json};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::extract::{ApiJson, ApiPath, ApiQuery, MaybeUser};
use crate::api::AppState;
use crate::error::{AppError, AppResult, FieldErrors};
use crate::models::LandType;
use crate::services::land_scoring::{
    score_land, LandRequirements, DEFAULT_LIMIT, DEFAULT_SIMILAR_LIMIT,
};
use crate::services::land_search::{self, SearchKind};

use super::lands::LandDetail;
use super::resolve_limit;

/// Records every out-of-range requirement field
fn check_requirements(errors: &mut FieldErrors, req: &LandRequirements) {
    errors.check_range("min_size", req.min_size, 0.0, f64::MAX);
    errors.check_range("min_price", req.min_price, 0.0, f64::MAX);
    if let Some(max_size) = req.max_size {
        if max_size < req.min_size {
            errors.add("max_size", "Must be greater than or equal to min_size.");
        }
    }
    if let Some(max_price) = req.max_price {
        if max_price < req.min_price {
            errors.add("max_price", "Must be greater than or equal to min_price.");
        }
    }
    errors.check_range("connectivity_importance", req.connectivity_importance, 0.0, 1.0);
    errors.check_range("infrastructure_importance", req.infrastructure_importance, 0.0, 1.0);
    if let Some(location) = &req.location_preference {
        errors.check_max_len("location_preference", location, 100);
    }
}

/// Flat body: the requirement fields sit next to `limit`
#[derive(Debug, Default, Deserialize)]
pub struct RecommendRequest {
    #[serde(flatten)]
    pub requirements: LandRequirements,
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Rank available listings against the posted requirements
pub async fn recommend(
    State(state): State<AppState>,
    caller: MaybeUser,
    ApiJson(request): ApiJson<RecommendRequest>,
) -> AppResult<Json<Value>> {
    let started = Instant::now();

    let mut errors = FieldErrors::new();
    check_requirements(&mut errors, &request.requirements);
    let limit = resolve_limit(&mut errors, request.limit, DEFAULT_LIMIT);
    errors.into_result()?;

    let recommendations = land_search::recommend(
        state.store.as_ref(),
        caller.id(),
        &request.requirements,
        limit,
        SearchKind::Recommend,
    )
    .await?;

    Ok(Json(json!({
        "success": true,
        "response_time_ms": started.elapsed().as_millis() as u64,
        "count": recommendations.len(),
        "requirements": request.requirements,
        "recommendations": recommendations,
    })))
}

/// Query-string form of [`LandRequirements`]
#[derive(Debug, Default, Deserialize)]
pub struct QuickMatchParams {
    pub purpose: Option<LandType>,
    #[serde(alias = "location_preference")]
    pub location: Option<String>,
    pub min_size: Option<f64>,
    pub max_size: Option<f64>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub connectivity_importance: Option<f64>,
    pub infrastructure_importance: Option<f64>,
    pub limit: Option<usize>,
}

impl QuickMatchParams {
    fn requirements(&self) -> LandRequirements {
        let defaults = LandRequirements::default();
        LandRequirements {
            purpose: self.purpose,
            min_size: self.min_size.unwrap_or(defaults.min_size),
            max_size: self.max_size,
            min_price: self.min_price.unwrap_or(defaults.min_price),
            max_price: self.max_price,
            location_preference: self.location.clone(),
            connectivity_importance: self
                .connectivity_importance
                .unwrap_or(defaults.connectivity_importance),
            infrastructure_importance: self
                .infrastructure_importance
                .unwrap_or(defaults.infrastructure_importance),
        }
    }
}

/// Same ranking as [`recommend`] driven by query parameters
pub async fn quick_match(
    State(state): State<AppState>,
    caller: MaybeUser,
    ApiQuery(params): ApiQuery<QuickMatchParams>,
) -> AppResult<Json<Value>> {
    let requirements = params.requirements();
    let mut errors = FieldErrors::new();
    check_requirements(&mut errors, &requirements);
    let limit = resolve_limit(&mut errors, params.limit, DEFAULT_LIMIT);
    errors.into_result()?;

    let matches = land_search::recommend(
        state.store.as_ref(),
        caller.id(),
        &requirements,
        limit,
        SearchKind::QuickMatch,
    )
    .await?;

    Ok(Json(json!({
        "success": true,
        "count": matches.len(),
        "requirements": requirements,
        "matches": matches,
    })))
}

#[derive(Debug, Default, Deserialize)]
pub struct SimilarParams {
    pub limit: Option<usize>,
}

/// Listings most similar to the given one
pub async fn similar(
    State(state): State<AppState>,
    caller: MaybeUser,
    ApiPath(id): ApiPath<i64>,
    ApiQuery(params): ApiQuery<SimilarParams>,
) -> AppResult<Json<Value>> {
    let mut errors = FieldErrors::new();
    let limit = resolve_limit(&mut errors, params.limit, DEFAULT_SIMILAR_LIMIT);
    errors.into_result()?;

    let (reference, similar) =
        land_search::similar(state.store.as_ref(), caller.id(), id, limit).await?;

    Ok(Json(json!({
        "success": true,
        "reference_land": { "id": reference.id, "name": reference.name, "city": reference.city },
        "count": similar.len(),
        "similar_lands": similar,
    })))
}

#[derive(Debug, Default, Deserialize)]
pub struct ScoreRequest {
    #[serde(flatten)]
    pub requirements: LandRequirements,
}

/// One listing's detail together with its suitability for the posted requirements
pub async fn score(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(request): ApiJson<ScoreRequest>,
) -> AppResult<Json<Value>> {
    let mut errors = FieldErrors::new();
    check_requirements(&mut errors, &request.requirements);
    errors.into_result()?;

    let land = state
        .store
        .get_land(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Land {} not found", id)))?;
    let score = score_land(&land, &request.requirements);

    Ok(Json(json!({
        "success": true,
        "land": LandDetail::from(&land),
        "score": score,
    })))
}
