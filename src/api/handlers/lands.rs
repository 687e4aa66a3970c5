use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::api::extract::{ApiJson, ApiPath, ApiQuery, CurrentUser};
use crate::api::AppState;
use crate::error::{AppError, AppResult, FieldErrors};
use crate::models::{format_rupees, Land, LandFilter, LandStatus, LandType, LandUpdate, NewLand};

use super::check_coordinates;

/// A listing with the derived values shown on detail pages
#[derive(Debug, Serialize)]
pub struct LandDetail<'a> {
    #[serde(flatten)]
    pub land: &'a Land,
    pub avg_connectivity: f64,
    pub infrastructure_available: Vec<&'static str>,
    pub formatted_price: String,
}

impl<'a> From<&'a Land> for LandDetail<'a> {
    fn from(land: &'a Land) -> Self {
        Self {
            land,
            avg_connectivity: land.avg_connectivity_rounded(),
            infrastructure_available: land.infrastructure_available(),
            formatted_price: format_rupees(land.total_price),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LandListParams {
    pub city: Option<String>,
    pub state: Option<String>,
    pub land_type: Option<LandType>,
    pub status: Option<LandStatus>,
    pub featured: Option<bool>,
}

impl From<LandListParams> for LandFilter {
    fn from(params: LandListParams) -> Self {
        LandFilter {
            status: params.status,
            land_type: params.land_type,
            city: params.city.filter(|c| !c.trim().is_empty()),
            state: params.state.filter(|s| !s.trim().is_empty()),
            featured: params.featured,
            ..LandFilter::default()
        }
    }
}

fn check_proximity(errors: &mut FieldErrors, field: &str, score: i32) {
    errors.check_range(field, f64::from(score), 0.0, 100.0);
}

fn validate_new_land(land: &NewLand) -> AppResult<()> {
    let mut errors = FieldErrors::new();
    errors.check_not_blank("name", &land.name);
    errors.check_max_len("name", &land.name, 200);
    errors.check_not_blank("city", &land.city);
    errors.check_not_blank("state", &land.state);
    errors.check_max_len("pincode", &land.pincode, 10);
    check_coordinates(&mut errors, land.latitude, land.longitude);
    if land.size_in_acres.is_nan() || land.size_in_acres <= 0.0 {
        errors.add("size_in_acres", "Ensure this value is greater than 0.");
    }
    errors.check_range("price_per_acre", land.price_per_acre, 0.0, f64::MAX);
    if let Some(total) = land.total_price {
        errors.check_range("total_price", total, 0.0, f64::MAX);
    }
    check_proximity(&mut errors, "highway_proximity_score", land.highway_proximity_score);
    check_proximity(&mut errors, "metro_proximity_score", land.metro_proximity_score);
    check_proximity(&mut errors, "airport_proximity_score", land.airport_proximity_score);
    errors.into_result()
}

fn validate_land_update(update: &LandUpdate) -> AppResult<()> {
    let mut errors = FieldErrors::new();
    if let Some(name) = &update.name {
        errors.check_not_blank("name", name);
        errors.check_max_len("name", name, 200);
    }
    if let Some(size) = update.size_in_acres {
        if size.is_nan() || size <= 0.0 {
            errors.add("size_in_acres", "Ensure this value is greater than 0.");
        }
    }
    if let Some(price) = update.price_per_acre {
        errors.check_range("price_per_acre", price, 0.0, f64::MAX);
    }
    if let Some(total) = update.total_price {
        errors.check_range("total_price", total, 0.0, f64::MAX);
    }
    for (field, score) in [
        ("highway_proximity_score", update.highway_proximity_score),
        ("metro_proximity_score", update.metro_proximity_score),
        ("airport_proximity_score", update.airport_proximity_score),
    ] {
        if let Some(score) = score {
            check_proximity(&mut errors, field, score);
        }
    }
    errors.into_result()
}

/// Logs listings whose total price disagrees with size × price per acre
fn warn_on_price_mismatch(land: &Land) {
    if !land.total_price_consistent() {
        tracing::warn!(
            land_id = land.id,
            total_price = land.total_price,
            expected = land.size_in_acres * land.price_per_acre,
            "Land total price does not match size x price per acre"
        );
    }
}

async fn find_land(state: &AppState, id: i64) -> AppResult<Land> {
    state
        .store
        .get_land(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Land {} not found", id)))
}

/// List listings
pub async fn list_lands(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<LandListParams>,
) -> AppResult<Json<Value>> {
    let lands = state.store.list_lands(params.into()).await?;
    let lands: Vec<LandDetail> = lands.iter().map(LandDetail::from).collect();

    Ok(Json(json!({
        "success": true,
        "count": lands.len(),
        "lands": lands,
    })))
}

/// Create a listing owned by the caller
pub async fn create_land(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(request): ApiJson<NewLand>,
) -> AppResult<(StatusCode, Json<Value>)> {
    validate_new_land(&request)?;

    let land = state.store.create_land(user.id, request).await?;
    warn_on_price_mismatch(&land);
    tracing::info!(land_id = land.id, owner_id = user.id, slug = %land.slug, "Land created");

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "land": LandDetail::from(&land) })),
    ))
}

/// Get a listing and count the view
pub async fn get_land(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<Json<Value>> {
    state.store.increment_land_views(id).await?;
    let land = find_land(&state, id).await?;

    Ok(Json(json!({ "success": true, "land": LandDetail::from(&land) })))
}

/// Partially update a listing
pub async fn update_land(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(update): ApiJson<LandUpdate>,
) -> AppResult<Json<Value>> {
    validate_land_update(&update)?;

    let land = state.store.update_land(id, update).await?;
    warn_on_price_mismatch(&land);
    tracing::info!(land_id = land.id, user_id = user.id, "Land updated");

    Ok(Json(json!({ "success": true, "land": LandDetail::from(&land) })))
}

#[derive(Debug, Deserialize)]
pub struct SaveLandRequest {
    pub land_id: i64,
    #[serde(default)]
    pub notes: String,
}

/// List the caller's bookmarks
pub async fn list_saved_lands(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<Value>> {
    let saved = state.store.list_saved_lands(user.id).await?;

    Ok(Json(json!({
        "success": true,
        "count": saved.len(),
        "saved_lands": saved,
    })))
}

/// Bookmark a listing; a second save of the same listing is a conflict
pub async fn save_land(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(request): ApiJson<SaveLandRequest>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let saved = state
        .store
        .save_land(user.id, request.land_id, request.notes)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Land saved successfully",
            "saved_land": saved,
        })),
    ))
}

/// Remove a bookmark
pub async fn remove_saved_land(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(land_id): ApiPath<i64>,
) -> AppResult<Json<Value>> {
    if !state.store.remove_saved_land(user.id, land_id).await? {
        return Err(AppError::NotFound(format!("Land {} is not saved", land_id)));
    }

    Ok(Json(json!({ "success": true, "message": "Land removed from saved list" })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::land::fixtures::land;

    fn new_land() -> NewLand {
        NewLand {
            name: "Green Acres".to_string(),
            description: String::new(),
            land_type: LandType::Agricultural,
            status: LandStatus::Available,
            latitude: 18.52,
            longitude: 73.85,
            address: String::new(),
            city: "Pune".to_string(),
            state: "Maharashtra".to_string(),
            pincode: "411001".to_string(),
            size_in_acres: 10.0,
            price_per_acre: 200_000.0,
            total_price: None,
            highway_proximity_score: 50,
            metro_proximity_score: 50,
            airport_proximity_score: 50,
            has_water_supply: true,
            has_electricity: true,
            has_road_access: true,
            is_featured: false,
        }
    }

    #[test]
    fn test_new_land_validation() {
        assert!(validate_new_land(&new_land()).is_ok());

        let mut bad = new_land();
        bad.size_in_acres = 0.0;
        bad.latitude = 91.0;
        bad.metro_proximity_score = 120;
        match validate_new_land(&bad) {
            Err(AppError::Validation(errors)) => {
                assert!(errors.get("size_in_acres").is_some());
                assert!(errors.get("latitude").is_some());
                assert!(errors.get("metro_proximity_score").is_some());
                assert!(errors.get("name").is_none());
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_update_validation_only_checks_present_fields() {
        assert!(validate_land_update(&LandUpdate::default()).is_ok());
        let update = LandUpdate {
            highway_proximity_score: Some(-5),
            ..LandUpdate::default()
        };
        assert!(validate_land_update(&update).is_err());
    }

    #[test]
    fn test_land_detail_adds_derived_fields() {
        let l = land(1);
        let value = serde_json::to_value(LandDetail::from(&l)).unwrap();
        assert_eq!(value["id"], 1);
        assert_eq!(value["formatted_price"], "₹3,000,000");
        assert_eq!(value["infrastructure_available"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn test_list_params_drop_blank_filters() {
        let filter: LandFilter = LandListParams {
            city: Some("  ".to_string()),
            featured: Some(true),
            ..LandListParams::default()
        }
        .into();
        assert_eq!(filter.city, None);
        assert_eq!(filter.featured, Some(true));
    }
}
