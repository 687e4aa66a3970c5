use axum::{
    http::StatusCode,
    middleware,
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::{make_span_with_request_id, request_id_middleware};

use super::handlers::{crops, investment, lands, recommendations, soil, users};
use super::AppState;

/// Creates the application router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
        // outermost, so the trace span can read the request id
        .layer(middleware::from_fn(request_id_middleware))
        .layer(CorsLayer::permissive())
}

/// Routes under /api
fn api_routes() -> Router<AppState> {
    Router::new()
        // Users
        .route("/users/", post(users::create_user))
        .route(
            "/user/profile/",
            get(users::get_profile).patch(users::update_profile),
        )
        // Lands
        .route("/lands/", get(lands::list_lands).post(lands::create_land))
        .route("/lands/:id/", get(lands::get_land).patch(lands::update_land))
        // Land recommendations
        .route("/lands/recommend/", post(recommendations::recommend))
        .route("/lands/quick-match/", get(recommendations::quick_match))
        .route("/lands/:id/similar/", get(recommendations::similar))
        .route("/lands/:id/score/", post(recommendations::score))
        // Investor analysis
        .route(
            "/lands/:id/investment-recommendations/",
            get(investment::list_recommendations).post(investment::regenerate_recommendations),
        )
        .route(
            "/use-cases/",
            get(investment::list_use_cases).post(investment::create_use_case),
        )
        .route(
            "/infrastructure/",
            get(investment::list_infrastructure).post(investment::create_infrastructure),
        )
        .route(
            "/government-projects/",
            get(investment::list_government_projects).post(investment::create_government_project),
        )
        // Bookmarks
        .route(
            "/user/saved-lands/",
            get(lands::list_saved_lands).post(lands::save_land),
        )
        .route("/user/saved-lands/:land_id/", delete(lands::remove_saved_land))
        // Crops
        .route("/crops/recommend/", post(crops::recommend))
        .route("/crops/recommend/batch/", post(crops::recommend_batch))
        .route("/crops/retrain/", post(crops::retrain))
        .route("/crops/available/", get(crops::available_crops))
        .route("/crops/stats/", get(crops::stats))
        .route("/crops/:name/requirements/", get(crops::requirements))
        .route("/user/crop-recommendations/", get(crops::history))
        // Soil tests
        .route("/soil-data/", get(soil::list_soil_data).post(soil::create_soil_data))
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}
