use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Land;

/// Audit row for a search request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct UserQuery {
    pub id: i64,
    pub user_id: Option<i64>,
    pub query_text: String,
    pub query_type: String,
    pub results_count: i32,
    pub top_result_id: Option<i64>,
    pub response_time_ms: Option<i32>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewUserQuery {
    pub user_id: Option<i64>,
    pub query_text: String,
    pub query_type: String,
    pub results_count: i32,
    pub top_result_id: Option<i64>,
    pub response_time_ms: Option<i32>,
}

/// Bookmark of a land by a user, unique per pair
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct SavedLand {
    pub id: i64,
    pub user_id: i64,
    pub land_id: i64,
    pub notes: String,
    pub saved_at: DateTime<Utc>,
}

/// A bookmark joined with the listing it points at
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SavedLandEntry {
    #[serde(flatten)]
    pub saved: SavedLand,
    pub land: Land,
}
