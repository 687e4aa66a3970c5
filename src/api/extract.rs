//! Request extractors that reject with [`AppError`] instead of axum's plain-text bodies.

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Path, Query},
    http::request::Parts,
    Json,
};

use crate::error::AppError;
use crate::middleware::request_id::USER_ID_HEADER;
use crate::models::User;

use super::AppState;

#[derive(FromRequest)]
#[from_request(via(Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);

/// The caller identified by the `x-user-id` header; 401 when missing or unknown
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Like [`CurrentUser`] but anonymous callers are let through
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<User>);

impl MaybeUser {
    pub fn id(&self) -> Option<i64> {
        self.0.as_ref().map(|user| user.id)
    }
}

fn caller_id(parts: &Parts) -> Result<Option<i64>, AppError> {
    let Some(value) = parts.headers.get(USER_ID_HEADER) else {
        return Ok(None);
    };
    value
        .to_str()
        .ok()
        .and_then(|v| v.trim().parse::<i64>().ok())
        .map(Some)
        .ok_or_else(|| AppError::Unauthorized(format!("Invalid {} header", USER_ID_HEADER)))
}

async fn load_caller(parts: &Parts, state: &AppState) -> Result<Option<User>, AppError> {
    let Some(id) = caller_id(parts)? else {
        return Ok(None);
    };
    match state.store.get_user(id).await? {
        Some(user) => Ok(Some(user)),
        None => Err(AppError::Unauthorized(format!("Unknown user {}", id))),
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        load_caller(parts, state)
            .await?
            .map(CurrentUser)
            .ok_or_else(|| {
                AppError::Unauthorized("Authentication credentials were not provided.".to_string())
            })
    }
}

#[async_trait]
impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        load_caller(parts, state).await.map(MaybeUser)
    }
}
