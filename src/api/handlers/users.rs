use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use serde_json::{json, Value};

use crate::api::extract::{ApiJson, CurrentUser};
use crate::api::AppState;
use crate::error::{AppResult, FieldErrors};
use crate::models::{NewUser, User, UserUpdate};

/// A user with the derived display fields the frontend shows
#[derive(Debug, Serialize)]
pub struct UserProfile<'a> {
    #[serde(flatten)]
    pub user: &'a User,
    pub full_name: String,
    pub initials: String,
}

impl<'a> From<&'a User> for UserProfile<'a> {
    fn from(user: &'a User) -> Self {
        Self {
            user,
            full_name: user.full_name(),
            initials: user.initials(),
        }
    }
}

fn check_email(errors: &mut FieldErrors, email: &str) {
    if !email.is_empty() && !email.contains('@') {
        errors.add("email", "Enter a valid email address.");
    }
}

fn check_profile_lengths(errors: &mut FieldErrors, fields: [(&str, Option<&str>, usize); 4]) {
    for (field, value, max) in fields {
        if let Some(value) = value {
            errors.check_max_len(field, value, max);
        }
    }
}

/// Create a user profile
pub async fn create_user(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<NewUser>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let mut errors = FieldErrors::new();
    errors.check_not_blank("username", &request.username);
    errors.check_max_len("username", &request.username, 150);
    check_email(&mut errors, &request.email);
    check_profile_lengths(
        &mut errors,
        [
            ("first_name", Some(request.first_name.as_str()), 150),
            ("last_name", Some(request.last_name.as_str()), 150),
            ("phone_number", Some(request.phone_number.as_str()), 15),
            ("email", Some(request.email.as_str()), 254),
        ],
    );
    errors.into_result()?;

    let user = state.store.create_user(request).await?;
    tracing::info!(user_id = user.id, username = %user.username, "User created");

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "user": UserProfile::from(&user) })),
    ))
}

/// Get the caller's profile
pub async fn get_profile(CurrentUser(user): CurrentUser) -> Json<Value> {
    Json(json!({ "success": true, "user": UserProfile::from(&user) }))
}

/// Partially update the caller's profile
pub async fn update_profile(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(update): ApiJson<UserUpdate>,
) -> AppResult<Json<Value>> {
    let mut errors = FieldErrors::new();
    if let Some(email) = &update.email {
        check_email(&mut errors, email);
    }
    check_profile_lengths(
        &mut errors,
        [
            ("first_name", update.first_name.as_deref(), 150),
            ("last_name", update.last_name.as_deref(), 150),
            ("phone_number", update.phone_number.as_deref(), 15),
            ("email", update.email.as_deref(), 254),
        ],
    );
    errors.into_result()?;

    let user = state.store.update_user(user.id, update).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Profile updated successfully",
        "user": UserProfile::from(&user),
    })))
}
