//! HTTP handlers for user profile endpoints

use axum::{extract::State, Json};

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::users::{UpdateCityInput, User, UserService};
use crate::AppState;

/// Get the calling user's profile
pub async fn get_profile(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<User>> {
    let service = UserService::new(state.db);
    let user = service.get(current_user.0.user_id).await?;
    Ok(Json(user))
}

/// Update the calling user's monitored city
pub async fn update_city(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<UpdateCityInput>,
) -> AppResult<Json<User>> {
    let service = UserService::new(state.db);
    let user = service.update_city(current_user.0.user_id, input).await?;
    Ok(Json(user))
}
