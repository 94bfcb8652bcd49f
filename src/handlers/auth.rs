//! HTTP handlers for authentication endpoints

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::error::AppResult;
use crate::services::auth::{
    AuthService, AuthTokens, LoginInput, RegisterInput, RegisterResponse, ResetConfirmInput,
    ResetRequestInput, VerifyInput,
};
use crate::AppState;

/// Register a new account
pub async fn register(
    State(state): State<AppState>,
    Json(input): Json<RegisterInput>,
) -> AppResult<(StatusCode, Json<RegisterResponse>)> {
    let service = AuthService::new(state.db, &state.config);
    let response = service.register(input).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Verify an account with its one-time code
pub async fn verify(
    State(state): State<AppState>,
    Json(input): Json<VerifyInput>,
) -> AppResult<Json<MessageResponse>> {
    let service = AuthService::new(state.db, &state.config);
    service.verify(input).await?;
    Ok(Json(MessageResponse {
        message: "Account verified".to_string(),
    }))
}

/// Log in with email and password
pub async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginInput>,
) -> AppResult<Json<AuthTokens>> {
    let service = AuthService::new(state.db, &state.config);
    let tokens = service.login(input).await?;
    Ok(Json(tokens))
}

/// Request a password reset code
pub async fn request_password_reset(
    State(state): State<AppState>,
    Json(input): Json<ResetRequestInput>,
) -> AppResult<Json<MessageResponse>> {
    let email = input.email.clone();
    let service = AuthService::new(state.db.clone(), &state.config);

    if let Some(code) = service.request_password_reset(input).await? {
        let mail = state.mail_client();
        let html = format!(
            "<p>Your MeteoWatch password reset code is <strong>{}</strong>. It expires in one hour.</p>",
            code
        );
        if let Err(e) = mail.send_html(&email, "MeteoWatch password reset", &html).await {
            tracing::warn!(error = %e, "failed to send password reset email");
        }
    }

    // Same response whether or not the address exists
    Ok(Json(MessageResponse {
        message: "If the address has an account, a reset code was sent".to_string(),
    }))
}

/// Confirm a password reset
pub async fn confirm_password_reset(
    State(state): State<AppState>,
    Json(input): Json<ResetConfirmInput>,
) -> AppResult<Json<MessageResponse>> {
    let service = AuthService::new(state.db, &state.config);
    service.confirm_password_reset(input).await?;
    Ok(Json(MessageResponse {
        message: "Password updated".to_string(),
    }))
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}
