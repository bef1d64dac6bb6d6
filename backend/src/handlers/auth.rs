//! Authentication handlers

use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use shared::User;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::auth::{
    AuthSession, AuthTokens, LoginInput, OtpChallengeIssued, OtpRequestInput, OtpVerifyInput,
    RegisterInput,
};
use crate::services::{AuthService, UserService};
use crate::AppState;

#[derive(Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Register endpoint handler
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterInput>,
) -> AppResult<(StatusCode, Json<AuthSession>)> {
    let auth_service = AuthService::new(state.db.clone(), &state.config);
    let session = auth_service.register(body).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

/// Login endpoint handler
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginInput>,
) -> AppResult<Json<AuthSession>> {
    let auth_service = AuthService::new(state.db.clone(), &state.config);
    Ok(Json(auth_service.login(body).await?))
}

/// Issue a one-time sign-in code for a phone number
pub async fn request_otp(
    State(state): State<AppState>,
    Json(body): Json<OtpRequestInput>,
) -> AppResult<(StatusCode, Json<OtpChallengeIssued>)> {
    let auth_service = AuthService::new(state.db.clone(), &state.config);
    let issued = auth_service.request_otp(body).await?;
    Ok((StatusCode::ACCEPTED, Json(issued)))
}

/// Exchange a one-time code for a session
pub async fn verify_otp(
    State(state): State<AppState>,
    Json(body): Json<OtpVerifyInput>,
) -> AppResult<Json<AuthSession>> {
    let auth_service = AuthService::new(state.db.clone(), &state.config);
    Ok(Json(auth_service.verify_otp(body).await?))
}

/// Refresh token endpoint handler
pub async fn refresh(
    State(state): State<AppState>,
    Json(body): Json<RefreshRequest>,
) -> AppResult<Json<AuthTokens>> {
    let auth_service = AuthService::new(state.db.clone(), &state.config);
    Ok(Json(auth_service.refresh_token(&body.refresh_token).await?))
}

/// Revoke the given refresh token
pub async fn logout(
    State(state): State<AppState>,
    Json(body): Json<RefreshRequest>,
) -> AppResult<StatusCode> {
    let auth_service = AuthService::new(state.db.clone(), &state.config);
    auth_service.logout(&body.refresh_token).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Current account, used to restore a session
pub async fn me(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<User>> {
    let service = UserService::new(state.db.clone());
    Ok(Json(service.get_user(user.user_id).await?))
}
