//! Profile, compliance and supplier discovery handlers

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use shared::{PublicProfile, SupplierMatch, User};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::CurrentUser;
use crate::services::review::UserReviews;
use crate::services::user::{
    ComplianceDecisionInput, DiscoveryQuery, SubmitComplianceInput, UpdateProfileInput,
};
use crate::services::{ReviewService, UserService};
use crate::AppState;

pub const ADMIN_KEY_HEADER: &str = "x-admin-key";

/// Update the caller's profile
pub async fn update_profile(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<UpdateProfileInput>,
) -> AppResult<Json<User>> {
    let service = UserService::new(state.db.clone());
    Ok(Json(service.update_profile(user.user_id, body).await?))
}

/// Submit compliance documents for verification
pub async fn submit_compliance(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<SubmitComplianceInput>,
) -> AppResult<Json<User>> {
    let service = UserService::new(state.db.clone());
    Ok(Json(service.submit_compliance(user.user_id, body).await?))
}

/// Public profile of any user
pub async fn get_profile(
    State(state): State<AppState>,
    CurrentUser(_): CurrentUser,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<PublicProfile>> {
    let service = UserService::new(state.db.clone());
    Ok(Json(service.get_public_profile(user_id).await?))
}

/// Reviews a user has received
pub async fn list_user_reviews(
    State(state): State<AppState>,
    CurrentUser(_): CurrentUser,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<UserReviews>> {
    let service = ReviewService::new(state.db.clone());
    Ok(Json(service.list_for_user(user_id).await?))
}

/// Find suppliers and farmers
pub async fn discover_suppliers(
    State(state): State<AppState>,
    CurrentUser(_): CurrentUser,
    Query(query): Query<DiscoveryQuery>,
) -> AppResult<Json<Vec<SupplierMatch>>> {
    let service = UserService::new(state.db.clone());
    Ok(Json(service.discover_suppliers(query).await?))
}

/// Operator decision on a compliance submission
pub async fn decide_compliance(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(user_id): Path<Uuid>,
    Json(body): Json<ComplianceDecisionInput>,
) -> AppResult<Json<User>> {
    require_admin_key(&headers, state.config.admin.api_key.as_deref())?;

    let service = UserService::new(state.db.clone());
    Ok(Json(service.decide_compliance(user_id, body).await?))
}

/// Check the operator key header. Operator routes are closed when no key is configured.
pub fn require_admin_key(headers: &HeaderMap, expected: Option<&str>) -> AppResult<()> {
    let Some(expected) = expected.filter(|k| !k.is_empty()) else {
        return Err(AppError::Forbidden("Operator endpoints are disabled".to_string()));
    };

    let provided = headers
        .get(ADMIN_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing operator key".to_string()))?;

    if constant_time_eq(provided.as_bytes(), expected.as_bytes()) {
        Ok(())
    } else {
        Err(AppError::Forbidden("Invalid operator key".to_string()))
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
