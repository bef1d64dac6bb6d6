//! Alert handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use shared::{Alert, AlertRequest};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::alert::{AlertList, AlertListQuery};
use crate::services::AlertService;
use crate::AppState;

fn alert_service(state: &AppState) -> AlertService {
    AlertService::new(state.db.clone(), state.text_generation.clone())
}

#[derive(Serialize)]
pub struct MarkedRead {
    pub updated: u64,
}

pub async fn list_alerts(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<AlertListQuery>,
) -> AppResult<Json<AlertList>> {
    Ok(Json(alert_service(&state).list_alerts(user.user_id, query).await?))
}

/// Generate an alert from an event description
pub async fn generate_alert(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<AlertRequest>,
) -> AppResult<(StatusCode, Json<Alert>)> {
    let alert = alert_service(&state).generate_alert(user.user_id, body).await?;
    Ok((StatusCode::CREATED, Json(alert)))
}

pub async fn mark_alert_read(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(alert_id): Path<Uuid>,
) -> AppResult<Json<Alert>> {
    Ok(Json(alert_service(&state).mark_read(user.user_id, alert_id).await?))
}

pub async fn mark_all_alerts_read(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<MarkedRead>> {
    let updated = alert_service(&state).mark_all_read(user.user_id).await?;
    Ok(Json(MarkedRead { updated }))
}
