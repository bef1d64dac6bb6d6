//! Dashboard handlers

use axum::{extract::State, Json};

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::dashboard::DashboardMetrics;
use crate::services::DashboardService;
use crate::AppState;

/// Get dashboard metrics
pub async fn get_dashboard(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<DashboardMetrics>> {
    let service = DashboardService::new(state.db.clone());
    let metrics = service.get_dashboard_metrics(&user).await?;
    Ok(Json(metrics))
}
