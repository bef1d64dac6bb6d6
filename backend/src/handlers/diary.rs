//! Diary handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use shared::DiaryEntry;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::diary::{CreateDiaryInput, DiaryListQuery, UpdateDiaryInput};
use crate::services::DiaryService;
use crate::AppState;

pub async fn list_diary_entries(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<DiaryListQuery>,
) -> AppResult<Json<Vec<DiaryEntry>>> {
    let service = DiaryService::new(state.db.clone());
    Ok(Json(service.list_entries(user.user_id, query).await?))
}

pub async fn create_diary_entry(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<CreateDiaryInput>,
) -> AppResult<(StatusCode, Json<DiaryEntry>)> {
    let service = DiaryService::new(state.db.clone());
    let entry = service.create_entry(user.user_id, body).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

pub async fn get_diary_entry(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(entry_id): Path<Uuid>,
) -> AppResult<Json<DiaryEntry>> {
    let service = DiaryService::new(state.db.clone());
    Ok(Json(service.get_entry(user.user_id, entry_id).await?))
}

pub async fn update_diary_entry(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(entry_id): Path<Uuid>,
    Json(body): Json<UpdateDiaryInput>,
) -> AppResult<Json<DiaryEntry>> {
    let service = DiaryService::new(state.db.clone());
    Ok(Json(service.update_entry(user.user_id, entry_id, body).await?))
}

pub async fn delete_diary_entry(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(entry_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let service = DiaryService::new(state.db.clone());
    service.delete_entry(user.user_id, entry_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
