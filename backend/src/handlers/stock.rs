//! Stock handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use shared::StockItem;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::stock::{CreateStockInput, StockList, StockListQuery, UpdateStockInput};
use crate::services::StockService;
use crate::AppState;

pub async fn list_stock(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<StockListQuery>,
) -> AppResult<Json<StockList>> {
    let service = StockService::new(state.db.clone());
    Ok(Json(service.list_items(user.user_id, query).await?))
}

pub async fn create_stock_item(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<CreateStockInput>,
) -> AppResult<(StatusCode, Json<StockItem>)> {
    let service = StockService::new(state.db.clone());
    let item = service.create_item(user.user_id, body).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn get_stock_item(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(item_id): Path<Uuid>,
) -> AppResult<Json<StockItem>> {
    let service = StockService::new(state.db.clone());
    Ok(Json(service.get_item(user.user_id, item_id).await?))
}

pub async fn update_stock_item(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(item_id): Path<Uuid>,
    Json(body): Json<UpdateStockInput>,
) -> AppResult<Json<StockItem>> {
    let service = StockService::new(state.db.clone());
    Ok(Json(service.update_item(user.user_id, item_id, body).await?))
}

pub async fn delete_stock_item(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(item_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let service = StockService::new(state.db.clone());
    service.delete_item(user.user_id, item_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
