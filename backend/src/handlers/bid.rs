//! Requirement (bid) handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use shared::{Bid, PaginatedResponse};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::bid::{BidListQuery, BidSummary, CreateBidInput, DeletedBid};
use crate::services::BidService;
use crate::AppState;

/// Post a requirement
pub async fn create_bid(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<CreateBidInput>,
) -> AppResult<(StatusCode, Json<Bid>)> {
    let service = BidService::new(state.db.clone());
    let bid = service.create_bid(&user, body).await?;
    Ok((StatusCode::CREATED, Json(bid)))
}

/// List requirements
pub async fn list_bids(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<BidListQuery>,
) -> AppResult<Json<PaginatedResponse<BidSummary>>> {
    let service = BidService::new(state.db.clone());
    Ok(Json(service.list_bids(&user, query).await?))
}

/// Get a requirement
pub async fn get_bid(
    State(state): State<AppState>,
    CurrentUser(_): CurrentUser,
    Path(bid_id): Path<Uuid>,
) -> AppResult<Json<Bid>> {
    let service = BidService::new(state.db.clone());
    Ok(Json(service.get_bid(bid_id).await?))
}

/// Delete an open requirement and its proposals
pub async fn delete_bid(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(bid_id): Path<Uuid>,
) -> AppResult<Json<DeletedBid>> {
    let service = BidService::new(state.db.clone());
    Ok(Json(service.delete_bid(&user, bid_id).await?))
}

/// Close a requirement without awarding it
pub async fn close_bid(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(bid_id): Path<Uuid>,
) -> AppResult<Json<Bid>> {
    let service = BidService::new(state.db.clone());
    Ok(Json(service.close_bid(&user, bid_id).await?))
}
