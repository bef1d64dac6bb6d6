//! Order tracking handlers

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use shared::{Order, PaginatedResponse};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::order::{OrderDetail, OrderImagesInput, OrderListQuery};
use crate::services::OrderService;
use crate::AppState;

fn order_service(state: &AppState) -> OrderService {
    OrderService::new(
        state.db.clone(),
        state.config.rewards.points_per_completed_order,
    )
}

pub async fn list_orders(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<OrderListQuery>,
) -> AppResult<Json<PaginatedResponse<Order>>> {
    Ok(Json(order_service(&state).list_orders(&user, query).await?))
}

/// Order with its status history
pub async fn get_order(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<OrderDetail>> {
    Ok(Json(order_service(&state).get_order(&user, order_id).await?))
}

/// Supplier marks the order shipped
pub async fn ship_order(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<OrderDetail>> {
    Ok(Json(order_service(&state).ship_order(&user, order_id).await?))
}

/// Vendor confirms receipt
pub async fn receive_order(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<OrderDetail>> {
    Ok(Json(order_service(&state).receive_order(&user, order_id).await?))
}

/// Attach delivery photos
pub async fn attach_order_images(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(order_id): Path<Uuid>,
    Json(body): Json<OrderImagesInput>,
) -> AppResult<Json<OrderDetail>> {
    Ok(Json(
        order_service(&state)
            .attach_images(&user, order_id, body)
            .await?,
    ))
}

/// Download order history as CSV
pub async fn export_orders(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<impl IntoResponse> {
    let csv = order_service(&state).export_orders_csv(&user).await?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"orders.csv\""),
        ],
        csv,
    ))
}
