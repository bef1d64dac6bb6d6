//! Review handlers

use axum::{extract::State, http::StatusCode, Json};
use shared::Review;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::review::CreateReviewInput;
use crate::services::ReviewService;
use crate::AppState;

/// Review the other party of a received order
pub async fn create_review(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<CreateReviewInput>,
) -> AppResult<(StatusCode, Json<Review>)> {
    let service = ReviewService::new(state.db.clone());
    let review = service.create_review(&user, body).await?;
    Ok((StatusCode::CREATED, Json(review)))
}
