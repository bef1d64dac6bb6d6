//! Review service: post-order ratings gated on a completed order

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::{
    ensure_can_review, summarize_ratings, validate_comment, validate_rating, OrderParties,
    RatingSummary, Review,
};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{map_unique_violation, AppError, AppResult};
use crate::middleware::AuthUser;

/// Review service
#[derive(Clone)]
pub struct ReviewService {
    db: PgPool,
}

#[derive(Debug, FromRow)]
struct ReviewRow {
    id: Uuid,
    author_id: Uuid,
    subject_id: Uuid,
    order_id: Uuid,
    rating: i16,
    comment: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<ReviewRow> for Review {
    fn from(row: ReviewRow) -> Self {
        Review {
            id: row.id,
            author_id: row.author_id,
            subject_id: row.subject_id,
            order_id: row.order_id,
            rating: row.rating,
            comment: row.comment,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct OrderPartiesRow {
    vendor_id: Uuid,
    supplier_id: Uuid,
    status: String,
}

/// Input for leaving a review
#[derive(Debug, Deserialize)]
pub struct CreateReviewInput {
    pub order_id: Uuid,
    pub subject_id: Uuid,
    pub rating: i16,
    pub comment: Option<String>,
}

/// A review with the author's business name
#[derive(Debug, Serialize)]
pub struct ReviewView {
    #[serde(flatten)]
    pub review: Review,
    pub author_business_name: String,
}

#[derive(Debug, FromRow)]
struct ReviewViewRow {
    #[sqlx(flatten)]
    review: ReviewRow,
    author_business_name: String,
}

/// Reviews received by a user
#[derive(Debug, Serialize)]
pub struct UserReviews {
    pub subject_id: Uuid,
    pub summary: RatingSummary,
    pub reviews: Vec<ReviewView>,
}

impl ReviewService {
    /// Create a new ReviewService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Leave a review for the other party of a received order. A vendor's
    /// rating of the supplier is also stored on the order.
    pub async fn create_review(&self, user: &AuthUser, input: CreateReviewInput) -> AppResult<Review> {
        validate_rating(input.rating).map_err(|msg| AppError::validation("rating", msg))?;
        let comment = input
            .comment
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());
        if let Some(c) = &comment {
            validate_comment(c).map_err(|msg| AppError::validation("comment", msg))?;
        }

        let mut tx = self.db.begin().await?;

        let orders: Vec<OrderParties> = sqlx::query_as::<_, OrderPartiesRow>(
            "SELECT vendor_id, supplier_id, status FROM orders WHERE id = $1 FOR UPDATE",
        )
        .bind(input.order_id)
        .fetch_optional(&mut *tx)
        .await?
        .map(|row| -> AppResult<OrderParties> {
            Ok(OrderParties {
                vendor_id: row.vendor_id,
                supplier_id: row.supplier_id,
                status: row.status.parse()?,
            })
        })
        .transpose()?
        .into_iter()
        .collect();

        ensure_can_review(user.user_id, input.subject_id, &orders)?;

        let review: Review = sqlx::query_as::<_, ReviewRow>(
            r#"
            INSERT INTO reviews (author_id, subject_id, order_id, rating, comment)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, author_id, subject_id, order_id, rating, comment, created_at
            "#,
        )
        .bind(user.user_id)
        .bind(input.subject_id)
        .bind(input.order_id)
        .bind(input.rating)
        .bind(&comment)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_unique_violation(e, "review"))?
        .into();

        if orders.iter().any(|order| order.rated_by(user.user_id)) {
            sqlx::query("UPDATE orders SET rating = $2, updated_at = NOW() WHERE id = $1")
                .bind(input.order_id)
                .bind(input.rating)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        tracing::info!(review_id = %review.id, order_id = %review.order_id, rating = review.rating, "review submitted");
        Ok(review)
    }

    /// Reviews a user has received, newest first, with their average
    pub async fn list_for_user(&self, subject_id: Uuid) -> AppResult<UserReviews> {
        let rows = sqlx::query_as::<_, ReviewViewRow>(
            r#"
            SELECT r.id, r.author_id, r.subject_id, r.order_id, r.rating, r.comment, r.created_at,
                   u.business_name AS author_business_name
            FROM reviews r
            JOIN users u ON u.id = r.author_id
            WHERE r.subject_id = $1
            ORDER BY r.created_at DESC
            "#,
        )
        .bind(subject_id)
        .fetch_all(&self.db)
        .await?;

        let reviews: Vec<ReviewView> = rows
            .into_iter()
            .map(|row| ReviewView {
                review: row.review.into(),
                author_business_name: row.author_business_name,
            })
            .collect();
        let ratings: Vec<i16> = reviews.iter().map(|r| r.review.rating).collect();

        Ok(UserReviews {
            subject_id,
            summary: summarize_ratings(&ratings),
            reviews,
        })
    }
}
