//! Requirement (bid) service: posting, listing, closing and deleting

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{
    validate_requirement, Bid, BidStatus, EventAlert, PaginatedResponse, Pagination,
};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::services::alert::AlertService;

/// Requirement service
#[derive(Clone)]
pub struct BidService {
    db: PgPool,
}

#[derive(Debug, FromRow)]
pub struct BidRow {
    pub id: Uuid,
    pub vendor_id: Uuid,
    pub item_name: String,
    pub description: Option<String>,
    pub quantity: Decimal,
    pub unit: String,
    pub target_price: Decimal,
    pub status: String,
    pub accepted_proposal_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BidRow {
    pub fn into_model(self) -> AppResult<Bid> {
        Ok(Bid {
            id: self.id,
            vendor_id: self.vendor_id,
            item_name: self.item_name,
            description: self.description,
            quantity: self.quantity,
            unit: self.unit,
            target_price: self.target_price,
            status: self.status.parse()?,
            accepted_proposal_id: self.accepted_proposal_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

pub const BID_COLUMNS: &str = "id, vendor_id, item_name, description, quantity, unit, target_price, \
     status, accepted_proposal_id, created_at, updated_at";

/// Input for posting a requirement
#[derive(Debug, Deserialize, Validate)]
pub struct CreateBidInput {
    pub item_name: String,
    #[validate(length(max = 2000, message = "Description must be at most 2000 characters"))]
    pub description: Option<String>,
    pub quantity: Decimal,
    #[validate(length(min = 1, max = 32, message = "Unit must be 1 to 32 characters"))]
    pub unit: String,
    pub target_price: Decimal,
}

/// Listing filters
#[derive(Debug, Deserialize, Default)]
pub struct BidListQuery {
    pub status: Option<BidStatus>,
    /// Only requirements posted by the caller
    #[serde(default)]
    pub mine: bool,
    /// Item name search
    pub q: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl BidListQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination::from_query(self.page, self.per_page)
    }
}

/// A requirement with its proposal count
#[derive(Debug, Serialize)]
pub struct BidSummary {
    #[serde(flatten)]
    pub bid: Bid,
    pub proposal_count: i64,
}

#[derive(Debug, FromRow)]
struct BidSummaryRow {
    #[sqlx(flatten)]
    bid: BidRow,
    proposal_count: i64,
}

/// Result of a delete
#[derive(Debug, Serialize)]
pub struct DeletedBid {
    pub id: Uuid,
    pub proposals_removed: u64,
}

impl BidService {
    /// Create a new BidService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Post a requirement. Invalid input is rejected before anything is written.
    pub async fn create_bid(&self, user: &AuthUser, input: CreateBidInput) -> AppResult<Bid> {
        user.require_vendor()?;
        input.validate()?;
        validate_requirement(&input.item_name, input.quantity, input.target_price)
            .map_err(|(field, message)| AppError::validation(field, message))?;

        let bid = sqlx::query_as::<_, BidRow>(&format!(
            r#"
            INSERT INTO bids (vendor_id, item_name, description, quantity, unit, target_price, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            BID_COLUMNS
        ))
        .bind(user.user_id)
        .bind(input.item_name.trim())
        .bind(&input.description)
        .bind(input.quantity)
        .bind(input.unit.trim())
        .bind(input.target_price)
        .bind(BidStatus::Open.as_str())
        .fetch_one(&self.db)
        .await?
        .into_model()?;

        tracing::info!(bid_id = %bid.id, vendor_id = %bid.vendor_id, "requirement posted");
        Ok(bid)
    }

    /// List requirements, newest first
    pub async fn list_bids(
        &self,
        user: &AuthUser,
        query: BidListQuery,
    ) -> AppResult<PaginatedResponse<BidSummary>> {
        let pagination = query.pagination();
        let vendor_filter = query.mine.then_some(user.user_id);
        let status = query.status.map(|s| s.as_str());
        let search = query
            .q
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s));

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM bids
            WHERE ($1::uuid IS NULL OR vendor_id = $1)
              AND ($2::text IS NULL OR status = $2)
              AND ($3::text IS NULL OR item_name ILIKE $3)
            "#,
        )
        .bind(vendor_filter)
        .bind(status)
        .bind(&search)
        .fetch_one(&self.db)
        .await?;

        let rows = sqlx::query_as::<_, BidSummaryRow>(
            r#"
            SELECT b.id, b.vendor_id, b.item_name, b.description, b.quantity, b.unit,
                   b.target_price, b.status, b.accepted_proposal_id, b.created_at, b.updated_at,
                   (SELECT COUNT(*) FROM proposals p WHERE p.bid_id = b.id) AS proposal_count
            FROM bids b
            WHERE ($1::uuid IS NULL OR b.vendor_id = $1)
              AND ($2::text IS NULL OR b.status = $2)
              AND ($3::text IS NULL OR b.item_name ILIKE $3)
            ORDER BY b.created_at DESC
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(vendor_filter)
        .bind(status)
        .bind(&search)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        let data = rows
            .into_iter()
            .map(|row| {
                Ok(BidSummary {
                    bid: row.bid.into_model()?,
                    proposal_count: row.proposal_count,
                })
            })
            .collect::<AppResult<Vec<_>>>()?;

        Ok(PaginatedResponse::new(data, &pagination, total.max(0) as u64))
    }

    /// Get a single requirement
    pub async fn get_bid(&self, bid_id: Uuid) -> AppResult<Bid> {
        sqlx::query_as::<_, BidRow>(&format!("SELECT {} FROM bids WHERE id = $1", BID_COLUMNS))
            .bind(bid_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Requirement".to_string()))?
            .into_model()
    }

    /// Lock a requirement row for the rest of the transaction
    pub async fn lock_bid(tx: &mut Transaction<'_, Postgres>, bid_id: Uuid) -> AppResult<Bid> {
        sqlx::query_as::<_, BidRow>(&format!(
            "SELECT {} FROM bids WHERE id = $1 FOR UPDATE",
            BID_COLUMNS
        ))
        .bind(bid_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Requirement".to_string()))?
        .into_model()
    }

    /// Delete an open requirement together with all of its proposals
    pub async fn delete_bid(&self, user: &AuthUser, bid_id: Uuid) -> AppResult<DeletedBid> {
        let mut tx = self.db.begin().await?;

        let bid = Self::lock_bid(&mut tx, bid_id).await?;
        if !bid.is_owned_by(user.user_id) {
            return Err(AppError::Forbidden(
                "Only the vendor who posted this requirement can delete it".to_string(),
            ));
        }
        bid.ensure_deletable()?;

        let proposals = sqlx::query("DELETE FROM proposals WHERE bid_id = $1")
            .bind(bid_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM bids WHERE id = $1")
            .bind(bid_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(bid_id = %bid_id, proposals = proposals.rows_affected(), "requirement deleted");
        Ok(DeletedBid {
            id: bid_id,
            proposals_removed: proposals.rows_affected(),
        })
    }

    /// Close an open requirement without awarding it; live proposals are rejected
    pub async fn close_bid(&self, user: &AuthUser, bid_id: Uuid) -> AppResult<Bid> {
        let mut tx = self.db.begin().await?;

        let bid = Self::lock_bid(&mut tx, bid_id).await?;
        if !bid.is_owned_by(user.user_id) {
            return Err(AppError::Forbidden(
                "Only the vendor who posted this requirement can close it".to_string(),
            ));
        }
        let next = bid.status.transition_to(BidStatus::Closed)?;

        let closed = sqlx::query_as::<_, BidRow>(&format!(
            "UPDATE bids SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
            BID_COLUMNS
        ))
        .bind(bid_id)
        .bind(next.as_str())
        .fetch_one(&mut *tx)
        .await?
        .into_model()?;

        let rejected_suppliers = sqlx::query_scalar::<_, Uuid>(
            r#"
            UPDATE proposals SET status = 'rejected', updated_at = NOW()
            WHERE bid_id = $1 AND status IN ('pending', 'negotiating')
            RETURNING supplier_id
            "#,
        )
        .bind(bid_id)
        .fetch_all(&mut *tx)
        .await?;

        for supplier_id in &rejected_suppliers {
            AlertService::record(
                &mut *tx,
                *supplier_id,
                &EventAlert::ProposalRejected {
                    item_name: closed.item_name.clone(),
                },
            )
            .await?;
        }

        tx.commit().await?;

        tracing::info!(bid_id = %bid_id, rejected = rejected_suppliers.len(), "requirement closed");
        Ok(closed)
    }
}
