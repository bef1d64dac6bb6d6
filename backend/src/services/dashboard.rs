//! Dashboard service: per-user counters for the home screen

use rust_decimal::Decimal;
use serde::Serialize;
use shared::UserRole;
use sqlx::PgPool;

use crate::error::AppResult;
use crate::middleware::AuthUser;

/// Dashboard service
#[derive(Clone)]
pub struct DashboardService {
    db: PgPool,
}

/// Dashboard metrics
#[derive(Debug, Serialize)]
pub struct DashboardMetrics {
    pub role: UserRole,
    /// Vendors: their own open requirements. Sellers: open requirements they could bid on.
    pub open_bids: i64,
    /// Vendors: live proposals on their requirements. Sellers: their own live proposals.
    pub live_proposals: i64,
    /// Live proposals where the current offer is waiting on the caller
    pub awaiting_your_response: i64,
    pub active_orders: i64,
    pub completed_orders: i64,
    pub completed_order_value: Decimal,
    pub average_rating: Option<f64>,
    pub review_count: i64,
    pub reward_points: i32,
    pub unread_alerts: i64,
    pub low_stock_items: i64,
}

impl DashboardService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Get dashboard metrics
    pub async fn get_dashboard_metrics(&self, user: &AuthUser) -> AppResult<DashboardMetrics> {
        let user_id = user.user_id;
        let is_vendor = user.role.can_post_requirements();

        // Requirements
        let open_bids: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM bids
            WHERE status = 'open'
              AND (($2 AND vendor_id = $1) OR (NOT $2 AND vendor_id <> $1))
            "#,
        )
        .bind(user_id)
        .bind(is_vendor)
        .fetch_one(&self.db)
        .await?;

        // Negotiations; a proposal without a counter waits on the vendor
        let proposal_counts: (i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COUNT(*),
                COUNT(*) FILTER (WHERE
                    ($2 AND COALESCE(p.counter_side, 'supplier') = 'supplier')
                    OR (NOT $2 AND p.counter_side = 'vendor'))
            FROM proposals p
            JOIN bids b ON b.id = p.bid_id
            WHERE p.status IN ('pending', 'negotiating')
              AND (($2 AND b.vendor_id = $1) OR (NOT $2 AND p.supplier_id = $1))
            "#,
        )
        .bind(user_id)
        .bind(is_vendor)
        .fetch_one(&self.db)
        .await?;

        // Orders
        let order_counts: (i64, i64, Decimal) = sqlx::query_as(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE status <> 'received'),
                COUNT(*) FILTER (WHERE status = 'received'),
                COALESCE(SUM(total_amount) FILTER (WHERE status = 'received'), 0)
            FROM orders
            WHERE vendor_id = $1 OR supplier_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;

        // Reputation
        let (average_rating, review_count): (Option<f64>, i64) = sqlx::query_as(
            "SELECT AVG(rating)::float8, COUNT(*) FROM reviews WHERE subject_id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;

        let reward_points: i32 = sqlx::query_scalar("SELECT reward_points FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.db)
            .await?
            .unwrap_or(0);

        let unread_alerts: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM alerts WHERE user_id = $1 AND NOT is_read")
                .bind(user_id)
                .fetch_one(&self.db)
                .await?;

        let low_stock_items: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM stock_items
            WHERE owner_id = $1 AND low_stock_threshold IS NOT NULL AND quantity <= low_stock_threshold
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;

        Ok(DashboardMetrics {
            role: user.role,
            open_bids,
            live_proposals: proposal_counts.0,
            awaiting_your_response: proposal_counts.1,
            active_orders: order_counts.0,
            completed_orders: order_counts.1,
            completed_order_value: order_counts.2,
            average_rating: average_rating.map(|avg| (avg * 100.0).round() / 100.0),
            review_count,
            reward_points,
            unread_alerts,
            low_stock_items,
        })
    }
}
