//! Order service: placement on award, status tracking, delivery images and export

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{
    validate_image_url, AwardPlan, EventAlert, Order, OrderLineItem, OrderStatus,
    OrderStatusChange, PaginatedResponse, Pagination, Party,
};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::services::alert::AlertService;

/// Order service
#[derive(Clone)]
pub struct OrderService {
    db: PgPool,
    points_per_completed_order: i32,
}

#[derive(Debug, FromRow)]
struct OrderRow {
    id: Uuid,
    bid_id: Uuid,
    proposal_id: Uuid,
    vendor_id: Uuid,
    supplier_id: Uuid,
    status: String,
    total_amount: Decimal,
    rating: Option<i16>,
    pre_delivery_image_url: Option<String>,
    post_delivery_image_url: Option<String>,
    shipped_at: Option<DateTime<Utc>>,
    received_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_model(self, line_items: Vec<OrderLineItem>) -> AppResult<Order> {
        Ok(Order {
            id: self.id,
            bid_id: self.bid_id,
            proposal_id: self.proposal_id,
            vendor_id: self.vendor_id,
            supplier_id: self.supplier_id,
            status: self.status.parse()?,
            line_items,
            total_amount: self.total_amount,
            rating: self.rating,
            pre_delivery_image_url: self.pre_delivery_image_url,
            post_delivery_image_url: self.post_delivery_image_url,
            shipped_at: self.shipped_at,
            received_at: self.received_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct LineItemRow {
    order_id: Uuid,
    item_name: String,
    quantity: Decimal,
    unit: String,
    unit_price: Decimal,
    line_total: Decimal,
}

impl From<LineItemRow> for OrderLineItem {
    fn from(row: LineItemRow) -> Self {
        OrderLineItem {
            item_name: row.item_name,
            quantity: row.quantity,
            unit: row.unit,
            unit_price: row.unit_price,
            line_total: row.line_total,
        }
    }
}

#[derive(Debug, FromRow)]
struct StatusChangeRow {
    from_status: Option<String>,
    to_status: String,
    changed_by: Uuid,
    changed_at: DateTime<Utc>,
}

impl StatusChangeRow {
    fn into_model(self) -> AppResult<OrderStatusChange> {
        Ok(OrderStatusChange {
            from_status: self.from_status.as_deref().map(str::parse).transpose()?,
            to_status: self.to_status.parse()?,
            changed_by: self.changed_by,
            changed_at: self.changed_at,
        })
    }
}

const ORDER_COLUMNS: &str = "id, bid_id, proposal_id, vendor_id, supplier_id, status, total_amount, \
     rating, pre_delivery_image_url, post_delivery_image_url, shipped_at, received_at, \
     created_at, updated_at";

/// Order listing filters
#[derive(Debug, Deserialize, Default)]
pub struct OrderListQuery {
    pub status: Option<OrderStatus>,
    /// Restrict to orders where the caller is on this side
    pub side: Option<Party>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// An order with its status history
#[derive(Debug, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub history: Vec<OrderStatusChange>,
}

/// Delivery photo links
#[derive(Debug, Deserialize)]
pub struct OrderImagesInput {
    pub pre_delivery_image_url: Option<String>,
    pub post_delivery_image_url: Option<String>,
}

/// One row of the order CSV export
#[derive(Debug, Serialize)]
pub struct OrderExportRecord {
    pub order_id: Uuid,
    pub placed_at: DateTime<Utc>,
    pub status: &'static str,
    pub side: &'static str,
    pub counterparty: String,
    pub item_name: String,
    pub quantity: Decimal,
    pub unit: String,
    pub unit_price: Decimal,
    pub line_total: Decimal,
    pub order_total: Decimal,
    pub rating: Option<i16>,
}

#[derive(Debug, FromRow)]
struct ExportRow {
    #[sqlx(flatten)]
    order: OrderRow,
    vendor_name: String,
    supplier_name: String,
}

impl OrderService {
    /// Create a new OrderService instance
    pub fn new(db: PgPool, points_per_completed_order: i32) -> Self {
        Self {
            db,
            points_per_completed_order,
        }
    }

    /// Write the order for an award. Runs inside the award transaction.
    pub async fn place_order(
        tx: &mut Transaction<'_, Postgres>,
        plan: &AwardPlan,
        placed_by: Uuid,
    ) -> AppResult<Order> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            r#"
            INSERT INTO orders (bid_id, proposal_id, vendor_id, supplier_id, status, total_amount)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            ORDER_COLUMNS
        ))
        .bind(plan.bid_id)
        .bind(plan.accepted_proposal_id)
        .bind(plan.vendor_id)
        .bind(plan.supplier_id)
        .bind(OrderStatus::OrderPlaced.as_str())
        .bind(plan.total_amount)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                AppError::Conflict("An order already exists for this proposal".to_string())
            }
            _ => AppError::DatabaseError(e),
        })?;

        for (position, item) in plan.line_items.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO order_items (order_id, position, item_name, quantity, unit, unit_price, line_total)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(row.id)
            .bind(position as i32)
            .bind(&item.item_name)
            .bind(item.quantity)
            .bind(&item.unit)
            .bind(item.unit_price)
            .bind(item.line_total)
            .execute(&mut **tx)
            .await?;
        }

        Self::record_status_change(tx, row.id, None, OrderStatus::OrderPlaced, placed_by).await?;

        row.into_model(plan.line_items.clone())
    }

    async fn record_status_change(
        tx: &mut Transaction<'_, Postgres>,
        order_id: Uuid,
        from: Option<OrderStatus>,
        to: OrderStatus,
        changed_by: Uuid,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO order_status_history (order_id, from_status, to_status, changed_by)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(order_id)
        .bind(from.map(|s| s.as_str()))
        .bind(to.as_str())
        .bind(changed_by)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    async fn load_line_items(
        &self,
        order_ids: &[Uuid],
    ) -> AppResult<HashMap<Uuid, Vec<OrderLineItem>>> {
        let rows = sqlx::query_as::<_, LineItemRow>(
            r#"
            SELECT order_id, item_name, quantity, unit, unit_price, line_total
            FROM order_items
            WHERE order_id = ANY($1)
            ORDER BY order_id, position
            "#,
        )
        .bind(order_ids)
        .fetch_all(&self.db)
        .await?;

        let mut items: HashMap<Uuid, Vec<OrderLineItem>> = HashMap::new();
        for row in rows {
            items.entry(row.order_id).or_default().push(row.into());
        }
        Ok(items)
    }

    /// Orders the caller is a party to, newest first
    pub async fn list_orders(
        &self,
        user: &AuthUser,
        query: OrderListQuery,
    ) -> AppResult<PaginatedResponse<Order>> {
        let pagination = Pagination::from_query(query.page, query.per_page);
        let status = query.status.map(|s| s.as_str());
        let side = query.side.map(|s| s.as_str());

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM orders
            WHERE (($3::text IS NULL OR $3 = 'vendor') AND vendor_id = $1
                OR ($3::text IS NULL OR $3 = 'supplier') AND supplier_id = $1)
              AND ($2::text IS NULL OR status = $2)
            "#,
        )
        .bind(user.user_id)
        .bind(status)
        .bind(side)
        .fetch_one(&self.db)
        .await?;

        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            r#"
            SELECT {} FROM orders
            WHERE (($3::text IS NULL OR $3 = 'vendor') AND vendor_id = $1
                OR ($3::text IS NULL OR $3 = 'supplier') AND supplier_id = $1)
              AND ($2::text IS NULL OR status = $2)
            ORDER BY created_at DESC
            LIMIT $4 OFFSET $5
            "#,
            ORDER_COLUMNS
        ))
        .bind(user.user_id)
        .bind(status)
        .bind(side)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let mut items = self.load_line_items(&ids).await?;

        let data = rows
            .into_iter()
            .map(|row| {
                let line_items = items.remove(&row.id).unwrap_or_default();
                row.into_model(line_items)
            })
            .collect::<AppResult<Vec<_>>>()?;

        Ok(PaginatedResponse::new(data, &pagination, total.max(0) as u64))
    }

    /// Get an order the caller is a party to, with its status history
    pub async fn get_order(&self, user: &AuthUser, order_id: Uuid) -> AppResult<OrderDetail> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {} FROM orders WHERE id = $1 AND (vendor_id = $2 OR supplier_id = $2)",
            ORDER_COLUMNS
        ))
        .bind(order_id)
        .bind(user.user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Order".to_string()))?;

        let line_items = self
            .load_line_items(&[order_id])
            .await?
            .remove(&order_id)
            .unwrap_or_default();

        let history = sqlx::query_as::<_, StatusChangeRow>(
            r#"
            SELECT from_status, to_status, changed_by, changed_at
            FROM order_status_history
            WHERE order_id = $1
            ORDER BY changed_at ASC
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.db)
        .await?
        .into_iter()
        .map(StatusChangeRow::into_model)
        .collect::<AppResult<Vec<_>>>()?;

        Ok(OrderDetail {
            order: row.into_model(line_items)?,
            history,
        })
    }

    async fn lock_order(
        tx: &mut Transaction<'_, Postgres>,
        user: &AuthUser,
        order_id: Uuid,
    ) -> AppResult<(OrderRow, Party)> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {} FROM orders WHERE id = $1 FOR UPDATE",
            ORDER_COLUMNS
        ))
        .bind(order_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Order".to_string()))?;

        let party = if row.vendor_id == user.user_id {
            Party::Vendor
        } else if row.supplier_id == user.user_id {
            Party::Supplier
        } else {
            return Err(AppError::NotFound("Order".to_string()));
        };
        Ok((row, party))
    }

    /// Supplier marks the order as shipped
    pub async fn ship_order(&self, user: &AuthUser, order_id: Uuid) -> AppResult<OrderDetail> {
        self.advance_order(user, order_id, OrderStatus::Shipped).await
    }

    /// Vendor confirms receipt. Both parties earn reward points.
    pub async fn receive_order(&self, user: &AuthUser, order_id: Uuid) -> AppResult<OrderDetail> {
        self.advance_order(user, order_id, OrderStatus::Received).await
    }

    async fn advance_order(
        &self,
        user: &AuthUser,
        order_id: Uuid,
        next: OrderStatus,
    ) -> AppResult<OrderDetail> {
        let mut tx = self.db.begin().await?;

        let (row, party) = Self::lock_order(&mut tx, user, order_id).await?;
        let current: OrderStatus = row.status.parse()?;
        let next = current.advance(next, party)?;

        let updated = sqlx::query(
            r#"
            UPDATE orders
            SET status = $2,
                shipped_at = CASE WHEN $2 = 'shipped' THEN NOW() ELSE shipped_at END,
                received_at = CASE WHEN $2 = 'received' THEN NOW() ELSE received_at END,
                updated_at = NOW()
            WHERE id = $1 AND status = $3
            "#,
        )
        .bind(order_id)
        .bind(next.as_str())
        .bind(current.as_str())
        .execute(&mut *tx)
        .await?;
        if updated.rows_affected() != 1 {
            return Err(AppError::Conflict("Order status changed concurrently".to_string()));
        }

        Self::record_status_change(&mut tx, order_id, Some(current), next, user.user_id).await?;

        let item_name: String = sqlx::query_scalar(
            "SELECT item_name FROM order_items WHERE order_id = $1 ORDER BY position LIMIT 1",
        )
        .bind(order_id)
        .fetch_optional(&mut *tx)
        .await?
        .unwrap_or_else(|| "your order".to_string());

        match next {
            OrderStatus::Shipped => {
                AlertService::record(&mut *tx, row.vendor_id, &EventAlert::OrderShipped { item_name })
                    .await?;
            }
            OrderStatus::Received => {
                let points = self.points_per_completed_order;
                sqlx::query(
                    "UPDATE users SET reward_points = reward_points + $2, updated_at = NOW() WHERE id = ANY($1)",
                )
                .bind(vec![row.vendor_id, row.supplier_id])
                .bind(points)
                .execute(&mut *tx)
                .await?;

                AlertService::record(
                    &mut *tx,
                    row.supplier_id,
                    &EventAlert::OrderReceived { item_name, points },
                )
                .await?;
            }
            OrderStatus::OrderPlaced => {}
        }

        tx.commit().await?;

        tracing::info!(order_id = %order_id, from = current.label(), to = next.label(), "order status advanced");
        self.get_order(user, order_id).await
    }

    /// Attach delivery photos. The supplier adds the pre-delivery image before
    /// shipping; the vendor adds the post-delivery image once received.
    pub async fn attach_images(
        &self,
        user: &AuthUser,
        order_id: Uuid,
        input: OrderImagesInput,
    ) -> AppResult<OrderDetail> {
        if input.pre_delivery_image_url.is_none() && input.post_delivery_image_url.is_none() {
            return Err(AppError::validation(
                "pre_delivery_image_url",
                "At least one image URL is required",
            ));
        }
        if let Some(url) = &input.pre_delivery_image_url {
            validate_image_url(url).map_err(|msg| AppError::validation("pre_delivery_image_url", msg))?;
        }
        if let Some(url) = &input.post_delivery_image_url {
            validate_image_url(url).map_err(|msg| AppError::validation("post_delivery_image_url", msg))?;
        }

        let mut tx = self.db.begin().await?;
        let (row, party) = Self::lock_order(&mut tx, user, order_id).await?;
        let status: OrderStatus = row.status.parse()?;

        if input.pre_delivery_image_url.is_some() {
            if party != Party::Supplier {
                return Err(AppError::Forbidden(
                    "Only the supplier can attach the pre-delivery image".to_string(),
                ));
            }
            if status != OrderStatus::OrderPlaced {
                return Err(AppError::InvalidStateTransition(
                    "Pre-delivery image must be attached before shipping".to_string(),
                ));
            }
        }
        if input.post_delivery_image_url.is_some() {
            if party != Party::Vendor {
                return Err(AppError::Forbidden(
                    "Only the vendor can attach the post-delivery image".to_string(),
                ));
            }
            if !status.is_completed() {
                return Err(AppError::InvalidStateTransition(
                    "Post-delivery image can only be attached after receipt".to_string(),
                ));
            }
        }

        sqlx::query(
            r#"
            UPDATE orders
            SET pre_delivery_image_url = COALESCE($2, pre_delivery_image_url),
                post_delivery_image_url = COALESCE($3, post_delivery_image_url),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(order_id)
        .bind(&input.pre_delivery_image_url)
        .bind(&input.post_delivery_image_url)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        self.get_order(user, order_id).await
    }

    /// Export the caller's order history as CSV, one row per line item
    pub async fn export_orders_csv(&self, user: &AuthUser) -> AppResult<String> {
        let rows = sqlx::query_as::<_, ExportRow>(
            r#"
            SELECT o.id, o.bid_id, o.proposal_id, o.vendor_id, o.supplier_id, o.status,
                   o.total_amount, o.rating, o.pre_delivery_image_url, o.post_delivery_image_url,
                   o.shipped_at, o.received_at, o.created_at, o.updated_at,
                   v.business_name AS vendor_name, s.business_name AS supplier_name
            FROM orders o
            JOIN users v ON v.id = o.vendor_id
            JOIN users s ON s.id = o.supplier_id
            WHERE o.vendor_id = $1 OR o.supplier_id = $1
            ORDER BY o.created_at DESC
            "#,
        )
        .bind(user.user_id)
        .fetch_all(&self.db)
        .await?;

        let ids: Vec<Uuid> = rows.iter().map(|r| r.order.id).collect();
        let mut items = self.load_line_items(&ids).await?;

        let mut records = Vec::new();
        for row in rows {
            let line_items = items.remove(&row.order.id).unwrap_or_default();
            let order = row.order.into_model(line_items)?;
            let (side, counterparty) = match order.party_of(user.user_id) {
                Some(Party::Vendor) => (Party::Vendor, row.supplier_name),
                _ => (Party::Supplier, row.vendor_name),
            };
            records.extend(export_records(&order, side, &counterparty));
        }

        export_to_csv(&records)
    }
}

/// Flatten an order into one export row per line item
pub fn export_records(order: &Order, side: Party, counterparty: &str) -> Vec<OrderExportRecord> {
    order
        .line_items
        .iter()
        .map(|item| OrderExportRecord {
            order_id: order.id,
            placed_at: order.created_at,
            status: order.status.label(),
            side: side.as_str(),
            counterparty: counterparty.to_string(),
            item_name: item.item_name.clone(),
            quantity: item.quantity,
            unit: item.unit.clone(),
            unit_price: item.unit_price,
            line_total: item.line_total,
            order_total: order.total_amount,
            rating: order.rating,
        })
        .collect()
}

/// Serialize records to CSV with a header row
pub fn export_to_csv<T: Serialize>(data: &[T]) -> AppResult<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    for record in data {
        wtr.serialize(record)
            .map_err(|e| AppError::Internal(format!("CSV serialization error: {}", e)))?;
    }
    let bytes = wtr
        .into_inner()
        .map_err(|e| AppError::Internal(format!("CSV writer error: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| AppError::Internal(format!("UTF-8 conversion error: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn order() -> Order {
        let now = Utc::now();
        let line_items = vec![OrderLineItem::new("Sorghum", dec("40"), "kg", dec("2.50")).unwrap()];
        Order {
            id: Uuid::new_v4(),
            bid_id: Uuid::new_v4(),
            proposal_id: Uuid::new_v4(),
            vendor_id: Uuid::new_v4(),
            supplier_id: Uuid::new_v4(),
            status: OrderStatus::Shipped,
            total_amount: shared::order_total(&line_items),
            line_items,
            rating: None,
            pre_delivery_image_url: None,
            post_delivery_image_url: None,
            shipped_at: Some(now),
            received_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn export_has_one_row_per_line_item() {
        let o = order();
        let records = export_records(&o, Party::Vendor, "Green Valley Farm");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].line_total, dec("100.00"));
        assert_eq!(records[0].status, "Shipped");
        assert_eq!(records[0].side, "vendor");
    }

    #[test]
    fn csv_has_header_and_rows() {
        let o = order();
        let csv = export_to_csv(&export_records(&o, Party::Supplier, "Corner Grocer")).unwrap();
        let mut lines = csv.lines();
        let header = lines.next().unwrap();
        assert!(header.starts_with("order_id,placed_at,status,side,counterparty,item_name"));
        let row = lines.next().unwrap();
        assert!(row.contains("Corner Grocer"));
        assert!(row.contains("Sorghum"));
        assert!(lines.next().is_none());
    }
}
