//! Stock service: owner-scoped inventory lines

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{validate_item_name, validate_price, validate_stock_quantity, StockItem};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};

/// Stock service
#[derive(Clone)]
pub struct StockService {
    db: PgPool,
}

#[derive(Debug, FromRow)]
struct StockRow {
    id: Uuid,
    owner_id: Uuid,
    name: String,
    category: Option<String>,
    quantity: Decimal,
    unit: String,
    unit_price: Option<Decimal>,
    low_stock_threshold: Option<Decimal>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<StockRow> for StockItem {
    fn from(row: StockRow) -> Self {
        StockItem {
            id: row.id,
            owner_id: row.owner_id,
            name: row.name,
            category: row.category,
            quantity: row.quantity,
            unit: row.unit,
            unit_price: row.unit_price,
            low_stock_threshold: row.low_stock_threshold,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const STOCK_COLUMNS: &str = "id, owner_id, name, category, quantity, unit, unit_price, \
     low_stock_threshold, created_at, updated_at";

/// Input for a new stock line
#[derive(Debug, Deserialize, Validate)]
pub struct CreateStockInput {
    pub name: String,
    #[validate(length(max = 100, message = "Category must be at most 100 characters"))]
    pub category: Option<String>,
    pub quantity: Decimal,
    #[validate(length(min = 1, max = 32, message = "Unit must be 1 to 32 characters"))]
    pub unit: String,
    pub unit_price: Option<Decimal>,
    pub low_stock_threshold: Option<Decimal>,
}

/// Partial update of a stock line
#[derive(Debug, Deserialize, Validate, Default)]
pub struct UpdateStockInput {
    pub name: Option<String>,
    #[validate(length(max = 100, message = "Category must be at most 100 characters"))]
    pub category: Option<String>,
    pub quantity: Option<Decimal>,
    #[validate(length(min = 1, max = 32, message = "Unit must be 1 to 32 characters"))]
    pub unit: Option<String>,
    pub unit_price: Option<Decimal>,
    pub low_stock_threshold: Option<Decimal>,
}

/// Stock listing filters
#[derive(Debug, Deserialize, Default)]
pub struct StockListQuery {
    pub category: Option<String>,
    #[serde(default)]
    pub low_stock_only: bool,
}

/// Stock lines with a low-stock count
#[derive(Debug, Serialize)]
pub struct StockList {
    pub items: Vec<StockItem>,
    pub low_stock_count: usize,
    pub total_value: Decimal,
}

fn check_amounts(
    quantity: Option<Decimal>,
    unit_price: Option<Decimal>,
    threshold: Option<Decimal>,
) -> AppResult<()> {
    if let Some(q) = quantity {
        validate_stock_quantity(q).map_err(|msg| AppError::validation("quantity", msg))?;
    }
    if let Some(p) = unit_price {
        validate_price(p).map_err(|msg| AppError::validation("unit_price", msg))?;
    }
    if let Some(t) = threshold {
        validate_stock_quantity(t).map_err(|msg| AppError::validation("low_stock_threshold", msg))?;
    }
    Ok(())
}

impl StockService {
    /// Create a new StockService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn create_item(&self, owner_id: Uuid, input: CreateStockInput) -> AppResult<StockItem> {
        input.validate()?;
        validate_item_name(&input.name).map_err(|msg| AppError::validation("name", msg))?;
        check_amounts(Some(input.quantity), input.unit_price, input.low_stock_threshold)?;

        let item: StockItem = sqlx::query_as::<_, StockRow>(&format!(
            r#"
            INSERT INTO stock_items (owner_id, name, category, quantity, unit, unit_price, low_stock_threshold)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            STOCK_COLUMNS
        ))
        .bind(owner_id)
        .bind(input.name.trim())
        .bind(&input.category)
        .bind(input.quantity)
        .bind(input.unit.trim())
        .bind(input.unit_price)
        .bind(input.low_stock_threshold)
        .fetch_one(&self.db)
        .await?
        .into();

        tracing::debug!(stock_id = %item.id, owner_id = %owner_id, "stock item created");
        Ok(item)
    }

    pub async fn list_items(&self, owner_id: Uuid, query: StockListQuery) -> AppResult<StockList> {
        let items: Vec<StockItem> = sqlx::query_as::<_, StockRow>(&format!(
            r#"
            SELECT {} FROM stock_items
            WHERE owner_id = $1 AND ($2::text IS NULL OR category = $2)
            ORDER BY name ASC
            "#,
            STOCK_COLUMNS
        ))
        .bind(owner_id)
        .bind(&query.category)
        .fetch_all(&self.db)
        .await?
        .into_iter()
        .map(StockItem::from)
        .filter(|item| !query.low_stock_only || item.is_low_stock())
        .collect();

        Ok(StockList {
            low_stock_count: items.iter().filter(|i| i.is_low_stock()).count(),
            total_value: items.iter().filter_map(StockItem::value).sum(),
            items,
        })
    }

    pub async fn get_item(&self, owner_id: Uuid, item_id: Uuid) -> AppResult<StockItem> {
        sqlx::query_as::<_, StockRow>(&format!(
            "SELECT {} FROM stock_items WHERE id = $1 AND owner_id = $2",
            STOCK_COLUMNS
        ))
        .bind(item_id)
        .bind(owner_id)
        .fetch_optional(&self.db)
        .await?
        .map(StockItem::from)
        .ok_or_else(|| AppError::NotFound("Stock item".to_string()))
    }

    pub async fn update_item(
        &self,
        owner_id: Uuid,
        item_id: Uuid,
        input: UpdateStockInput,
    ) -> AppResult<StockItem> {
        input.validate()?;
        if let Some(name) = &input.name {
            validate_item_name(name).map_err(|msg| AppError::validation("name", msg))?;
        }
        check_amounts(input.quantity, input.unit_price, input.low_stock_threshold)?;

        sqlx::query_as::<_, StockRow>(&format!(
            r#"
            UPDATE stock_items SET
                name = COALESCE($3, name),
                category = COALESCE($4, category),
                quantity = COALESCE($5, quantity),
                unit = COALESCE($6, unit),
                unit_price = COALESCE($7, unit_price),
                low_stock_threshold = COALESCE($8, low_stock_threshold),
                updated_at = NOW()
            WHERE id = $1 AND owner_id = $2
            RETURNING {}
            "#,
            STOCK_COLUMNS
        ))
        .bind(item_id)
        .bind(owner_id)
        .bind(input.name.as_deref().map(str::trim))
        .bind(&input.category)
        .bind(input.quantity)
        .bind(input.unit.as_deref().map(str::trim))
        .bind(input.unit_price)
        .bind(input.low_stock_threshold)
        .fetch_optional(&self.db)
        .await?
        .map(StockItem::from)
        .ok_or_else(|| AppError::NotFound("Stock item".to_string()))
    }

    pub async fn delete_item(&self, owner_id: Uuid, item_id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM stock_items WHERE id = $1 AND owner_id = $2")
            .bind(item_id)
            .bind(owner_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Stock item".to_string()));
        }
        Ok(())
    }
}
