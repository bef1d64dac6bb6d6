//! Owner-scoped inventory and notes

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A stock line kept by a supplier, farmer or vendor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockItem {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub category: Option<String>,
    pub quantity: Decimal,
    pub unit: String,
    pub unit_price: Option<Decimal>,
    pub low_stock_threshold: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StockItem {
    pub fn is_low_stock(&self) -> bool {
        self.low_stock_threshold
            .is_some_and(|threshold| self.quantity <= threshold)
    }

    pub fn value(&self) -> Option<Decimal> {
        self.unit_price.map(|price| price * self.quantity)
    }
}

/// A dated note in the owner's farm or business diary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiaryEntry {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub body: String,
    pub entry_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(quantity: &str, threshold: Option<&str>) -> StockItem {
        let now = Utc::now();
        StockItem {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            name: "Fertiliser".to_string(),
            category: None,
            quantity: quantity.parse().unwrap(),
            unit: "bag".to_string(),
            unit_price: Some("12.5".parse().unwrap()),
            low_stock_threshold: threshold.map(|t| t.parse().unwrap()),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn low_stock_at_or_below_threshold() {
        assert!(item("5", Some("5")).is_low_stock());
        assert!(!item("6", Some("5")).is_low_stock());
        assert!(!item("0", None).is_low_stock());
    }

    #[test]
    fn stock_value() {
        assert_eq!(item("4", None).value(), Some("50".parse().unwrap()));
    }
}
