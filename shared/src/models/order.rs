//! Orders created when a proposal is accepted

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Party;
use crate::error::LifecycleError;

/// Linear order tracking: placed, shipped by the supplier, received by the vendor
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OrderStatus {
    #[serde(rename = "Order Placed")]
    OrderPlaced,
    #[serde(rename = "Shipped")]
    Shipped,
    #[serde(rename = "Received")]
    Received,
}

impl OrderStatus {
    /// Column value
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::OrderPlaced => "order_placed",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Received => "received",
        }
    }

    /// Human-facing label
    pub fn label(&self) -> &'static str {
        match self {
            OrderStatus::OrderPlaced => "Order Placed",
            OrderStatus::Shipped => "Shipped",
            OrderStatus::Received => "Received",
        }
    }

    pub fn next(&self) -> Option<OrderStatus> {
        match self {
            OrderStatus::OrderPlaced => Some(OrderStatus::Shipped),
            OrderStatus::Shipped => Some(OrderStatus::Received),
            OrderStatus::Received => None,
        }
    }

    /// Orders only move one step forward
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        self.next() == Some(next)
    }

    /// The party allowed to move an order into this status
    pub fn actor(&self) -> Option<Party> {
        match self {
            OrderStatus::OrderPlaced => None,
            OrderStatus::Shipped => Some(Party::Supplier),
            OrderStatus::Received => Some(Party::Vendor),
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, OrderStatus::Received)
    }

    /// Validate a transition requested by `actor`
    pub fn advance(&self, next: OrderStatus, actor: Party) -> Result<OrderStatus, LifecycleError> {
        if !self.can_transition_to(next) {
            return Err(LifecycleError::InvalidTransition {
                entity: "order",
                from: self.label().to_string(),
                to: next.label().to_string(),
            });
        }
        match next.actor() {
            Some(required) if required != actor => Err(LifecycleError::WrongParty(required)),
            _ => Ok(next),
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for OrderStatus {
    type Err = LifecycleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "order_placed" | "Order Placed" => Ok(OrderStatus::OrderPlaced),
            "shipped" | "Shipped" => Ok(OrderStatus::Shipped),
            "received" | "Received" => Ok(OrderStatus::Received),
            other => Err(LifecycleError::UnknownStatus {
                kind: "order",
                value: other.to_string(),
            }),
        }
    }
}

/// One priced line of an order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderLineItem {
    pub item_name: String,
    pub quantity: Decimal,
    pub unit: String,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

impl OrderLineItem {
    pub fn new(
        item_name: impl Into<String>,
        quantity: Decimal,
        unit: impl Into<String>,
        unit_price: Decimal,
    ) -> Result<Self, LifecycleError> {
        let total = line_total(quantity, unit_price).ok_or(LifecycleError::AmountOutOfRange)?;
        Ok(Self {
            item_name: item_name.into(),
            quantity,
            unit: unit.into(),
            unit_price,
            line_total: total,
        })
    }
}

/// Quantity times unit price, rounded half away from zero to cents.
/// `None` when the product overflows.
pub fn line_total(quantity: Decimal, unit_price: Decimal) -> Option<Decimal> {
    quantity
        .checked_mul(unit_price)
        .map(|total| total.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
}

/// Recorded status change
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderStatusChange {
    pub from_status: Option<OrderStatus>,
    pub to_status: OrderStatus,
    pub changed_by: Uuid,
    pub changed_at: DateTime<Utc>,
}

/// A purchase between a vendor and a supplier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub bid_id: Uuid,
    pub proposal_id: Uuid,
    pub vendor_id: Uuid,
    pub supplier_id: Uuid,
    pub status: OrderStatus,
    pub line_items: Vec<OrderLineItem>,
    pub total_amount: Decimal,
    /// The vendor's rating of the supplier, once reviewed
    pub rating: Option<i16>,
    pub pre_delivery_image_url: Option<String>,
    pub post_delivery_image_url: Option<String>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub received_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Which side `user_id` is on, if any
    pub fn party_of(&self, user_id: Uuid) -> Option<Party> {
        if user_id == self.vendor_id {
            Some(Party::Vendor)
        } else if user_id == self.supplier_id {
            Some(Party::Supplier)
        } else {
            None
        }
    }

    /// The other participant
    pub fn counterparty_of(&self, user_id: Uuid) -> Option<Uuid> {
        match self.party_of(user_id)? {
            Party::Vendor => Some(self.supplier_id),
            Party::Supplier => Some(self.vendor_id),
        }
    }
}

/// Sum of line totals
pub fn order_total(items: &[OrderLineItem]) -> Decimal {
    items.iter().map(|item| item.line_total).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_only_move_forward_one_step() {
        use OrderStatus::*;
        assert!(OrderPlaced.can_transition_to(Shipped));
        assert!(Shipped.can_transition_to(Received));
        assert!(!OrderPlaced.can_transition_to(Received));
        assert!(!Shipped.can_transition_to(OrderPlaced));
        assert!(!Received.can_transition_to(Shipped));
        assert_eq!(Received.next(), None);
    }

    #[test]
    fn only_the_right_party_advances() {
        use OrderStatus::*;
        assert_eq!(OrderPlaced.advance(Shipped, Party::Supplier), Ok(Shipped));
        assert_eq!(
            OrderPlaced.advance(Shipped, Party::Vendor),
            Err(LifecycleError::WrongParty(Party::Supplier))
        );
        assert_eq!(Shipped.advance(Received, Party::Vendor), Ok(Received));
        assert_eq!(
            Shipped.advance(Received, Party::Supplier),
            Err(LifecycleError::WrongParty(Party::Vendor))
        );
    }

    #[test]
    fn serializes_with_display_labels() {
        let json = serde_json::to_string(&OrderStatus::OrderPlaced).unwrap();
        assert_eq!(json, "\"Order Placed\"");
        assert_eq!("Order Placed".parse::<OrderStatus>().unwrap(), OrderStatus::OrderPlaced);
        assert_eq!("shipped".parse::<OrderStatus>().unwrap(), OrderStatus::Shipped);
    }

    #[test]
    fn line_totals_sum() {
        let items = vec![
            OrderLineItem::new("Rice", "100".parse().unwrap(), "kg", "1.25".parse().unwrap()).unwrap(),
            OrderLineItem::new("Beans", "10".parse().unwrap(), "kg", "3".parse().unwrap()).unwrap(),
        ];
        assert_eq!(order_total(&items), "155".parse::<Decimal>().unwrap());
    }

    #[test]
    fn line_total_rounds_to_cents_and_never_panics() {
        let dec = |s: &str| s.parse::<Decimal>().unwrap();
        assert_eq!(line_total(dec("0.333"), dec("1.01")), Some(dec("0.34")));
        assert_eq!(line_total(dec("2.5"), dec("0.01")), Some(dec("0.03")));
        assert_eq!(line_total(Decimal::MAX, dec("2")), None);
        assert_eq!(
            OrderLineItem::new("Rice", Decimal::MAX, "kg", dec("2")),
            Err(LifecycleError::AmountOutOfRange)
        );
    }
}
