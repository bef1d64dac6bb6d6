//! Post-order reviews

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::OrderStatus;
use crate::error::LifecycleError;

pub const MIN_RATING: i16 = 1;
pub const MAX_RATING: i16 = 5;

/// A rating left by one party of a completed order for the other
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub id: Uuid,
    pub author_id: Uuid,
    pub subject_id: Uuid,
    pub order_id: Uuid,
    pub rating: i16,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// The parts of an order that matter for review gating
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderParties {
    pub vendor_id: Uuid,
    pub supplier_id: Uuid,
    pub status: OrderStatus,
}

impl OrderParties {
    /// The order's own rating is the vendor's rating of the supplier. The
    /// supplier's review of the vendor lives only in `reviews`.
    pub fn rated_by(&self, author_id: Uuid) -> bool {
        self.vendor_id == author_id
    }

    fn involves(&self, a: Uuid, b: Uuid) -> bool {
        (self.vendor_id == a && self.supplier_id == b) || (self.vendor_id == b && self.supplier_id == a)
    }
}

/// A review needs a completed order with author and subject on opposite sides
pub fn ensure_can_review(
    author_id: Uuid,
    subject_id: Uuid,
    orders: &[OrderParties],
) -> Result<(), LifecycleError> {
    if author_id != subject_id
        && orders
            .iter()
            .any(|o| o.status.is_completed() && o.involves(author_id, subject_id))
    {
        Ok(())
    } else {
        Err(LifecycleError::ReviewNotAllowed)
    }
}

/// Summary of the ratings a user has received
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RatingSummary {
    pub average: Option<f64>,
    pub count: usize,
}

pub fn summarize_ratings(ratings: &[i16]) -> RatingSummary {
    if ratings.is_empty() {
        return RatingSummary {
            average: None,
            count: 0,
        };
    }
    let total: i64 = ratings.iter().map(|r| i64::from(*r)).sum();
    let average = total as f64 / ratings.len() as f64;
    RatingSummary {
        average: Some((average * 100.0).round() / 100.0),
        count: ratings.len(),
    }
}
