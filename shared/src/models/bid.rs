//! Sourcing requirements posted by vendors

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::LifecycleError;

/// Requirement lifecycle: `open` until awarded or closed by the vendor
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum BidStatus {
    Open,
    Awarded,
    Closed,
}

impl BidStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BidStatus::Open => "open",
            BidStatus::Awarded => "awarded",
            BidStatus::Closed => "closed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, BidStatus::Open)
    }

    /// Returns true if moving from self to `next` is allowed
    pub fn can_transition_to(&self, next: BidStatus) -> bool {
        matches!(
            (self, next),
            (BidStatus::Open, BidStatus::Awarded) | (BidStatus::Open, BidStatus::Closed)
        )
    }

    pub fn transition_to(&self, next: BidStatus) -> Result<BidStatus, LifecycleError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(LifecycleError::InvalidTransition {
                entity: "requirement",
                from: self.to_string(),
                to: next.to_string(),
            })
        }
    }
}

impl fmt::Display for BidStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BidStatus {
    type Err = LifecycleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            // "active" is accepted as a legacy alias of "open"
            "open" | "active" => Ok(BidStatus::Open),
            "awarded" => Ok(BidStatus::Awarded),
            "closed" => Ok(BidStatus::Closed),
            other => Err(LifecycleError::UnknownStatus {
                kind: "requirement",
                value: other.to_string(),
            }),
        }
    }
}

/// A vendor's posted sourcing need
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bid {
    pub id: Uuid,
    pub vendor_id: Uuid,
    pub item_name: String,
    pub description: Option<String>,
    pub quantity: Decimal,
    pub unit: String,
    /// Target price per unit
    pub target_price: Decimal,
    pub status: BidStatus,
    pub accepted_proposal_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Bid {
    pub fn is_open(&self) -> bool {
        self.status == BidStatus::Open
    }

    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.vendor_id == user_id
    }

    /// Budget implied by the target price
    pub fn target_total(&self) -> Decimal {
        self.quantity * self.target_price
    }

    /// Only an open requirement may be deleted; its proposals go with it
    pub fn ensure_deletable(&self) -> Result<(), LifecycleError> {
        if self.is_open() {
            Ok(())
        } else {
            Err(LifecycleError::BidNotOpen)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_is_the_only_non_terminal_state() {
        assert!(!BidStatus::Open.is_terminal());
        assert!(BidStatus::Awarded.is_terminal());
        assert!(BidStatus::Closed.is_terminal());
    }

    #[test]
    fn transitions_leave_open_only() {
        assert!(BidStatus::Open.can_transition_to(BidStatus::Awarded));
        assert!(BidStatus::Open.can_transition_to(BidStatus::Closed));
        assert!(!BidStatus::Awarded.can_transition_to(BidStatus::Open));
        assert!(!BidStatus::Closed.can_transition_to(BidStatus::Awarded));
        assert!(BidStatus::Awarded.transition_to(BidStatus::Closed).is_err());
    }

    #[test]
    fn legacy_active_alias_parses_as_open() {
        assert_eq!("active".parse::<BidStatus>().unwrap(), BidStatus::Open);
        assert!("expired".parse::<BidStatus>().is_err());
    }
}
