//! Supplier proposals and the counter-offer negotiation

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::LifecycleError;

/// The two sides of a deal
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Party {
    Vendor,
    Supplier,
}

impl Party {
    pub fn as_str(&self) -> &'static str {
        match self {
            Party::Vendor => "vendor",
            Party::Supplier => "supplier",
        }
    }

    pub fn other(&self) -> Party {
        match self {
            Party::Vendor => Party::Supplier,
            Party::Supplier => Party::Vendor,
        }
    }
}

impl fmt::Display for Party {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Party {
    type Err = LifecycleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "vendor" => Ok(Party::Vendor),
            "supplier" => Ok(Party::Supplier),
            other => Err(LifecycleError::UnknownStatus {
                kind: "party",
                value: other.to_string(),
            }),
        }
    }
}

/// Proposal lifecycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ProposalStatus {
    Pending,
    Negotiating,
    Accepted,
    Rejected,
}

impl ProposalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProposalStatus::Pending => "pending",
            ProposalStatus::Negotiating => "negotiating",
            ProposalStatus::Accepted => "accepted",
            ProposalStatus::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ProposalStatus::Accepted | ProposalStatus::Rejected)
    }

    pub fn can_transition_to(&self, next: ProposalStatus) -> bool {
        use ProposalStatus::*;
        matches!(
            (self, next),
            (Pending, Negotiating)
                | (Negotiating, Negotiating)
                | (Pending, Accepted)
                | (Negotiating, Accepted)
                | (Pending, Rejected)
                | (Negotiating, Rejected)
        )
    }
}

impl fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProposalStatus {
    type Err = LifecycleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ProposalStatus::Pending),
            "negotiating" => Ok(ProposalStatus::Negotiating),
            "accepted" => Ok(ProposalStatus::Accepted),
            "rejected" => Ok(ProposalStatus::Rejected),
            other => Err(LifecycleError::UnknownStatus {
                kind: "proposal",
                value: other.to_string(),
            }),
        }
    }
}

/// The single live amendment to a proposal. A new counter replaces the old one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CounterOffer {
    /// Per-unit price
    pub amount: Decimal,
    pub message: Option<String>,
    pub side: Party,
    pub created_at: DateTime<Utc>,
}

/// A supplier's offer against a requirement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Proposal {
    pub id: Uuid,
    pub bid_id: Uuid,
    pub supplier_id: Uuid,
    /// Per-unit price originally offered by the supplier
    pub amount: Decimal,
    pub message: Option<String>,
    pub status: ProposalStatus,
    pub counter_offer: Option<CounterOffer>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Proposal {
    /// Price currently on the table
    pub fn current_offer(&self) -> Decimal {
        self.counter_offer
            .as_ref()
            .map_or(self.amount, |counter| counter.amount)
    }

    /// Who put the current offer on the table
    pub fn offered_by(&self) -> Party {
        self.counter_offer
            .as_ref()
            .map_or(Party::Supplier, |counter| counter.side)
    }

    /// Who is expected to answer the current offer
    pub fn awaiting(&self) -> Party {
        self.offered_by().other()
    }

    fn ensure_open(&self) -> Result<(), LifecycleError> {
        if self.status.is_terminal() {
            Err(LifecycleError::ProposalClosed(self.status.to_string()))
        } else {
            Ok(())
        }
    }

    fn ensure_turn(&self, actor: Party) -> Result<(), LifecycleError> {
        let awaiting = self.awaiting();
        if actor == awaiting {
            Ok(())
        } else {
            Err(LifecycleError::NotYourTurn { awaiting })
        }
    }

    /// Replace the live counter-offer. Previous counters are discarded.
    pub fn apply_counter(
        &mut self,
        actor: Party,
        amount: Decimal,
        message: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<(), LifecycleError> {
        self.ensure_open()?;
        self.ensure_turn(actor)?;

        self.counter_offer = Some(CounterOffer {
            amount,
            message,
            side: actor,
            created_at: at,
        });
        self.status = ProposalStatus::Negotiating;
        self.updated_at = at;
        Ok(())
    }

    /// Check that `actor` may accept the current offer
    pub fn ensure_acceptable_by(&self, actor: Party) -> Result<(), LifecycleError> {
        self.ensure_open()?;
        self.ensure_turn(actor)
    }

    /// Either side may walk away from a live proposal
    pub fn ensure_rejectable(&self) -> Result<(), LifecycleError> {
        self.ensure_open()
    }
}
