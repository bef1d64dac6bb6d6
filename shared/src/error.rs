//! Errors raised by the marketplace lifecycle rules

use thiserror::Error;
use uuid::Uuid;

use crate::models::Party;

/// A lifecycle rule was violated
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("unknown {kind} status: {value}")]
    UnknownStatus { kind: &'static str, value: String },

    #[error("cannot move {entity} from {from} to {to}")]
    InvalidTransition {
        entity: &'static str,
        from: String,
        to: String,
    },

    #[error("requirement is no longer open")]
    BidNotOpen,

    #[error("proposal {0} does not belong to this requirement")]
    ProposalMismatch(Uuid),

    #[error("proposal is already {0}")]
    ProposalClosed(String),

    #[error("waiting for the {awaiting} to respond to the current offer")]
    NotYourTurn { awaiting: Party },

    #[error("only the {0} can perform this step")]
    WrongParty(Party),

    #[error("a completed order with this user is required before reviewing")]
    ReviewNotAllowed,

    #[error("order amount is too large")]
    AmountOutOfRange,
}
