//! Proposal service: submission, counter-offers, acceptance and rejection

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{
    plan_award, validate_message, validate_price, Bid, CounterOffer, EventAlert, Order, Party,
    Proposal, ProposalStatus,
};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::{map_unique_violation, AppError, AppResult};
use crate::middleware::AuthUser;
use crate::services::alert::AlertService;
use crate::services::bid::BidService;
use crate::services::order::OrderService;

/// Proposal service
#[derive(Clone)]
pub struct ProposalService {
    db: PgPool,
}

#[derive(Debug, FromRow)]
struct ProposalRow {
    id: Uuid,
    bid_id: Uuid,
    supplier_id: Uuid,
    amount: Decimal,
    message: Option<String>,
    status: String,
    counter_amount: Option<Decimal>,
    counter_message: Option<String>,
    counter_side: Option<String>,
    countered_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ProposalRow {
    fn into_model(self) -> AppResult<Proposal> {
        let counter_offer = match (self.counter_amount, self.counter_side, self.countered_at) {
            (Some(amount), Some(side), Some(created_at)) => Some(CounterOffer {
                amount,
                message: self.counter_message,
                side: side.parse()?,
                created_at,
            }),
            _ => None,
        };

        Ok(Proposal {
            id: self.id,
            bid_id: self.bid_id,
            supplier_id: self.supplier_id,
            amount: self.amount,
            message: self.message,
            status: self.status.parse()?,
            counter_offer,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const PROPOSAL_COLUMNS: &str = "id, bid_id, supplier_id, amount, message, status, counter_amount, \
     counter_message, counter_side, countered_at, created_at, updated_at";

/// Input for submitting a proposal
#[derive(Debug, Deserialize)]
pub struct SubmitProposalInput {
    /// Per-unit price
    pub amount: Decimal,
    pub message: Option<String>,
}

/// Input for a counter-offer
#[derive(Debug, Deserialize)]
pub struct CounterOfferInput {
    pub amount: Decimal,
    pub message: Option<String>,
}

/// Proposal listing filters
#[derive(Debug, Deserialize, Default)]
pub struct ProposalListQuery {
    pub status: Option<ProposalStatus>,
}

/// A proposal as seen by one of its parties
#[derive(Debug, Serialize)]
pub struct ProposalView {
    #[serde(flatten)]
    pub proposal: Proposal,
    pub item_name: String,
    pub current_offer: Decimal,
    /// Side expected to answer next; absent once the proposal is settled
    pub awaiting: Option<Party>,
}

impl ProposalView {
    fn new(proposal: Proposal, item_name: String) -> Self {
        let awaiting = (!proposal.status.is_terminal()).then(|| proposal.awaiting());
        Self {
            current_offer: proposal.current_offer(),
            awaiting,
            item_name,
            proposal,
        }
    }
}

/// Outcome of an accepted proposal
#[derive(Debug, Serialize)]
pub struct AcceptedProposal {
    pub proposal: Proposal,
    pub order: Order,
}

#[derive(Debug, FromRow)]
struct ProposalWithItemRow {
    #[sqlx(flatten)]
    proposal: ProposalRow,
    item_name: String,
}

fn clean_message(message: Option<String>) -> AppResult<Option<String>> {
    let message = message.map(|m| m.trim().to_string()).filter(|m| !m.is_empty());
    if let Some(m) = &message {
        validate_message(m).map_err(|msg| AppError::validation("message", msg))?;
    }
    Ok(message)
}

/// Which side of the negotiation `user` is on
fn party_for(user: &AuthUser, bid: &Bid, proposal: &Proposal) -> AppResult<Party> {
    if bid.is_owned_by(user.user_id) {
        Ok(Party::Vendor)
    } else if proposal.supplier_id == user.user_id {
        Ok(Party::Supplier)
    } else {
        Err(AppError::Forbidden(
            "You are not a party to this proposal".to_string(),
        ))
    }
}

impl ProposalService {
    /// Create a new ProposalService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Submit a proposal against an open requirement
    pub async fn submit_proposal(
        &self,
        user: &AuthUser,
        bid_id: Uuid,
        input: SubmitProposalInput,
    ) -> AppResult<Proposal> {
        user.require_seller()?;
        validate_price(input.amount).map_err(|msg| AppError::validation("amount", msg))?;
        let message = clean_message(input.message)?;

        let mut tx = self.db.begin().await?;

        let bid = BidService::lock_bid(&mut tx, bid_id).await?;
        if bid.is_owned_by(user.user_id) {
            return Err(AppError::Forbidden(
                "You cannot submit a proposal to your own requirement".to_string(),
            ));
        }
        if !bid.is_open() {
            return Err(AppError::InvalidStateTransition(
                "Requirement is no longer open".to_string(),
            ));
        }

        let existing: Option<Uuid> = sqlx::query_scalar(
            "SELECT id FROM proposals WHERE bid_id = $1 AND supplier_id = $2 AND status <> 'rejected'",
        )
        .bind(bid_id)
        .bind(user.user_id)
        .fetch_optional(&mut *tx)
        .await?;
        if existing.is_some() {
            return Err(AppError::DuplicateEntry("proposal".to_string()));
        }

        let proposal = sqlx::query_as::<_, ProposalRow>(&format!(
            r#"
            INSERT INTO proposals (bid_id, supplier_id, amount, message, status)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            PROPOSAL_COLUMNS
        ))
        .bind(bid_id)
        .bind(user.user_id)
        .bind(input.amount)
        .bind(&message)
        .bind(ProposalStatus::Pending.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_unique_violation(e, "proposal"))?
        .into_model()?;

        AlertService::record(
            &mut *tx,
            bid.vendor_id,
            &EventAlert::ProposalReceived {
                item_name: bid.item_name.clone(),
                amount: proposal.amount,
            },
        )
        .await?;

        tx.commit().await?;

        tracing::info!(proposal_id = %proposal.id, bid_id = %bid_id, supplier_id = %user.user_id, "proposal submitted");
        Ok(proposal)
    }

    /// Proposals on a requirement. The owning vendor sees all of them,
    /// anyone else only their own.
    pub async fn list_for_bid(&self, user: &AuthUser, bid_id: Uuid) -> AppResult<Vec<ProposalView>> {
        let bid = BidService::new(self.db.clone()).get_bid(bid_id).await?;
        let supplier_filter = (!bid.is_owned_by(user.user_id)).then_some(user.user_id);

        let rows = sqlx::query_as::<_, ProposalRow>(&format!(
            r#"
            SELECT {} FROM proposals
            WHERE bid_id = $1 AND ($2::uuid IS NULL OR supplier_id = $2)
            ORDER BY created_at ASC
            "#,
            PROPOSAL_COLUMNS
        ))
        .bind(bid_id)
        .bind(supplier_filter)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter()
            .map(|row| Ok(ProposalView::new(row.into_model()?, bid.item_name.clone())))
            .collect()
    }

    /// Proposals submitted by the caller, newest first
    pub async fn list_mine(
        &self,
        user: &AuthUser,
        query: ProposalListQuery,
    ) -> AppResult<Vec<ProposalView>> {
        let rows = sqlx::query_as::<_, ProposalWithItemRow>(
            r#"
            SELECT p.id, p.bid_id, p.supplier_id, p.amount, p.message, p.status,
                   p.counter_amount, p.counter_message, p.counter_side, p.countered_at,
                   p.created_at, p.updated_at, b.item_name
            FROM proposals p
            JOIN bids b ON b.id = p.bid_id
            WHERE p.supplier_id = $1 AND ($2::text IS NULL OR p.status = $2)
            ORDER BY p.updated_at DESC
            "#,
        )
        .bind(user.user_id)
        .bind(query.status.map(|s| s.as_str()))
        .fetch_all(&self.db)
        .await?;

        rows.into_iter()
            .map(|row| Ok(ProposalView::new(row.proposal.into_model()?, row.item_name)))
            .collect()
    }

    /// Get a proposal visible to the caller
    pub async fn get_proposal(&self, user: &AuthUser, proposal_id: Uuid) -> AppResult<ProposalView> {
        let row = sqlx::query_as::<_, ProposalWithItemRow>(
            r#"
            SELECT p.id, p.bid_id, p.supplier_id, p.amount, p.message, p.status,
                   p.counter_amount, p.counter_message, p.counter_side, p.countered_at,
                   p.created_at, p.updated_at, b.item_name
            FROM proposals p
            JOIN bids b ON b.id = p.bid_id
            WHERE p.id = $1 AND (p.supplier_id = $2 OR b.vendor_id = $2)
            "#,
        )
        .bind(proposal_id)
        .bind(user.user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Proposal".to_string()))?;

        Ok(ProposalView::new(row.proposal.into_model()?, row.item_name))
    }

    /// Lock the requirement and then the proposal. The same order is used by
    /// every write path so concurrent negotiations cannot deadlock.
    async fn lock_negotiation(
        tx: &mut Transaction<'_, Postgres>,
        proposal_id: Uuid,
    ) -> AppResult<(Bid, Proposal)> {
        let bid_id: Uuid = sqlx::query_scalar("SELECT bid_id FROM proposals WHERE id = $1")
            .bind(proposal_id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or_else(|| AppError::NotFound("Proposal".to_string()))?;

        let bid = BidService::lock_bid(tx, bid_id).await?;

        let proposal = sqlx::query_as::<_, ProposalRow>(&format!(
            "SELECT {} FROM proposals WHERE id = $1 FOR UPDATE",
            PROPOSAL_COLUMNS
        ))
        .bind(proposal_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Proposal".to_string()))?
        .into_model()?;

        Ok((bid, proposal))
    }

    /// Put a counter-offer on the table, replacing any previous one
    pub async fn counter_offer(
        &self,
        user: &AuthUser,
        proposal_id: Uuid,
        input: CounterOfferInput,
    ) -> AppResult<Proposal> {
        validate_price(input.amount).map_err(|msg| AppError::validation("amount", msg))?;
        let message = clean_message(input.message)?;

        let mut tx = self.db.begin().await?;

        let (bid, mut proposal) = Self::lock_negotiation(&mut tx, proposal_id).await?;
        let actor = party_for(user, &bid, &proposal)?;
        if !bid.is_open() {
            return Err(shared::LifecycleError::BidNotOpen.into());
        }

        let previous_status = proposal.status;
        proposal.apply_counter(actor, input.amount, message, Utc::now())?;
        let counter = proposal
            .counter_offer
            .as_ref()
            .ok_or_else(|| AppError::Internal("Counter-offer was not recorded".to_string()))?;

        let updated = sqlx::query_as::<_, ProposalRow>(&format!(
            r#"
            UPDATE proposals
            SET counter_amount = $2, counter_message = $3, counter_side = $4,
                countered_at = $5, status = $6, updated_at = $5
            WHERE id = $1 AND status = $7
            RETURNING {}
            "#,
            PROPOSAL_COLUMNS
        ))
        .bind(proposal_id)
        .bind(counter.amount)
        .bind(&counter.message)
        .bind(counter.side.as_str())
        .bind(counter.created_at)
        .bind(proposal.status.as_str())
        .bind(previous_status.as_str())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::Conflict("Proposal changed while countering".to_string()))?
        .into_model()?;

        let recipient = match actor {
            Party::Vendor => updated.supplier_id,
            Party::Supplier => bid.vendor_id,
        };
        AlertService::record(
            &mut *tx,
            recipient,
            &EventAlert::CounterOfferReceived {
                item_name: bid.item_name.clone(),
                amount: updated.current_offer(),
            },
        )
        .await?;

        tx.commit().await?;

        tracing::info!(proposal_id = %proposal_id, side = %actor, amount = %updated.current_offer(), "counter-offer placed");
        Ok(updated)
    }

    /// Accept the current offer. Awards the requirement, rejects every other
    /// live proposal and places the order in one transaction.
    pub async fn accept_proposal(
        &self,
        user: &AuthUser,
        proposal_id: Uuid,
    ) -> AppResult<AcceptedProposal> {
        let mut tx = self.db.begin().await?;

        let (bid, _) = Self::lock_negotiation(&mut tx, proposal_id).await?;

        let proposals = sqlx::query_as::<_, ProposalRow>(&format!(
            "SELECT {} FROM proposals WHERE bid_id = $1 ORDER BY id FOR UPDATE",
            PROPOSAL_COLUMNS
        ))
        .bind(bid.id)
        .fetch_all(&mut *tx)
        .await?
        .into_iter()
        .map(ProposalRow::into_model)
        .collect::<AppResult<Vec<_>>>()?;

        let accepted = proposals
            .iter()
            .find(|p| p.id == proposal_id)
            .ok_or_else(|| AppError::NotFound("Proposal".to_string()))?;
        let actor = party_for(user, &bid, accepted)?;
        let plan = plan_award(&bid, accepted, &proposals, actor)?;

        // Compare-and-set on the requirement: a concurrent acceptance loses here
        let awarded = sqlx::query(
            r#"
            UPDATE bids SET status = $2, accepted_proposal_id = $3, updated_at = NOW()
            WHERE id = $1 AND status = 'open'
            "#,
        )
        .bind(plan.bid_id)
        .bind(plan.bid_status.as_str())
        .bind(plan.accepted_proposal_id)
        .execute(&mut *tx)
        .await?;
        if awarded.rows_affected() != 1 {
            return Err(AppError::Conflict(
                "Requirement was already awarded or closed".to_string(),
            ));
        }

        let accepted = sqlx::query_as::<_, ProposalRow>(&format!(
            "UPDATE proposals SET status = 'accepted', updated_at = NOW() WHERE id = $1 RETURNING {}",
            PROPOSAL_COLUMNS
        ))
        .bind(plan.accepted_proposal_id)
        .fetch_one(&mut *tx)
        .await?
        .into_model()?;

        let rejected_suppliers: Vec<Uuid> = sqlx::query_scalar(
            r#"
            UPDATE proposals SET status = 'rejected', updated_at = NOW()
            WHERE id = ANY($1)
            RETURNING supplier_id
            "#,
        )
        .bind(&plan.rejected_proposal_ids)
        .fetch_all(&mut *tx)
        .await?;

        let order = OrderService::place_order(&mut tx, &plan, user.user_id).await?;

        AlertService::record(
            &mut *tx,
            plan.supplier_id,
            &EventAlert::ProposalAccepted {
                item_name: bid.item_name.clone(),
                amount: accepted.current_offer(),
            },
        )
        .await?;
        for supplier_id in &rejected_suppliers {
            AlertService::record(
                &mut *tx,
                *supplier_id,
                &EventAlert::ProposalRejected {
                    item_name: bid.item_name.clone(),
                },
            )
            .await?;
        }

        tx.commit().await?;

        tracing::info!(
            bid_id = %plan.bid_id,
            proposal_id = %plan.accepted_proposal_id,
            order_id = %order.id,
            total = %order.total_amount,
            rejected = rejected_suppliers.len(),
            "requirement awarded"
        );

        Ok(AcceptedProposal {
            proposal: accepted,
            order,
        })
    }

    /// Reject a live proposal. Either side may do this; for the supplier it
    /// is a withdrawal.
    pub async fn reject_proposal(&self, user: &AuthUser, proposal_id: Uuid) -> AppResult<Proposal> {
        let mut tx = self.db.begin().await?;

        let (bid, proposal) = Self::lock_negotiation(&mut tx, proposal_id).await?;
        let actor = party_for(user, &bid, &proposal)?;
        proposal.ensure_rejectable()?;

        let rejected = sqlx::query_as::<_, ProposalRow>(&format!(
            r#"
            UPDATE proposals SET status = 'rejected', updated_at = NOW()
            WHERE id = $1 AND status = $2
            RETURNING {}
            "#,
            PROPOSAL_COLUMNS
        ))
        .bind(proposal_id)
        .bind(proposal.status.as_str())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::Conflict("Proposal changed while rejecting".to_string()))?
        .into_model()?;

        if actor == Party::Vendor {
            AlertService::record(
                &mut *tx,
                rejected.supplier_id,
                &EventAlert::ProposalRejected {
                    item_name: bid.item_name.clone(),
                },
            )
            .await?;
        }

        tx.commit().await?;

        tracing::info!(proposal_id = %proposal_id, side = %actor, "proposal rejected");
        Ok(rejected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{BidStatus, UserRole};

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn bid(vendor_id: Uuid) -> Bid {
        let now = Utc::now();
        Bid {
            id: Uuid::new_v4(),
            vendor_id,
            item_name: "Cassava".to_string(),
            description: None,
            quantity: dec("100"),
            unit: "kg".to_string(),
            target_price: dec("0.80"),
            status: BidStatus::Open,
            accepted_proposal_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn proposal(bid: &Bid, supplier_id: Uuid) -> Proposal {
        let now = Utc::now();
        Proposal {
            id: Uuid::new_v4(),
            bid_id: bid.id,
            supplier_id,
            amount: dec("0.85"),
            message: None,
            status: ProposalStatus::Pending,
            counter_offer: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn user(user_id: Uuid, role: UserRole) -> AuthUser {
        AuthUser { user_id, role }
    }

    #[test]
    fn parties_are_resolved_from_ownership() {
        let vendor = Uuid::new_v4();
        let supplier = Uuid::new_v4();
        let b = bid(vendor);
        let p = proposal(&b, supplier);

        assert_eq!(party_for(&user(vendor, UserRole::Vendor), &b, &p).unwrap(), Party::Vendor);
        assert_eq!(
            party_for(&user(supplier, UserRole::Farmer), &b, &p).unwrap(),
            Party::Supplier
        );
        assert!(matches!(
            party_for(&user(Uuid::new_v4(), UserRole::Supplier), &b, &p),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn view_reports_turn_until_settled() {
        let b = bid(Uuid::new_v4());
        let mut p = proposal(&b, Uuid::new_v4());
        let view = ProposalView::new(p.clone(), b.item_name.clone());
        assert_eq!(view.awaiting, Some(Party::Vendor));
        assert_eq!(view.current_offer, dec("0.85"));

        p.status = ProposalStatus::Accepted;
        let view = ProposalView::new(p, b.item_name.clone());
        assert_eq!(view.awaiting, None);
    }

    #[test]
    fn blank_messages_are_dropped() {
        assert_eq!(clean_message(Some("   ".to_string())).unwrap(), None);
        assert_eq!(
            clean_message(Some(" ok ".to_string())).unwrap(),
            Some("ok".to_string())
        );
        assert!(clean_message(Some("x".repeat(5000))).is_err());
    }
}
