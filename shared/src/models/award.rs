//! Awarding a requirement to one proposal

use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use super::{order_total, Bid, BidStatus, OrderLineItem, Party, Proposal};
use crate::error::LifecycleError;

/// Everything the award transaction writes
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AwardPlan {
    pub bid_id: Uuid,
    pub accepted_proposal_id: Uuid,
    pub vendor_id: Uuid,
    pub supplier_id: Uuid,
    pub bid_status: BidStatus,
    pub line_items: Vec<OrderLineItem>,
    pub total_amount: Decimal,
    /// Live sibling proposals that become `rejected`
    pub rejected_proposal_ids: Vec<Uuid>,
}

/// Plan the award of `bid` to `accepted`, requested by `actor`.
///
/// The order is priced at the accepted proposal's current offer: the latest
/// counter-offer when one exists, the original amount otherwise.
pub fn plan_award(
    bid: &Bid,
    accepted: &Proposal,
    siblings: &[Proposal],
    actor: Party,
) -> Result<AwardPlan, LifecycleError> {
    let bid_status = bid.status.transition_to(BidStatus::Awarded).map_err(|_| LifecycleError::BidNotOpen)?;

    if accepted.bid_id != bid.id {
        return Err(LifecycleError::ProposalMismatch(accepted.id));
    }
    accepted.ensure_acceptable_by(actor)?;

    let line_items = vec![OrderLineItem::new(
        bid.item_name.clone(),
        bid.quantity,
        bid.unit.clone(),
        accepted.current_offer(),
    )?];
    let total_amount = order_total(&line_items);

    let rejected_proposal_ids = siblings
        .iter()
        .filter(|p| p.bid_id == bid.id && p.id != accepted.id && !p.status.is_terminal())
        .map(|p| p.id)
        .collect();

    Ok(AwardPlan {
        bid_id: bid.id,
        accepted_proposal_id: accepted.id,
        vendor_id: bid.vendor_id,
        supplier_id: accepted.supplier_id,
        bid_status,
        line_items,
        total_amount,
        rejected_proposal_ids,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProposalStatus;
    use chrono::Utc;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn bid() -> Bid {
        let now = Utc::now();
        Bid {
            id: Uuid::new_v4(),
            vendor_id: Uuid::new_v4(),
            item_name: "Jasmine rice".to_string(),
            description: None,
            quantity: dec("500"),
            unit: "kg".to_string(),
            target_price: dec("1.10"),
            status: BidStatus::Open,
            accepted_proposal_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn proposal_for(bid: &Bid, amount: &str) -> Proposal {
        let now = Utc::now();
        Proposal {
            id: Uuid::new_v4(),
            bid_id: bid.id,
            supplier_id: Uuid::new_v4(),
            amount: dec(amount),
            message: None,
            status: ProposalStatus::Pending,
            counter_offer: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn award_prices_order_at_current_offer() {
        let bid = bid();
        let mut chosen = proposal_for(&bid, "1.20");
        chosen
            .apply_counter(Party::Vendor, dec("1.05"), None, Utc::now())
            .unwrap();
        chosen
            .apply_counter(Party::Supplier, dec("1.12"), None, Utc::now())
            .unwrap();
        let other = proposal_for(&bid, "1.30");
        let mut already_rejected = proposal_for(&bid, "1.50");
        already_rejected.status = ProposalStatus::Rejected;

        let siblings = vec![chosen.clone(), other.clone(), already_rejected];
        let plan = plan_award(&bid, &chosen, &siblings, Party::Vendor).unwrap();

        assert_eq!(plan.bid_status, BidStatus::Awarded);
        assert_eq!(plan.line_items.len(), 1);
        assert_eq!(plan.line_items[0].unit_price, dec("1.12"));
        assert_eq!(plan.total_amount, dec("560"));
        assert_eq!(plan.rejected_proposal_ids, vec![other.id]);
        assert_eq!(plan.supplier_id, chosen.supplier_id);
    }

    #[test]
    fn award_refuses_closed_bid_and_foreign_proposal() {
        let mut closed = bid();
        let p = proposal_for(&closed, "1.00");
        closed.status = BidStatus::Awarded;
        assert_eq!(
            plan_award(&closed, &p, &[], Party::Vendor),
            Err(LifecycleError::BidNotOpen)
        );

        let open = bid();
        assert_eq!(
            plan_award(&open, &p, &[], Party::Vendor),
            Err(LifecycleError::ProposalMismatch(p.id))
        );
    }

    #[test]
    fn supplier_accepts_vendor_counter() {
        let bid = bid();
        let mut p = proposal_for(&bid, "1.20");
        p.apply_counter(Party::Vendor, dec("1.00"), None, Utc::now())
            .unwrap();
        assert!(plan_award(&bid, &p, &[], Party::Vendor).is_err());
        let plan = plan_award(&bid, &p, &[], Party::Supplier).unwrap();
        assert_eq!(plan.line_items[0].unit_price, dec("1.00"));
    }
}
