//! Tests for requirement awarding and counter-offer negotiation
//! Verifies that only the latest counter-offer prices the order and that
//! exactly one proposal can win a requirement

use chrono::{Duration, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::{plan_award, Bid, BidStatus, LifecycleError, Party, Proposal, ProposalStatus};
use uuid::Uuid;

/// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

fn open_bid(quantity: &str, target_price: &str) -> Bid {
    let now = Utc::now();
    Bid {
        id: Uuid::new_v4(),
        vendor_id: Uuid::new_v4(),
        item_name: "Jasmine rice".to_string(),
        description: None,
        quantity: dec(quantity),
        unit: "kg".to_string(),
        target_price: dec(target_price),
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

// =============================================================================
// Counter-offer turns
// =============================================================================

mod counter_offers {
    use super::*;

    #[test]
    fn vendor_answers_a_fresh_proposal() {
        let bid = open_bid("100", "2.00");
        let proposal = proposal_for(&bid, "2.10");
        assert_eq!(proposal.awaiting(), Party::Vendor);
        assert_eq!(proposal.current_offer(), dec("2.10"));
    }

    #[test]
    fn supplier_cannot_counter_own_offer() {
        let bid = open_bid("100", "2.00");
        let mut proposal = proposal_for(&bid, "2.10");
        let err = proposal
            .apply_counter(Party::Supplier, dec("2.05"), None, Utc::now())
            .unwrap_err();
        assert_eq!(err, LifecycleError::NotYourTurn { awaiting: Party::Vendor });
        assert!(proposal.counter_offer.is_none());
        assert_eq!(proposal.status, ProposalStatus::Pending);
    }

    #[test]
    fn turns_alternate_and_latest_counter_wins() {
        let bid = open_bid("100", "2.00");
        let mut proposal = proposal_for(&bid, "2.40");
        let t0 = Utc::now();

        proposal.apply_counter(Party::Vendor, dec("2.00"), Some("Too high".into()), t0).unwrap();
        assert_eq!(proposal.status, ProposalStatus::Negotiating);
        assert_eq!(proposal.awaiting(), Party::Supplier);

        proposal
            .apply_counter(Party::Supplier, dec("2.20"), None, t0 + Duration::minutes(5))
            .unwrap();
        proposal
            .apply_counter(Party::Vendor, dec("2.10"), None, t0 + Duration::minutes(9))
            .unwrap();

        let counter = proposal.counter_offer.as_ref().unwrap();
        assert_eq!(counter.amount, dec("2.10"));
        assert_eq!(counter.side, Party::Vendor);
        assert_eq!(counter.message, None);
        assert_eq!(proposal.current_offer(), dec("2.10"));
        // The original offer is kept for the record
        assert_eq!(proposal.amount, dec("2.40"));
    }

    #[test]
    fn closed_proposal_cannot_be_countered() {
        let bid = open_bid("10", "1");
        let mut proposal = proposal_for(&bid, "1");
        proposal.status = ProposalStatus::Rejected;
        assert!(matches!(
            proposal.apply_counter(Party::Vendor, dec("0.9"), None, Utc::now()),
            Err(LifecycleError::ProposalClosed(_))
        ));
        assert!(proposal.ensure_rejectable().is_err());
    }
}

// =============================================================================
// Awarding a requirement
// =============================================================================

mod awarding {
    use super::*;

    #[test]
    fn order_is_priced_at_latest_counter() {
        let bid = open_bid("500", "1.80");
        let mut winner = proposal_for(&bid, "2.00");
        winner.apply_counter(Party::Vendor, dec("1.85"), None, Utc::now()).unwrap();
        winner.apply_counter(Party::Supplier, dec("1.90"), None, Utc::now()).unwrap();

        let plan = plan_award(&bid, &winner, &[winner.clone()], Party::Vendor).unwrap();
        assert_eq!(plan.bid_status, BidStatus::Awarded);
        assert_eq!(plan.line_items.len(), 1);
        assert_eq!(plan.line_items[0].unit_price, dec("1.90"));
        assert_eq!(plan.total_amount, dec("950.00"));
        assert_eq!(plan.vendor_id, bid.vendor_id);
        assert_eq!(plan.supplier_id, winner.supplier_id);
    }

    #[test]
    fn supplier_accepts_vendor_counter() {
        let bid = open_bid("10", "3");
        let mut proposal = proposal_for(&bid, "3.50");
        proposal.apply_counter(Party::Vendor, dec("3.10"), None, Utc::now()).unwrap();

        assert!(plan_award(&bid, &proposal, &[], Party::Vendor).is_err());
        let plan = plan_award(&bid, &proposal, &[], Party::Supplier).unwrap();
        assert_eq!(plan.total_amount, dec("31.00"));
    }

    #[test]
    fn live_siblings_are_rejected() {
        let bid = open_bid("10", "3");
        let winner = proposal_for(&bid, "3");
        let live = proposal_for(&bid, "3.20");
        let mut already_rejected = proposal_for(&bid, "4");
        already_rejected.status = ProposalStatus::Rejected;

        let siblings = vec![winner.clone(), live.clone(), already_rejected];
        let plan = plan_award(&bid, &winner, &siblings, Party::Vendor).unwrap();
        assert_eq!(plan.rejected_proposal_ids, vec![live.id]);
    }

    #[test]
    fn awarded_requirement_cannot_be_awarded_again() {
        let mut bid = open_bid("10", "3");
        let proposal = proposal_for(&bid, "3");
        bid.status = BidStatus::Awarded;
        assert_eq!(
            plan_award(&bid, &proposal, &[], Party::Vendor).unwrap_err(),
            LifecycleError::BidNotOpen
        );
        assert!(bid.ensure_deletable().is_err());
    }

    #[test]
    fn proposal_from_another_requirement_is_refused() {
        let bid = open_bid("10", "3");
        let other = open_bid("10", "3");
        let stray = proposal_for(&other, "3");
        assert_eq!(
            plan_award(&bid, &stray, &[], Party::Vendor).unwrap_err(),
            LifecycleError::ProposalMismatch(stray.id)
        );
    }
}

// =============================================================================
// Property: the order always carries the current offer
// =============================================================================

fn cents_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000).prop_map(|c| Decimal::new(c, 2))
}

proptest! {
    #[test]
    fn award_total_is_quantity_times_current_offer(
        quantity in 1i64..10_000,
        original in cents_strategy(),
        counters in prop::collection::vec(cents_strategy(), 0..6),
    ) {
        let bid = open_bid(&quantity.to_string(), "1");
        let mut proposal = proposal_for(&bid, "1");
        proposal.amount = original;

        let mut side = Party::Vendor;
        for amount in &counters {
            proposal.apply_counter(side, *amount, None, Utc::now()).unwrap();
            side = side.other();
        }

        let expected = counters.last().copied().unwrap_or(original);
        let plan = plan_award(&bid, &proposal, &[], proposal.awaiting()).unwrap();
        prop_assert_eq!(plan.line_items[0].unit_price, expected);
        prop_assert_eq!(plan.total_amount, Decimal::from(quantity) * expected);
    }
}
