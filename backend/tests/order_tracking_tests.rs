//! Tests for order status tracking and review gating

use rust_decimal::Decimal;
use shared::{
    ensure_can_review, order_total, summarize_ratings, LifecycleError, OrderLineItem,
    OrderParties, OrderStatus, Party,
};
use uuid::Uuid;

/// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

mod status_progression {
    use super::*;

    #[test]
    fn supplier_ships_then_vendor_receives() {
        let shipped = OrderStatus::OrderPlaced
            .advance(OrderStatus::Shipped, Party::Supplier)
            .unwrap();
        let received = shipped.advance(OrderStatus::Received, Party::Vendor).unwrap();
        assert!(received.is_completed());
        assert_eq!(received.next(), None);
    }

    #[test]
    fn wrong_party_is_refused() {
        assert_eq!(
            OrderStatus::OrderPlaced
                .advance(OrderStatus::Shipped, Party::Vendor)
                .unwrap_err(),
            LifecycleError::WrongParty(Party::Supplier)
        );
        assert_eq!(
            OrderStatus::Shipped
                .advance(OrderStatus::Received, Party::Supplier)
                .unwrap_err(),
            LifecycleError::WrongParty(Party::Vendor)
        );
    }

    #[test]
    fn no_skipping_or_going_back() {
        assert!(OrderStatus::OrderPlaced
            .advance(OrderStatus::Received, Party::Vendor)
            .is_err());
        assert!(OrderStatus::Received
            .advance(OrderStatus::Shipped, Party::Supplier)
            .is_err());
        assert!(OrderStatus::Shipped
            .advance(OrderStatus::Shipped, Party::Supplier)
            .is_err());
    }

    #[test]
    fn labels_parse_back() {
        for status in [OrderStatus::OrderPlaced, OrderStatus::Shipped, OrderStatus::Received] {
            assert_eq!(status.label().parse::<OrderStatus>().unwrap(), status);
        }
    }
}

mod totals {
    use super::*;

    #[test]
    fn total_sums_line_items() {
        let items = vec![
            OrderLineItem::new("Rice", dec("100"), "kg", dec("1.25")).unwrap(),
            OrderLineItem::new("Sugar", dec("20"), "kg", dec("0.80")).unwrap(),
        ];
        assert_eq!(items[0].line_total, dec("125.00"));
        assert_eq!(order_total(&items), dec("141.00"));
        assert_eq!(order_total(&[]), Decimal::ZERO);
    }
}

mod review_gating {
    use super::*;

    fn order(vendor_id: Uuid, supplier_id: Uuid, status: OrderStatus) -> OrderParties {
        OrderParties {
            vendor_id,
            supplier_id,
            status,
        }
    }

    #[test]
    fn either_side_may_review_after_receipt() {
        let (vendor, supplier) = (Uuid::new_v4(), Uuid::new_v4());
        let orders = [order(vendor, supplier, OrderStatus::Received)];
        assert!(ensure_can_review(vendor, supplier, &orders).is_ok());
        assert!(ensure_can_review(supplier, vendor, &orders).is_ok());
    }

    #[test]
    fn open_orders_do_not_unlock_reviews() {
        let (vendor, supplier) = (Uuid::new_v4(), Uuid::new_v4());
        let orders = [
            order(vendor, supplier, OrderStatus::OrderPlaced),
            order(vendor, supplier, OrderStatus::Shipped),
        ];
        assert_eq!(
            ensure_can_review(vendor, supplier, &orders).unwrap_err(),
            LifecycleError::ReviewNotAllowed
        );
    }

    #[test]
    fn strangers_and_self_reviews_are_refused() {
        let (vendor, supplier, stranger) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let orders = [order(vendor, supplier, OrderStatus::Received)];
        assert!(ensure_can_review(stranger, supplier, &orders).is_err());
        assert!(ensure_can_review(vendor, vendor, &orders).is_err());
    }

    #[test]
    fn ratings_summary_rounds_to_two_places() {
        let summary = summarize_ratings(&[5, 4, 4]);
        assert_eq!(summary.count, 3);
        assert_eq!(summary.average, Some(4.33));
        assert_eq!(summarize_ratings(&[]).average, None);
    }
}
