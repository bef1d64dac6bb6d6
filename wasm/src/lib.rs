//! WebAssembly module for the TradeFlow marketplace
//!
//! Provides client-side checks so forms can be validated before a request:
//! - Requirement and account form validation
//! - Negotiation turn and current-offer calculation
//! - Order status progression
//! - Distance and rating helpers

use rust_decimal::Decimal;
use serde::Serialize;
use wasm_bindgen::prelude::*;

// Re-export shared types for use in JavaScript
pub use shared::models::*;
pub use shared::types::*;
pub use shared::validation::*;

/// Outcome of a form check, serialized for the browser
#[derive(Debug, Serialize, PartialEq)]
struct FieldCheck {
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'static str>,
}

impl FieldCheck {
    fn ok() -> Self {
        Self {
            valid: true,
            field: None,
            message: None,
        }
    }

    fn failed(field: &'static str, message: &'static str) -> Self {
        Self {
            valid: false,
            field: Some(field),
            message: Some(message),
        }
    }

    fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{\"valid\":false}".to_string())
    }
}

fn parse_decimal(field: &'static str, value: &str) -> Result<Decimal, FieldCheck> {
    value
        .trim()
        .parse::<Decimal>()
        .map_err(|_| FieldCheck::failed(field, "Must be a number"))
}

fn check_requirement(item_name: &str, quantity: &str, target_price: &str) -> FieldCheck {
    let quantity = match parse_decimal("quantity", quantity) {
        Ok(q) => q,
        Err(check) => return check,
    };
    let target_price = match parse_decimal("target_price", target_price) {
        Ok(p) => p,
        Err(check) => return check,
    };
    match validate_requirement(item_name, quantity, target_price) {
        Ok(()) => FieldCheck::ok(),
        Err((field, message)) => FieldCheck::failed(field, message),
    }
}

/// Validate the post-requirement form. Returns `{"valid", "field"?, "message"?}` as JSON.
#[wasm_bindgen]
pub fn validate_requirement_form(item_name: &str, quantity: &str, target_price: &str) -> String {
    check_requirement(item_name, quantity, target_price).to_json()
}

fn check_offer(amount: &str, message: &str) -> FieldCheck {
    let amount = match parse_decimal("amount", amount) {
        Ok(a) => a,
        Err(check) => return check,
    };
    if let Err(msg) = validate_price(amount) {
        return FieldCheck::failed("amount", msg);
    }
    if let Err(msg) = validate_message(message) {
        return FieldCheck::failed("message", msg);
    }
    FieldCheck::ok()
}

/// Validate a proposal or counter-offer form
#[wasm_bindgen]
pub fn validate_offer_form(amount: &str, message: &str) -> String {
    check_offer(amount, message).to_json()
}

/// Validate the sign-up fields that can be checked offline
#[wasm_bindgen]
pub fn validate_signup_form(email: &str, password: &str, phone: &str) -> String {
    let check = if let Err(msg) = validate_email(email) {
        FieldCheck::failed("email", msg)
    } else if let Err(msg) = validate_password(password) {
        FieldCheck::failed("password", msg)
    } else if !phone.trim().is_empty() && validate_phone(phone).is_err() {
        FieldCheck::failed("phone", "Invalid phone number")
    } else {
        FieldCheck::ok()
    };
    check.to_json()
}

fn parse_proposal(proposal_json: &str) -> Result<Proposal, String> {
    serde_json::from_str(proposal_json).map_err(|e| format!("Invalid proposal JSON: {}", e))
}

/// Price currently on the table for a proposal
#[wasm_bindgen]
pub fn current_offer(proposal_json: &str) -> Result<String, JsValue> {
    let proposal = parse_proposal(proposal_json).map_err(|e| JsValue::from_str(&e))?;
    Ok(proposal.current_offer().to_string())
}

fn side_may_respond(proposal: &Proposal, side: &str) -> Result<bool, String> {
    let side = side.parse::<Party>().map_err(|e| e.to_string())?;
    Ok(!proposal.status.is_terminal() && proposal.awaiting() == side)
}

/// Whether `side` ("vendor" or "supplier") may accept or counter right now
#[wasm_bindgen]
pub fn can_respond(proposal_json: &str, side: &str) -> Result<bool, JsValue> {
    let proposal = parse_proposal(proposal_json).map_err(|e| JsValue::from_str(&e))?;
    side_may_respond(&proposal, side).map_err(|e| JsValue::from_str(&e))
}

/// Label of the status that follows `current`, if any
#[wasm_bindgen]
pub fn next_order_status(current: &str) -> Option<String> {
    current
        .parse::<OrderStatus>()
        .ok()
        .and_then(|status| status.next())
        .map(|next| next.label().to_string())
}

/// Which side moves an order into `status`
#[wasm_bindgen]
pub fn order_status_actor(status: &str) -> Option<String> {
    status
        .parse::<OrderStatus>()
        .ok()
        .and_then(|s| s.actor())
        .map(|party| party.as_str().to_string())
}

/// Line total for a quantity at a per-unit price, rounded to cents.
/// `None` when either input is not a number or the product overflows.
#[wasm_bindgen]
pub fn line_total(quantity: &str, unit_price: &str) -> Option<String> {
    let quantity = quantity.trim().parse::<Decimal>().ok()?;
    let unit_price = unit_price.trim().parse::<Decimal>().ok()?;
    shared::models::line_total(quantity, unit_price).map(|total| total.to_string())
}

/// Great-circle distance in kilometres
#[wasm_bindgen]
pub fn distance_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    GeoPoint::new(lat1, lon1).distance_km(&GeoPoint::new(lat2, lon2))
}

#[wasm_bindgen]
pub fn is_valid_rating(rating: i16) -> bool {
    validate_rating(rating).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn proposal_json(counter_side: Option<&str>) -> String {
        let now = Utc::now();
        let counter = counter_side.map(|side| {
            serde_json::json!({
                "amount": "9.50",
                "message": null,
                "side": side,
                "created_at": now,
            })
        });
        serde_json::json!({
            "id": Uuid::new_v4(),
            "bid_id": Uuid::new_v4(),
            "supplier_id": Uuid::new_v4(),
            "amount": "10.00",
            "message": null,
            "status": if counter.is_some() { "negotiating" } else { "pending" },
            "counter_offer": counter,
            "created_at": now,
            "updated_at": now,
        })
        .to_string()
    }

    #[test]
    fn test_requirement_form() {
        assert_eq!(check_requirement("Rice", "100", "1.25"), FieldCheck::ok());
        assert_eq!(
            check_requirement("Rice", "0", "1.25"),
            FieldCheck::failed("quantity", "Quantity must be greater than zero")
        );
        assert_eq!(check_requirement("Rice", "abc", "1").field, Some("quantity"));
        assert_eq!(check_requirement("Rice", "5", "-1").field, Some("target_price"));
        assert_eq!(check_requirement("  ", "5", "1").field, Some("item_name"));
        assert_eq!(check_requirement("Rice", "0.0001", "1").field, Some("quantity"));
        assert_eq!(
            validate_requirement_form("Rice", "100", "1.25"),
            "{\"valid\":true}"
        );
    }

    #[test]
    fn test_offer_form() {
        assert!(check_offer("2.5", "").valid);
        assert_eq!(check_offer("0", "").field, Some("amount"));
        assert_eq!(
            check_offer("0.001", ""),
            FieldCheck::failed("amount", "Price may have at most 2 decimal places")
        );
        assert_eq!(check_offer("10000000000000", "").field, Some("amount"));
        assert_eq!(check_offer("1", &"x".repeat(1001)).field, Some("message"));
    }

    #[test]
    fn test_negotiation_turns() {
        let fresh = parse_proposal(&proposal_json(None)).unwrap();
        assert_eq!(fresh.current_offer().to_string(), "10.00");
        assert!(side_may_respond(&fresh, "vendor").unwrap());
        assert!(!side_may_respond(&fresh, "supplier").unwrap());

        let countered = parse_proposal(&proposal_json(Some("vendor"))).unwrap();
        assert_eq!(current_offer(&proposal_json(Some("vendor"))).unwrap(), "9.50");
        assert!(side_may_respond(&countered, "supplier").unwrap());
        assert!(side_may_respond(&countered, "admin").is_err());
    }

    #[test]
    fn test_order_progression() {
        assert_eq!(next_order_status("Order Placed").as_deref(), Some("Shipped"));
        assert_eq!(next_order_status("shipped").as_deref(), Some("Received"));
        assert_eq!(next_order_status("Received"), None);
        assert_eq!(next_order_status("Lost"), None);
        assert_eq!(order_status_actor("Shipped").as_deref(), Some("supplier"));
        assert_eq!(order_status_actor("Received").as_deref(), Some("vendor"));
    }

    #[test]
    fn test_helpers() {
        assert_eq!(line_total("40", "2.50").as_deref(), Some("100.00"));
        assert_eq!(line_total("x", "2.50"), None);
        assert_eq!(line_total("79228162514264337593543950335", "2"), None);
        assert_eq!(line_total("0.333", "1.01").as_deref(), Some("0.34"));
        assert!(distance_km(10.0, 10.0, 10.0, 10.0).abs() < 1e-9);
        assert!(is_valid_rating(5));
        assert!(!is_valid_rating(0));
    }
}
