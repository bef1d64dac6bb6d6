//! Validation utilities for TradeFlow forms
//!
//! Each check runs both in the browser (through the wasm crate) and on the
//! server before anything is written.

use rust_decimal::Decimal;

use crate::models::{MAX_RATING, MIN_RATING};
use crate::types::GeoPoint;

pub const MAX_ITEM_NAME_LEN: usize = 200;
pub const MAX_MESSAGE_LEN: usize = 1000;
pub const MAX_COMMENT_LEN: usize = 2000;
pub const OTP_LENGTH: usize = 6;

/// Quantities are stored with three decimal places
pub const QUANTITY_SCALE: u32 = 3;
/// Prices are stored in cents
pub const PRICE_SCALE: u32 = 2;
/// Largest accepted quantity. Together with `MAX_PRICE` this keeps every
/// line total within the order columns.
pub const MAX_QUANTITY: Decimal = Decimal::from_parts(10_000_000, 0, 0, false, 0);
pub const MAX_PRICE: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 0);

/// Decimal places after dropping trailing zeros, so `1.50` counts as one
fn decimal_places(value: Decimal) -> u32 {
    value.normalize().scale()
}

// ============================================================================
// Marketplace Validations
// ============================================================================

pub fn validate_item_name(name: &str) -> Result<(), &'static str> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err("Item name is required");
    }
    if trimmed.chars().count() > MAX_ITEM_NAME_LEN {
        return Err("Item name must be at most 200 characters");
    }
    Ok(())
}

pub fn validate_quantity(quantity: Decimal) -> Result<(), &'static str> {
    if quantity <= Decimal::ZERO {
        return Err("Quantity must be greater than zero");
    }
    check_quantity_format(quantity)
}

fn check_quantity_format(quantity: Decimal) -> Result<(), &'static str> {
    if decimal_places(quantity) > QUANTITY_SCALE {
        return Err("Quantity may have at most 3 decimal places");
    }
    if quantity > MAX_QUANTITY {
        return Err("Quantity must be at most 10,000,000");
    }
    Ok(())
}

/// Prices, target prices and offer amounts
pub fn validate_price(price: Decimal) -> Result<(), &'static str> {
    if price <= Decimal::ZERO {
        return Err("Price must be greater than zero");
    }
    if decimal_places(price) > PRICE_SCALE {
        return Err("Price may have at most 2 decimal places");
    }
    if price > MAX_PRICE {
        return Err("Price must be at most 1,000,000");
    }
    Ok(())
}

/// Validate a requirement form, returning the offending field on failure
pub fn validate_requirement(
    item_name: &str,
    quantity: Decimal,
    target_price: Decimal,
) -> Result<(), (&'static str, &'static str)> {
    validate_item_name(item_name).map_err(|e| ("item_name", e))?;
    validate_quantity(quantity).map_err(|e| ("quantity", e))?;
    validate_price(target_price).map_err(|e| ("target_price", e))?;
    Ok(())
}

pub fn validate_message(message: &str) -> Result<(), &'static str> {
    if message.chars().count() > MAX_MESSAGE_LEN {
        return Err("Message must be at most 1000 characters");
    }
    Ok(())
}

pub fn validate_rating(rating: i16) -> Result<(), &'static str> {
    if !(MIN_RATING..=MAX_RATING).contains(&rating) {
        return Err("Rating must be between 1 and 5");
    }
    Ok(())
}

pub fn validate_comment(comment: &str) -> Result<(), &'static str> {
    if comment.chars().count() > MAX_COMMENT_LEN {
        return Err("Comment must be at most 2000 characters");
    }
    Ok(())
}

/// Image references must be absolute http(s) URLs
pub fn validate_image_url(url: &str) -> Result<(), &'static str> {
    let url = url.trim();
    if !(url.starts_with("https://") || url.starts_with("http://")) {
        return Err("Image URL must start with http:// or https://");
    }
    if url.len() > 2048 {
        return Err("Image URL is too long");
    }
    Ok(())
}

pub fn validate_location(location: &GeoPoint) -> Result<(), &'static str> {
    if !location.latitude.is_finite() || !location.longitude.is_finite() || !location.is_valid() {
        return Err("Latitude must be within ±90 and longitude within ±180");
    }
    Ok(())
}

pub fn validate_stock_quantity(quantity: Decimal) -> Result<(), &'static str> {
    if quantity < Decimal::ZERO {
        return Err("Stock quantity cannot be negative");
    }
    check_quantity_format(quantity)
}

// ============================================================================
// Account Validations
// ============================================================================

/// Validate email format (basic check)
pub fn validate_email(email: &str) -> Result<(), &'static str> {
    let Some((local, domain)) = email.split_once('@') else {
        return Err("Invalid email format");
    };
    if local.is_empty() || !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
        return Err("Invalid email format");
    }
    Ok(())
}

/// Validate password strength
pub fn validate_password(password: &str) -> Result<(), &'static str> {
    if password.len() < 8 {
        return Err("Password must be at least 8 characters");
    }
    Ok(())
}

/// Validate an international phone number: optional '+', 8-15 digits,
/// spaces and dashes allowed as separators
pub fn validate_phone(phone: &str) -> Result<(), &'static str> {
    let body = phone.trim().strip_prefix('+').unwrap_or(phone.trim());
    if !body.chars().all(|c| c.is_ascii_digit() || c == ' ' || c == '-') {
        return Err("Phone number may only contain digits, spaces and dashes");
    }
    let digits = body.chars().filter(|c| c.is_ascii_digit()).count();
    if !(8..=15).contains(&digits) {
        return Err("Phone number must have 8 to 15 digits");
    }
    Ok(())
}

/// Canonical form used as the lookup key: '+' followed by digits
pub fn normalize_phone(phone: &str) -> String {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
    format!("+{}", digits)
}

pub fn validate_otp_code(code: &str) -> Result<(), &'static str> {
    if code.len() != OTP_LENGTH || !code.chars().all(|c| c.is_ascii_digit()) {
        return Err("Verification code must be 6 digits");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn requirement_rejects_non_positive_numbers() {
        assert!(validate_requirement("Rice", dec("10"), dec("1.5")).is_ok());
        assert_eq!(
            validate_requirement("Rice", dec("0"), dec("1.5")),
            Err(("quantity", "Quantity must be greater than zero"))
        );
        assert_eq!(
            validate_requirement("Rice", dec("10"), dec("-1")).unwrap_err().0,
            "target_price"
        );
        assert_eq!(
            validate_requirement("   ", dec("10"), dec("1")).unwrap_err().0,
            "item_name"
        );
    }

    #[test]
    fn amounts_must_fit_stored_precision() {
        assert!(validate_price(dec("1.01")).is_ok());
        assert!(validate_price(dec("1.500")).is_ok());
        assert!(validate_price(dec("1000000")).is_ok());
        assert_eq!(
            validate_price(dec("0.001")),
            Err("Price may have at most 2 decimal places")
        );
        assert!(validate_price(dec("1.005")).is_err());
        assert_eq!(
            validate_price(dec("10000000000000")),
            Err("Price must be at most 1,000,000")
        );

        assert!(validate_quantity(dec("0.125")).is_ok());
        assert_eq!(
            validate_requirement("Rice", dec("0.0001"), dec("1")).unwrap_err().0,
            "quantity"
        );
        assert!(validate_quantity(dec("10000000.001")).is_err());
        assert!(validate_stock_quantity(dec("0")).is_ok());
        assert!(validate_stock_quantity(dec("2.0005")).is_err());
    }

    #[test]
    fn largest_line_total_fits_order_columns() {
        // order_items.line_total is NUMERIC(16, 2)
        let column_limit = dec("100000000000000");
        assert!(MAX_QUANTITY * MAX_PRICE < column_limit);
    }

    #[test]
    fn rating_bounds() {
        assert!(validate_rating(1).is_ok());
        assert!(validate_rating(5).is_ok());
        assert!(validate_rating(0).is_err());
        assert!(validate_rating(6).is_err());
    }

    #[test]
    fn emails() {
        assert!(validate_email("buyer@example.com").is_ok());
        assert!(validate_email("buyer@example").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("buyer.example.com").is_err());
    }

    #[test]
    fn phones() {
        assert!(validate_phone("+66 81 234 5678").is_ok());
        assert!(validate_phone("081-234-5678").is_ok());
        assert!(validate_phone("12345").is_err());
        assert!(validate_phone("+66 81 CALL ME").is_err());
        assert_eq!(normalize_phone("+66 81-234-5678"), "+66812345678");
    }

    #[test]
    fn otp_codes() {
        assert!(validate_otp_code("012345").is_ok());
        assert!(validate_otp_code("12345").is_err());
        assert!(validate_otp_code("12a456").is_err());
    }

    #[test]
    fn image_urls() {
        assert!(validate_image_url("https://cdn.example.com/a.jpg").is_ok());
        assert!(validate_image_url("ftp://example.com/a.jpg").is_err());
    }
}
