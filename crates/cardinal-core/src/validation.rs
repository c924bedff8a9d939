//! # Validation Module
//!
//! Early input validation, run before the engine touches a snapshot.
//!
//! Admin screens and the database (CHECK/NOT NULL constraints) validate
//! too; these functions are what the pricing service calls on its own
//! inputs before computing.

use crate::error::ValidationError;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Maximum quantity of a single line. Catches fat-fingered entry
/// (10000 instead of 100) before it reaches pricing.
pub const MAX_LINE_QUANTITY: i64 = 100_000;

/// Validates a line quantity.
///
/// ## Rules
/// - Must be positive (> 0); zero/negative aborts the order run
/// - Must not exceed [`MAX_LINE_QUANTITY`]
pub fn validate_quantity(product_id: &str, qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::InvalidQuantity {
            product_id: product_id.to_string(),
            quantity: qty,
        });
    }

    if qty > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a price in cents. Zero is allowed (promotional items).
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates a flat-tax amount in cents; negative amounts are never valid.
pub fn validate_flat_tax_amount(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: "tax_amount".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates an ad-valorem rate in basis points (0% to 100%).
pub fn validate_tax_rate_bps(bps: u32) -> ValidationResult<()> {
    if bps > 10_000 {
        return Err(ValidationError::OutOfRange {
            field: "tax_rate".to_string(),
            min: 0,
            max: 10_000,
        });
    }

    Ok(())
}

/// Validates an entity id is present (UUIDs everywhere, but emptiness is
/// the failure mode that actually happens).
pub fn validate_id(field: &str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity("p1", 1).is_ok());
        assert!(validate_quantity("p1", 100).is_ok());

        assert!(validate_quantity("p1", 0).is_err());
        assert!(validate_quantity("p1", -5).is_err());
        assert!(validate_quantity("p1", MAX_LINE_QUANTITY + 1).is_err());
    }

    #[test]
    fn test_validate_price_cents() {
        assert!(validate_price_cents(0).is_ok());
        assert!(validate_price_cents(1099).is_ok());
        assert!(validate_price_cents(-1).is_err());
    }

    #[test]
    fn test_validate_flat_tax_amount() {
        assert!(validate_flat_tax_amount(0).is_ok());
        assert!(validate_flat_tax_amount(60).is_ok());
        assert!(validate_flat_tax_amount(-60).is_err());
    }

    #[test]
    fn test_validate_tax_rate_bps() {
        assert!(validate_tax_rate_bps(0).is_ok());
        assert!(validate_tax_rate_bps(1000).is_ok());
        assert!(validate_tax_rate_bps(10_000).is_ok());
        assert!(validate_tax_rate_bps(10_001).is_err());
    }

    #[test]
    fn test_validate_id() {
        assert!(validate_id("customer_id", "c1").is_ok());
        assert!(validate_id("customer_id", "").is_err());
        assert!(validate_id("customer_id", "   ").is_err());
    }
}
