//! # Error Types
//!
//! Domain error types for cardinal-core.
//!
//! ## Error Taxonomy
//! - [`ValidationError`] - fatal. A product with no usable price or a
//!   non-positive quantity aborts the whole order-pricing run; no partial
//!   order is ever created.
//! - Configuration findings (missing/inactive referenced rule) are NOT
//!   errors here: the rule is skipped, the line is flagged, and the
//!   warning travels inside the result (`TaxRuleWarning`). Checkout
//!   availability wins over perfect tax completeness.
//! - Consistency (re-pricing an already-audited order) is absorbed by
//!   audit versioning in cardinal-db, never thrown.
//!
//! ## Design Principles
//! 1. `thiserror` derives, never manual Display impls
//! 2. Context in every message (product id, quantity, field)
//! 3. Errors are enum variants, never bare Strings

use thiserror::Error;

/// Fatal input validation failures. The only error class that stops
/// order creation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Product has no tiered price set AND no base price; nothing to
    /// charge means the order cannot be priced at all.
    #[error("product {product_id} has no usable price (no tier price, no base price)")]
    NoUsablePrice { product_id: String },

    /// Quantity must be a positive unit count.
    #[error("invalid quantity {quantity} for product {product_id}: must be positive")]
    InvalidQuantity { product_id: String, quantity: i64 },

    /// An order with no lines cannot be priced.
    #[error("order has no lines")]
    EmptyOrder,

    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },
}

/// Convenience alias for Results with ValidationError.
pub type CoreResult<T> = Result<T, ValidationError>;
