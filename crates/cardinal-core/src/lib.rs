//! # cardinal-core: Pure Pricing & Tax Logic for Cardinal Wholesale
//!
//! The heart of the order pricing engine. Everything here is a pure
//! function over an immutable snapshot: the persistence layer
//! (cardinal-db) fetches customer, products, flat-tax rules and
//! price-memory rows up front, then this crate computes prices and taxes
//! with no I/O of any kind.
//!
//! ## Pipeline
//! ```text
//!  snapshot in                                                  result out
//!  ┌─────────┐                                                 ┌─────────┐
//!  │customer │    resolve     percentage    flat               │ lines + │
//!  │products │──► price   ──► tax       ──► tax  ──► aggregate │ totals  │
//!  │rules    │                                                 └─────────┘
//!  │memories │       (audit persistence happens in cardinal-db)
//!  └─────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Customer, FlatTaxRule, results)
//! - [`money`] - Integer-cent Money with half-up tax rounding
//! - [`price`] - PriceResolver: memory override -> tier -> base price
//! - [`tax_rules`] - TaxRuleRegistry: applicability filtering over a snapshot
//! - [`tax`] - TaxCalculator: per-line breakdown
//! - [`pipeline`] - Order-level aggregation and audit payload assembly
//! - [`error`] - Typed domain errors
//! - [`validation`] - Early input validation
//!
//! ## Design Principles
//!
//! 1. **Pure functions**: same input = same output, always
//! 2. **No I/O**: database, network, filesystem access is forbidden here
//! 3. **Integer money**: all amounts are cents (i64), no floats
//! 4. **Frozen results**: rule ids and amounts are copied into results so
//!    later configuration edits never change a priced order

pub mod error;
pub mod money;
pub mod pipeline;
pub mod price;
pub mod tax;
pub mod tax_rules;
pub mod types;
pub mod validation;

pub use error::{CoreResult, ValidationError};
pub use money::Money;
pub use pipeline::{build_calculation_input, build_calculation_result, price_order, OrderLineRequest};
pub use price::{resolve_unit_price, ResolvedPrice};
pub use tax::compute_line;
pub use tax_rules::{RuleSelection, TaxRuleRegistry};
pub use types::*;
