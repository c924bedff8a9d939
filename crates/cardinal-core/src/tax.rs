//! # Tax Calculator
//!
//! Per-line tax breakdown: resolved unit price, percentage (ad-valorem)
//! tax, stacked flat taxes, and the frozen record of every rule that
//! contributed.
//!
//! ## Calculation Steps
//! ```text
//! 1. unit_price     = PriceResolver(customer, product, memory)
//! 2. line_base      = unit_price * quantity
//! 3. percentage_tax = round_half_up(line_base * rate)    <- round ONCE,
//!                                                           after the
//!                                                           full-line
//!                                                           multiply
//! 4. per rule:        rule_amount = tax_amount * quantity (exact cents)
//! 5. total_tax      = percentage_tax + sum(rule_amounts)
//! ```
//!
//! Deterministic given identical inputs; never returns a negative
//! amount. Missing/inactive rule references are skipped and flagged on
//! the result (`tax_config_warning`), not raised - checkout availability
//! beats perfect tax completeness, and staff see the warning in the
//! audit trail.

use chrono::{DateTime, Utc};

use crate::error::CoreResult;
use crate::price::resolve_unit_price;
use crate::tax_rules::TaxRuleRegistry;
use crate::types::{AppliedFlatTax, Customer, CustomerPriceMemory, LineTaxResult, Product};
use crate::validation::validate_quantity;

/// Computes the full tax breakdown for one order line.
///
/// `memory` is the newest price-memory row for (customer, product), or
/// `None`. `now` drives the memory-expiry check only.
///
/// ## Errors
/// Fatal [`ValidationError`](crate::error::ValidationError) on
/// non-positive quantity or an unpriceable product; both abort the whole
/// order run.
pub fn compute_line(
    customer: &Customer,
    product: &Product,
    quantity: i64,
    registry: &TaxRuleRegistry,
    memory: Option<&CustomerPriceMemory>,
    now: DateTime<Utc>,
) -> CoreResult<LineTaxResult> {
    validate_quantity(&product.id, quantity)?;

    // RESOLVE_PRICE
    let resolved = resolve_unit_price(customer, product, memory, now)?;
    let line_base = resolved.unit_price.multiply_quantity(quantity);

    // COMPUTE_PERCENT_TAX - rounded once over the whole line.
    let rate = registry.percentage_tax_rate(product, customer);
    let percentage_tax = line_base.percentage_tax(rate);

    // COMPUTE_FLAT_TAX - per-unit amounts are exact in integer cents.
    let selection = registry.applicable_flat_taxes(product, customer);
    let mut flat_tax_cents: i64 = 0;
    let mut applied_flat_taxes = Vec::with_capacity(selection.rules.len());
    for rule in &selection.rules {
        let amount = rule.tax_amount().multiply_quantity(quantity);
        flat_tax_cents += amount.cents();
        applied_flat_taxes.push(AppliedFlatTax {
            rule_id: rule.id.clone(),
            name: rule.name.clone(),
            amount_cents: amount.cents(),
        });
    }

    let tax_config_warning = !selection.warnings.is_empty();

    Ok(LineTaxResult {
        product_id: product.id.clone(),
        name_snapshot: product.name.clone(),
        quantity,
        unit_price_cents: resolved.unit_price.cents(),
        price_source: resolved.source,
        list_price_cents: resolved.list_price.cents(),
        line_base_cents: line_base.cents(),
        tax_rate_bps: rate.bps(),
        percentage_tax_cents: percentage_tax.cents(),
        flat_tax_cents,
        applied_flat_taxes,
        total_tax_cents: percentage_tax.cents() + flat_tax_cents,
        tax_config_warning,
        warnings: selection.warnings,
        is_tobacco_product: product.is_tobacco_product,
        tobacco_product_type: product.tobacco_product_type,
    })
}
