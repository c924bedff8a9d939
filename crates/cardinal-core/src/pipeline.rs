//! # Order Pricing Pipeline
//!
//! Prices every line of an order and aggregates totals. A strictly
//! linear pipeline - no branching state machine, nothing reactive:
//!
//! ```text
//! RESOLVE_PRICE -> COMPUTE_PERCENT_TAX -> COMPUTE_FLAT_TAX -> AGGREGATE
//! ```
//!
//! (The AUDIT stage is persistence and lives in cardinal-db; this module
//! builds the typed audit payloads it records.)
//!
//! Lines are priced in caller-supplied order so displayed line order
//! matches aggregation order. The order totals are the exact sums of the
//! per-line values - there is no independent recomputation at order
//! level, which is what keeps line display and totals from ever
//! drifting apart.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::error::{CoreResult, ValidationError};
use crate::tax::compute_line;
use crate::tax_rules::TaxRuleRegistry;
use crate::types::{
    AuditedRule, CalculationInput, CalculationResult, Customer, CustomerPriceMemory,
    OrderPricingResult, Product,
};

/// One requested order line: a product from the snapshot plus quantity.
#[derive(Debug, Clone)]
pub struct OrderLineRequest<'a> {
    pub product: &'a Product,
    pub quantity: i64,
}

/// Prices a whole order over an immutable snapshot.
///
/// `memories` maps product id -> the newest price-memory row for this
/// customer. All data is supplied up front (read-then-compute, never
/// read-while-computing), so the function is pure and safe against
/// tax-rule edits happening concurrently.
///
/// ## Errors
/// Any line's fatal [`ValidationError`] aborts the whole order;
/// configuration findings do not (they flag lines instead).
pub fn price_order(
    customer: &Customer,
    lines: &[OrderLineRequest<'_>],
    registry: &TaxRuleRegistry,
    memories: &HashMap<String, CustomerPriceMemory>,
    now: DateTime<Utc>,
) -> CoreResult<OrderPricingResult> {
    if lines.is_empty() {
        return Err(ValidationError::EmptyOrder);
    }

    let mut priced = Vec::with_capacity(lines.len());
    let mut subtotal_cents: i64 = 0;
    let mut total_tax_cents: i64 = 0;
    let mut tax_config_warning = false;

    for request in lines {
        let memory = memories.get(&request.product.id);
        let line = compute_line(
            customer,
            request.product,
            request.quantity,
            registry,
            memory,
            now,
        )?;

        // AGGREGATE: exact sums of the per-line values.
        subtotal_cents += line.line_base_cents;
        total_tax_cents += line.total_tax_cents;
        tax_config_warning |= line.tax_config_warning;
        priced.push(line);
    }

    Ok(OrderPricingResult {
        lines: priced,
        subtotal_cents,
        total_tax_cents,
        total_cents: subtotal_cents + total_tax_cents,
        tax_config_warning,
    })
}

/// Captures the calculation's input side for the audit record: the
/// customer state and every rule the snapshot contained, amounts frozen.
pub fn build_calculation_input(
    customer: &Customer,
    registry: &TaxRuleRegistry,
) -> CalculationInput {
    let mut rules_seen: Vec<AuditedRule> =
        registry.all_rules().map(AuditedRule::from_rule).collect();
    // HashMap iteration order is arbitrary; sort for a stable audit body.
    rules_seen.sort_by(|a, b| a.rule_id.cmp(&b.rule_id));

    CalculationInput {
        customer_id: customer.id.clone(),
        customer_level: customer.customer_level,
        apply_flat_tax: customer.apply_flat_tax,
        tax_exempt: customer.tax_exempt,
        county: customer.county.clone(),
        postal_code: customer.postal_code.clone(),
        rules_seen,
    }
}

/// Wraps a pricing result as the audit record's output side.
pub fn build_calculation_result(pricing: OrderPricingResult) -> CalculationResult {
    CalculationResult { pricing }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FlatTaxRule;

    fn product(id: &str, base: i64, rate_bps: u32, flat_tax_ids: &[&str]) -> Product {
        let now = Utc::now();
        Product {
            id: id.to_string(),
            sku: format!("SKU-{id}"),
            name: format!("Product {id}"),
            base_price_cents: base,
            cost_cents: None,
            tier_prices: [None; 5],
            tax_rate_bps: rate_bps,
            flat_tax_ids: flat_tax_ids.iter().map(|s| s.to_string()).collect(),
            is_tobacco_product: false,
            tobacco_product_type: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn customer() -> Customer {
        let now = Utc::now();
        Customer {
            id: "cust-1".to_string(),
            name: "Test Account".to_string(),
            customer_level: 3,
            apply_flat_tax: true,
            tax_exempt: false,
            county: None,
            postal_code: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn rule(id: &str, amount: i64) -> FlatTaxRule {
        let now = Utc::now();
        FlatTaxRule {
            id: id.to_string(),
            name: format!("Rule {id}"),
            tax_amount_cents: amount,
            customer_tiers: vec![1, 2, 3, 4, 5],
            county_restriction: None,
            zip_code_restriction: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn totals_are_exact_sums_of_lines() {
        let registry = TaxRuleRegistry::new(vec![rule("r1", 60)]);
        let p1 = product("p1", 1037, 825, &["r1"]);
        let p2 = product("p2", 499, 1000, &[]);
        let p3 = product("p3", 12_345, 0, &["r1"]);
        let lines = vec![
            OrderLineRequest { product: &p1, quantity: 7 },
            OrderLineRequest { product: &p2, quantity: 13 },
            OrderLineRequest { product: &p3, quantity: 1 },
        ];

        let result =
            price_order(&customer(), &lines, &registry, &HashMap::new(), Utc::now()).unwrap();

        let line_base_sum: i64 = result.lines.iter().map(|l| l.line_base_cents).sum();
        let line_tax_sum: i64 = result.lines.iter().map(|l| l.total_tax_cents).sum();
        assert_eq!(result.subtotal_cents, line_base_sum);
        assert_eq!(result.total_tax_cents, line_tax_sum);
        assert_eq!(result.total_cents, line_base_sum + line_tax_sum);
    }

    #[test]
    fn end_to_end_order_example() {
        // $10 base, 10%, $0.60 flat rule, qty 5 ->
        // $50.00 base / $5.00 percent / $3.00 flat / $58.00 total.
        let registry = TaxRuleRegistry::new(vec![rule("r1", 60)]);
        let p = product("p1", 1000, 1000, &["r1"]);
        let lines = vec![OrderLineRequest { product: &p, quantity: 5 }];

        let result =
            price_order(&customer(), &lines, &registry, &HashMap::new(), Utc::now()).unwrap();

        assert_eq!(result.subtotal_cents, 5000);
        assert_eq!(result.total_tax_cents, 800);
        assert_eq!(result.total_cents, 5800);
    }

    #[test]
    fn lines_keep_caller_order() {
        let registry = TaxRuleRegistry::new(vec![]);
        let p1 = product("p1", 100, 0, &[]);
        let p2 = product("p2", 200, 0, &[]);
        let lines = vec![
            OrderLineRequest { product: &p2, quantity: 1 },
            OrderLineRequest { product: &p1, quantity: 1 },
        ];

        let result =
            price_order(&customer(), &lines, &registry, &HashMap::new(), Utc::now()).unwrap();
        assert_eq!(result.lines[0].product_id, "p2");
        assert_eq!(result.lines[1].product_id, "p1");
    }

    #[test]
    fn empty_order_is_rejected() {
        let registry = TaxRuleRegistry::new(vec![]);
        let err = price_order(&customer(), &[], &registry, &HashMap::new(), Utc::now())
            .unwrap_err();
        assert_eq!(err, ValidationError::EmptyOrder);
    }

    #[test]
    fn one_bad_line_aborts_the_whole_order() {
        let registry = TaxRuleRegistry::new(vec![]);
        let good = product("p1", 100, 0, &[]);
        let bad = product("p2", 100, 0, &[]);
        let lines = vec![
            OrderLineRequest { product: &good, quantity: 1 },
            OrderLineRequest { product: &bad, quantity: -2 },
        ];

        let err = price_order(&customer(), &lines, &registry, &HashMap::new(), Utc::now())
            .unwrap_err();
        assert!(matches!(err, ValidationError::InvalidQuantity { .. }));
    }

    #[test]
    fn order_warning_flag_ors_line_flags() {
        let registry = TaxRuleRegistry::new(vec![]);
        let clean = product("p1", 100, 0, &[]);
        let broken = product("p2", 100, 0, &["ghost-rule"]);
        let lines = vec![
            OrderLineRequest { product: &clean, quantity: 1 },
            OrderLineRequest { product: &broken, quantity: 1 },
        ];

        let result =
            price_order(&customer(), &lines, &registry, &HashMap::new(), Utc::now()).unwrap();
        assert!(result.tax_config_warning);
        assert!(!result.lines[0].tax_config_warning);
        assert!(result.lines[1].tax_config_warning);
    }

    #[test]
    fn calculation_input_freezes_rule_amounts_sorted() {
        let registry = TaxRuleRegistry::new(vec![rule("r2", 45), rule("r1", 60)]);
        let input = build_calculation_input(&customer(), &registry);

        assert_eq!(input.customer_id, "cust-1");
        assert_eq!(input.rules_seen.len(), 2);
        assert_eq!(input.rules_seen[0].rule_id, "r1");
        assert_eq!(input.rules_seen[0].tax_amount_cents, 60);
        assert_eq!(input.rules_seen[1].rule_id, "r2");
    }
}
