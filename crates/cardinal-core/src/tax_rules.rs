//! # Tax Rule Registry
//!
//! Holds the flat-tax rule snapshot for one pricing run and answers
//! "which rules apply to this (product, customer) pair".
//!
//! ## Applicability Predicate
//! A rule applies iff ALL of:
//! - the customer's `apply_flat_tax` gate is set
//! - the rule is active
//! - the rule id appears in the product's `flat_tax_ids`
//! - the customer's (clamped) tier is in the rule's eligible tiers
//! - county restriction is empty or matches the customer's county
//! - zip restriction is empty or matches the customer's postal code
//!
//! Ineligibility by tier or geography is a normal outcome. A referenced
//! rule that is MISSING from the snapshot or INACTIVE is a configuration
//! finding instead: it is skipped and reported as a [`TaxRuleWarning`]
//! so the line can be flagged without aborting checkout.
//!
//! The registry returns owned clones, never live references, so later
//! rule edits cannot mutate an in-flight calculation.

use std::collections::HashMap;

use crate::types::{
    Customer, FlatTaxRule, Product, TaxRate, TaxRuleWarning, WarningReason,
};

/// The outcome of filtering a product's rule references against one
/// customer: the rules to charge plus any configuration warnings found
/// along the way.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleSelection {
    pub rules: Vec<FlatTaxRule>,
    pub warnings: Vec<TaxRuleWarning>,
}

/// Immutable snapshot of flat-tax rules for one pricing run.
#[derive(Debug, Clone, Default)]
pub struct TaxRuleRegistry {
    rules: HashMap<String, FlatTaxRule>,
}

impl TaxRuleRegistry {
    /// Builds a registry from the rules fetched for this run. Inactive
    /// rules belong in the snapshot too - the registry needs to see them
    /// to distinguish "deactivated" from "deleted".
    pub fn new(rules: Vec<FlatTaxRule>) -> Self {
        let rules = rules.into_iter().map(|r| (r.id.clone(), r)).collect();
        TaxRuleRegistry { rules }
    }

    /// Looks up a rule by id.
    pub fn get(&self, rule_id: &str) -> Option<&FlatTaxRule> {
        self.rules.get(rule_id)
    }

    /// Every rule in the snapshot, for audit capture.
    pub fn all_rules(&self) -> impl Iterator<Item = &FlatTaxRule> {
        self.rules.values()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Filters the product's rule references down to the rules that
    /// apply to this customer, in the product's reference order.
    pub fn applicable_flat_taxes(&self, product: &Product, customer: &Customer) -> RuleSelection {
        let mut selection = RuleSelection::default();

        for rule_id in &product.flat_tax_ids {
            let rule = match self.rules.get(rule_id) {
                Some(rule) => rule,
                None => {
                    // Referenced rule no longer exists: skip, flag, continue.
                    selection.warnings.push(TaxRuleWarning {
                        rule_id: rule_id.clone(),
                        reason: WarningReason::Missing,
                    });
                    continue;
                }
            };

            if !rule.is_active {
                selection.warnings.push(TaxRuleWarning {
                    rule_id: rule_id.clone(),
                    reason: WarningReason::Inactive,
                });
                continue;
            }

            if !customer.apply_flat_tax {
                continue;
            }

            if !rule.allows_tier(customer.tier()) {
                continue;
            }

            if let Some(county) = &rule.county_restriction {
                if customer.county.as_deref() != Some(county.as_str()) {
                    continue;
                }
            }

            if let Some(zip) = &rule.zip_code_restriction {
                if customer.postal_code.as_deref() != Some(zip.as_str()) {
                    continue;
                }
            }

            selection.rules.push(rule.clone());
        }

        selection
    }

    /// The ad-valorem rate to charge this customer for this product.
    ///
    /// Zero when the customer is tax-exempt. Zero also when
    /// `apply_flat_tax` is unset: the business gates percentage tax and
    /// flat tax behind the same customer flag, conceptually independent
    /// or not, and this engine preserves that observed behavior. If the
    /// flags are ever split, this is the only place that changes.
    pub fn percentage_tax_rate(&self, product: &Product, customer: &Customer) -> TaxRate {
        if customer.tax_exempt || !customer.apply_flat_tax {
            return TaxRate::zero();
        }

        product.tax_rate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn rule(id: &str, amount: i64, tiers: Vec<u8>) -> FlatTaxRule {
        let now = Utc::now();
        FlatTaxRule {
            id: id.to_string(),
            name: format!("Rule {id}"),
            tax_amount_cents: amount,
            customer_tiers: tiers,
            county_restriction: None,
            zip_code_restriction: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn product_with_rules(ids: &[&str], rate_bps: u32) -> Product {
        let now = Utc::now();
        Product {
            id: "prod-1".to_string(),
            sku: "SKU-1".to_string(),
            name: "Test Product".to_string(),
            base_price_cents: 1000,
            cost_cents: None,
            tier_prices: [None; 5],
            tax_rate_bps: rate_bps,
            flat_tax_ids: ids.iter().map(|s| s.to_string()).collect(),
            is_tobacco_product: true,
            tobacco_product_type: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn customer(level: u8, apply_flat_tax: bool, county: Option<&str>) -> Customer {
        let now = Utc::now();
        Customer {
            id: "cust-1".to_string(),
            name: "Test Account".to_string(),
            customer_level: level,
            apply_flat_tax,
            tax_exempt: false,
            county: county.map(|s| s.to_string()),
            postal_code: Some("60601".to_string()),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn eligible_rules_are_selected_in_reference_order() {
        let registry = TaxRuleRegistry::new(vec![
            rule("r1", 60, vec![2, 3, 4, 5]),
            rule("r2", 45, vec![2, 3]),
        ]);
        let product = product_with_rules(&["r2", "r1"], 0);

        let selection = registry.applicable_flat_taxes(&product, &customer(3, true, None));
        let ids: Vec<&str> = selection.rules.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["r2", "r1"]);
        assert!(selection.warnings.is_empty());
    }

    #[test]
    fn apply_flat_tax_false_selects_nothing() {
        let registry = TaxRuleRegistry::new(vec![rule("r1", 60, vec![1, 2, 3, 4, 5])]);
        let product = product_with_rules(&["r1"], 0);

        let selection = registry.applicable_flat_taxes(&product, &customer(1, false, None));
        assert!(selection.rules.is_empty());
        assert!(selection.warnings.is_empty());
    }

    #[test]
    fn tier_outside_rule_tiers_is_not_selected_and_not_a_warning() {
        let registry = TaxRuleRegistry::new(vec![rule("r1", 60, vec![2, 3])]);
        let product = product_with_rules(&["r1"], 0);

        let selection = registry.applicable_flat_taxes(&product, &customer(5, true, None));
        assert!(selection.rules.is_empty());
        assert!(selection.warnings.is_empty());
    }

    #[test]
    fn county_restriction_must_match() {
        let mut restricted = rule("r1", 60, vec![1, 2, 3, 4, 5]);
        restricted.county_restriction = Some("Cook".to_string());
        let registry = TaxRuleRegistry::new(vec![restricted]);
        let product = product_with_rules(&["r1"], 0);

        let hit = registry.applicable_flat_taxes(&product, &customer(3, true, Some("Cook")));
        assert_eq!(hit.rules.len(), 1);

        let miss = registry.applicable_flat_taxes(&product, &customer(3, true, Some("DuPage")));
        assert!(miss.rules.is_empty());

        let none = registry.applicable_flat_taxes(&product, &customer(3, true, None));
        assert!(none.rules.is_empty());
    }

    #[test]
    fn zip_restriction_must_match() {
        let mut restricted = rule("r1", 60, vec![1, 2, 3, 4, 5]);
        restricted.zip_code_restriction = Some("60601".to_string());
        let registry = TaxRuleRegistry::new(vec![restricted]);
        let product = product_with_rules(&["r1"], 0);

        let hit = registry.applicable_flat_taxes(&product, &customer(3, true, None));
        assert_eq!(hit.rules.len(), 1);

        let mut far_away = customer(3, true, None);
        far_away.postal_code = Some("90210".to_string());
        let miss = registry.applicable_flat_taxes(&product, &far_away);
        assert!(miss.rules.is_empty());
    }

    #[test]
    fn missing_rule_reference_is_a_warning_not_an_abort() {
        let registry = TaxRuleRegistry::new(vec![rule("r1", 60, vec![1, 2, 3, 4, 5])]);
        let product = product_with_rules(&["ghost", "r1"], 0);

        let selection = registry.applicable_flat_taxes(&product, &customer(3, true, None));
        assert_eq!(selection.rules.len(), 1);
        assert_eq!(selection.warnings.len(), 1);
        assert_eq!(selection.warnings[0].rule_id, "ghost");
        assert_eq!(selection.warnings[0].reason, WarningReason::Missing);
    }

    #[test]
    fn inactive_rule_reference_is_a_warning() {
        let mut retired = rule("r1", 60, vec![1, 2, 3, 4, 5]);
        retired.is_active = false;
        let registry = TaxRuleRegistry::new(vec![retired]);
        let product = product_with_rules(&["r1"], 0);

        let selection = registry.applicable_flat_taxes(&product, &customer(3, true, None));
        assert!(selection.rules.is_empty());
        assert_eq!(selection.warnings.len(), 1);
        assert_eq!(selection.warnings[0].reason, WarningReason::Inactive);
    }

    #[test]
    fn percentage_rate_is_product_rate_by_default() {
        let registry = TaxRuleRegistry::new(vec![]);
        let product = product_with_rules(&[], 1000);

        let rate = registry.percentage_tax_rate(&product, &customer(3, true, None));
        assert_eq!(rate.bps(), 1000);
    }

    #[test]
    fn tax_exempt_zeroes_percentage_rate() {
        let registry = TaxRuleRegistry::new(vec![]);
        let product = product_with_rules(&[], 1000);

        let mut exempt = customer(3, true, None);
        exempt.tax_exempt = true;
        assert!(registry.percentage_tax_rate(&product, &exempt).is_zero());
    }

    #[test]
    fn apply_flat_tax_false_also_zeroes_percentage_rate() {
        // The single-flag gate, preserved as the business runs it today.
        let registry = TaxRuleRegistry::new(vec![]);
        let product = product_with_rules(&[], 1000);

        let rate = registry.percentage_tax_rate(&product, &customer(3, false, None));
        assert!(rate.is_zero());
    }

    #[test]
    fn selection_is_a_snapshot_not_a_live_reference() {
        let registry = TaxRuleRegistry::new(vec![rule("r1", 60, vec![1, 2, 3, 4, 5])]);
        let product = product_with_rules(&["r1"], 0);

        let selection = registry.applicable_flat_taxes(&product, &customer(3, true, None));
        let frozen_amount = selection.rules[0].tax_amount_cents;

        // A second registry built from edited rules does not affect the
        // selection already taken.
        drop(registry);
        assert_eq!(frozen_amount, 60);
    }
}
