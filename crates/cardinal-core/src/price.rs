//! # Price Resolution
//!
//! Resolves the unit price a specific customer pays for a specific
//! product.
//!
//! ## Priority Order
//! ```text
//! 1. Active, unexpired CustomerPriceMemory row  -> its last_paid price
//! 2. price{customer tier}                       -> tiered price
//! 3. Unset? fall back tier by tier (5->4->...->1)
//! 4. All tiers unset? base retail price
//! 5. Nothing at all? ValidationError::NoUsablePrice (fatal)
//! ```
//!
//! The resolver is a pure function of its inputs: the caller supplies the
//! customer row, product row, the (already selected) newest price-memory
//! row for the pair, and `now` for the expiry check. No I/O happens here,
//! which makes tier resolution deterministic for tests and audit replay.

use chrono::{DateTime, Utc};

use crate::error::{CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{clamp_tier, Customer, CustomerPriceMemory, PriceSource, Product};

/// A resolved unit price plus where it came from. The source is frozen
/// onto the order line so staff can see why a customer paid what they
/// paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedPrice {
    pub unit_price: Money,
    pub source: PriceSource,
    /// The standard (tier/base) price, ignoring any memory override.
    /// Recorded as `list_price_cents` when a new memory row is written,
    /// so the granted delta stays visible in the history even when the
    /// unit price came from an earlier override.
    pub list_price: Money,
}

/// Resolves the unit price for (customer, product).
///
/// `memory` must be the newest price-memory row for the pair, or `None`;
/// selecting the newest row is the persistence layer's job. An expired
/// row is treated the same as no row.
///
/// ## Errors
/// [`ValidationError::NoUsablePrice`] when the product has neither a
/// tiered nor a base price. This aborts the whole pricing run.
pub fn resolve_unit_price(
    customer: &Customer,
    product: &Product,
    memory: Option<&CustomerPriceMemory>,
    now: DateTime<Utc>,
) -> CoreResult<ResolvedPrice> {
    let standard = standard_price(customer, product);

    // 1. Price memory wins over everything, regardless of tier. The
    //    standard price rides along so the override's delta stays
    //    reconstructible.
    if let Some(memory) = memory {
        if memory.is_active(now) {
            let unit_price = Money::from_cents(memory.last_paid_cents);
            let list_price = standard.map(|(price, _)| price).unwrap_or(unit_price);
            return Ok(ResolvedPrice {
                unit_price,
                source: PriceSource::PriceMemory,
                list_price,
            });
        }
    }

    match standard {
        Some((price, source)) => Ok(ResolvedPrice {
            unit_price: price,
            source,
            list_price: price,
        }),
        None => Err(ValidationError::NoUsablePrice {
            product_id: product.id.clone(),
        }),
    }
}

/// The standard tier/base price for (customer, product), independent of
/// any memory override. `None` means the product is unpriceable.
fn standard_price(customer: &Customer, product: &Product) -> Option<(Money, PriceSource)> {
    // Tiered price at the customer's (clamped) tier, falling back one
    // tier at a time toward tier 1 when unset.
    let tier = clamp_tier(customer.customer_level);
    for t in (1..=tier).rev() {
        if let Some(cents) = product.tier_price(t) {
            return Some((Money::from_cents(cents), PriceSource::Tier(t)));
        }
    }

    // Base retail price, the last resort. A base price of zero is a
    // real price (promotional item); only "unpriceable" is an error,
    // which for the NOT NULL base column means no row would hit this
    // in practice - guarded anyway for snapshot inputs built by hand.
    if product.base_price_cents >= 0 {
        return Some((Money::from_cents(product.base_price_cents), PriceSource::BasePrice));
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PriceMemoryReason;

    fn product_with_tiers(tiers: [Option<i64>; 5], base: i64) -> Product {
        let now = Utc::now();
        Product {
            id: "prod-1".to_string(),
            sku: "SKU-1".to_string(),
            name: "Test Product".to_string(),
            base_price_cents: base,
            cost_cents: Some(500),
            tier_prices: tiers,
            tax_rate_bps: 0,
            flat_tax_ids: vec![],
            is_tobacco_product: false,
            tobacco_product_type: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn customer_at_level(level: u8) -> Customer {
        let now = Utc::now();
        Customer {
            id: "cust-1".to_string(),
            name: "Test Account".to_string(),
            customer_level: level,
            apply_flat_tax: true,
            tax_exempt: false,
            county: None,
            postal_code: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn memory(cents: i64, expires_at: Option<DateTime<Utc>>) -> CustomerPriceMemory {
        CustomerPriceMemory {
            id: "mem-1".to_string(),
            customer_id: "cust-1".to_string(),
            product_id: "prod-1".to_string(),
            last_paid_cents: cents,
            list_price_cents: 1000,
            reason: PriceMemoryReason::ManualAdjustment,
            note: None,
            expires_at,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn each_tier_resolves_its_own_price() {
        let product = product_with_tiers(
            [Some(1000), Some(950), Some(900), Some(850), Some(800)],
            1100,
        );
        let now = Utc::now();

        for tier in 1..=5u8 {
            let resolved =
                resolve_unit_price(&customer_at_level(tier), &product, None, now).unwrap();
            let expected = product.tier_price(tier).unwrap();
            assert_eq!(resolved.unit_price.cents(), expected);
            assert_eq!(resolved.source, PriceSource::Tier(tier));
        }
    }

    #[test]
    fn unset_tier_falls_back_to_next_lower() {
        // Tier 4 and 5 unset: a tier-5 customer pays the tier-3 price.
        let product = product_with_tiers([Some(1000), Some(950), Some(900), None, None], 1100);
        let now = Utc::now();

        let resolved = resolve_unit_price(&customer_at_level(5), &product, None, now).unwrap();
        assert_eq!(resolved.unit_price.cents(), 900);
        assert_eq!(resolved.source, PriceSource::Tier(3));
    }

    #[test]
    fn all_tiers_unset_falls_back_to_base_price() {
        let product = product_with_tiers([None; 5], 1100);
        let now = Utc::now();

        let resolved = resolve_unit_price(&customer_at_level(3), &product, None, now).unwrap();
        assert_eq!(resolved.unit_price.cents(), 1100);
        assert_eq!(resolved.source, PriceSource::BasePrice);
    }

    #[test]
    fn out_of_range_level_clamps() {
        let product = product_with_tiers(
            [Some(1000), Some(950), Some(900), Some(850), Some(800)],
            1100,
        );
        let now = Utc::now();

        // Level 0 clamps to tier 1.
        let resolved = resolve_unit_price(&customer_at_level(0), &product, None, now).unwrap();
        assert_eq!(resolved.source, PriceSource::Tier(1));
        assert_eq!(resolved.unit_price.cents(), 1000);

        // Level 9 clamps to tier 5.
        let resolved = resolve_unit_price(&customer_at_level(9), &product, None, now).unwrap();
        assert_eq!(resolved.source, PriceSource::Tier(5));
        assert_eq!(resolved.unit_price.cents(), 800);
    }

    #[test]
    fn active_memory_beats_tiered_pricing() {
        let product = product_with_tiers(
            [Some(1000), Some(950), Some(900), Some(850), Some(800)],
            1100,
        );
        let now = Utc::now();
        let memory = memory(725, None);

        for tier in 1..=5u8 {
            let resolved =
                resolve_unit_price(&customer_at_level(tier), &product, Some(&memory), now)
                    .unwrap();
            assert_eq!(resolved.unit_price.cents(), 725);
            assert_eq!(resolved.source, PriceSource::PriceMemory);
            // The standard price for the customer's tier rides along so
            // the override's delta is never lost.
            assert_eq!(resolved.list_price.cents(), product.tier_price(tier).unwrap());
        }
    }

    #[test]
    fn list_price_equals_unit_price_without_an_override() {
        let product = product_with_tiers([Some(1000), None, None, None, None], 1100);
        let now = Utc::now();

        let resolved = resolve_unit_price(&customer_at_level(1), &product, None, now).unwrap();
        assert_eq!(resolved.unit_price, resolved.list_price);

        let base_only = product_with_tiers([None; 5], 1100);
        let resolved = resolve_unit_price(&customer_at_level(1), &base_only, None, now).unwrap();
        assert_eq!(resolved.list_price.cents(), 1100);
    }

    #[test]
    fn expired_memory_is_ignored() {
        let product = product_with_tiers([Some(1000), None, None, None, None], 1100);
        let now = Utc::now();
        let expired = memory(725, Some(now - chrono::Duration::hours(1)));

        let resolved =
            resolve_unit_price(&customer_at_level(1), &product, Some(&expired), now).unwrap();
        assert_eq!(resolved.unit_price.cents(), 1000);
        assert_eq!(resolved.source, PriceSource::Tier(1));
    }

    #[test]
    fn unpriceable_product_is_a_validation_error() {
        let product = product_with_tiers([None; 5], -1);
        let now = Utc::now();

        let err = resolve_unit_price(&customer_at_level(3), &product, None, now).unwrap_err();
        assert!(matches!(err, ValidationError::NoUsablePrice { .. }));
    }

    #[test]
    fn zero_base_price_is_usable() {
        // Promotional giveaway: $0.00 is a price, not an error.
        let product = product_with_tiers([None; 5], 0);
        let now = Utc::now();

        let resolved = resolve_unit_price(&customer_at_level(2), &product, None, now).unwrap();
        assert_eq!(resolved.unit_price, Money::zero());
    }
}
