//! # Domain Types
//!
//! Core domain types for the pricing and tax engine.
//!
//! ## Snapshot Discipline
//! Everything in this module is plain data. The persistence layer fetches
//! rows up front into these types, the engine computes over them as an
//! immutable snapshot, and result types freeze the exact values used
//! (rule ids, rule amounts, unit prices) so that later catalog or
//! tax-configuration edits can never retroactively change a priced order.
//!
//! ## Dual-Key Identity Pattern
//! Entities carry a UUID `id` for database relations plus a business
//! identifier (SKU for products) for humans.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// Tax Rate
// =============================================================================

/// Ad-valorem tax rate in basis points (1 bps = 0.01%).
///
/// 1000 bps = 10%. Integer basis points keep the rate exact through
/// arithmetic; percentages are for display only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TaxRate(u32);

impl TaxRate {
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Convenience constructor from a percentage (10.0 -> 1000 bps).
    pub fn from_percentage(pct: f64) -> Self {
        TaxRate((pct * 100.0).round() as u32)
    }

    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Rate as a percentage, display only.
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

// =============================================================================
// Customer Tiers
// =============================================================================

/// Lowest valid customer tier.
pub const MIN_CUSTOMER_TIER: u8 = 1;

/// Highest valid customer tier.
pub const MAX_CUSTOMER_TIER: u8 = 5;

/// Clamps a customer level into the valid 1..=5 tier range.
///
/// Customer rows imported from legacy systems occasionally carry a level
/// of 0 or 6+; the engine treats those as the nearest valid bound rather
/// than failing the whole order.
#[inline]
pub fn clamp_tier(level: u8) -> u8 {
    level.clamp(MIN_CUSTOMER_TIER, MAX_CUSTOMER_TIER)
}

// =============================================================================
// Product
// =============================================================================

/// Tobacco product classification, used only by the IL-TP1 compliance
/// exporter downstream. A closed enum rather than a free string so the
/// exporter gets compile-time guarantees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TobaccoProductType {
    Cigarette,
    Cigar,
    SmokelessTobacco,
    Vapor,
    Other,
}

impl TobaccoProductType {
    /// Stable database/report tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            TobaccoProductType::Cigarette => "cigarette",
            TobaccoProductType::Cigar => "cigar",
            TobaccoProductType::SmokelessTobacco => "smokeless_tobacco",
            TobaccoProductType::Vapor => "vapor",
            TobaccoProductType::Other => "other",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "cigarette" => Some(TobaccoProductType::Cigarette),
            "cigar" => Some(TobaccoProductType::Cigar),
            "smokeless_tobacco" => Some(TobaccoProductType::SmokelessTobacco),
            "vapor" => Some(TobaccoProductType::Vapor),
            "other" => Some(TobaccoProductType::Other),
            _ => None,
        }
    }
}

/// A wholesale product as seen by the pricing engine.
///
/// `tier_prices[0]` is price1 (tier 1) through `tier_prices[4]` (tier 5).
/// Tiers are intended to be non-increasing but this is not enforced; the
/// resolver's downward fallback makes gaps harmless.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Stock Keeping Unit - business identifier.
    pub sku: String,

    /// Display name, frozen onto order lines at pricing time.
    pub name: String,

    /// Base retail price in cents; the last-resort fallback when no tier
    /// price is set.
    pub base_price_cents: i64,

    /// Cost in cents (margin reporting, not used in pricing).
    pub cost_cents: Option<i64>,

    /// Tiered unit prices in cents, price1..price5. Nullable per tier.
    pub tier_prices: [Option<i64>; 5],

    /// Ad-valorem tax rate in basis points; 0 means no percentage tax.
    pub tax_rate_bps: u32,

    /// Ordered flat-tax rule references (snapshot of the product/rule
    /// association table).
    pub flat_tax_ids: Vec<String>,

    /// Tobacco compliance flags, pass-through for the IL-TP1 exporter.
    pub is_tobacco_product: bool,
    pub tobacco_product_type: Option<TobaccoProductType>,

    /// Whether product is active (soft delete).
    pub is_active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Tiered price for a (already clamped) tier number, if set.
    #[inline]
    pub fn tier_price(&self, tier: u8) -> Option<i64> {
        self.tier_prices[(tier - 1) as usize]
    }

    #[inline]
    pub fn tax_rate(&self) -> TaxRate {
        TaxRate::from_bps(self.tax_rate_bps)
    }
}

// =============================================================================
// Customer
// =============================================================================

/// A wholesale customer account, read-only input to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,

    pub name: String,

    /// Pricing/eligibility tier, 1..=5. Out-of-range values are clamped
    /// at the point of use, never rejected.
    pub customer_level: u8,

    /// Eligibility gate for jurisdictional taxes. NOTE: the business
    /// currently uses this single flag to gate BOTH flat (per-unit) and
    /// percentage (ad-valorem) tax; see `TaxRuleRegistry::percentage_tax_rate`.
    pub apply_flat_tax: bool,

    /// Fully tax-exempt accounts (resellers with exemption certificates).
    pub tax_exempt: bool,

    pub county: Option<String>,
    pub postal_code: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    /// The customer's effective pricing tier, clamped into 1..=5.
    #[inline]
    pub fn tier(&self) -> u8 {
        clamp_tier(self.customer_level)
    }
}

// =============================================================================
// Flat Tax Rule
// =============================================================================

/// A jurisdiction- and tier-restricted flat tax: a fixed amount of cents
/// charged per unit sold (e.g. a per-cigar county tobacco tax).
///
/// Rules are append-mostly: admins edit amounts and deactivate rules, but
/// a rule's id stays stable forever so historical audit records can name
/// it after deactivation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatTaxRule {
    pub id: String,

    pub name: String,

    /// Cents charged per unit sold. Always >= 0.
    pub tax_amount_cents: i64,

    /// Eligible customer tiers, non-empty subset of 1..=5.
    pub customer_tiers: Vec<u8>,

    /// If set, the rule only applies to customers in this county.
    pub county_restriction: Option<String>,

    /// If set, the rule only applies to customers with this postal code.
    pub zip_code_restriction: Option<String>,

    pub is_active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FlatTaxRule {
    #[inline]
    pub fn tax_amount(&self) -> Money {
        Money::from_cents(self.tax_amount_cents)
    }

    /// Tier eligibility check against an already-clamped tier.
    #[inline]
    pub fn allows_tier(&self, tier: u8) -> bool {
        self.customer_tiers.contains(&tier)
    }
}

// =============================================================================
// Customer Price Memory
// =============================================================================

/// Why a price-memory row exists. A closed tag plus the optional
/// free-text `note` on the row keeps both machine-checkable intent and
/// human context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceMemoryReason {
    ManualAdjustment,
    LoyaltyDiscount,
    BulkDiscount,
    Promotion,
    Standard,
}

impl PriceMemoryReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            PriceMemoryReason::ManualAdjustment => "manual_adjustment",
            PriceMemoryReason::LoyaltyDiscount => "loyalty_discount",
            PriceMemoryReason::BulkDiscount => "bulk_discount",
            PriceMemoryReason::Promotion => "promotion",
            PriceMemoryReason::Standard => "standard",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "manual_adjustment" => Some(PriceMemoryReason::ManualAdjustment),
            "loyalty_discount" => Some(PriceMemoryReason::LoyaltyDiscount),
            "bulk_discount" => Some(PriceMemoryReason::BulkDiscount),
            "promotion" => Some(PriceMemoryReason::Promotion),
            "standard" => Some(PriceMemoryReason::Standard),
            _ => None,
        }
    }
}

/// A stored per-(customer, product) price override.
///
/// Rows are append-only: a newer row supersedes an older one for the same
/// pair, nothing is ever deleted. When active and unexpired, the row's
/// `last_paid_cents` beats tiered pricing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerPriceMemory {
    pub id: String,
    pub customer_id: String,
    pub product_id: String,

    /// The price this customer pays, in cents.
    pub last_paid_cents: i64,

    /// The standard (tier/base) price at the time this row was set, kept
    /// so staff can see the delta that was granted.
    pub list_price_cents: i64,

    pub reason: PriceMemoryReason,

    /// Optional human context ("matched competitor quote", etc.).
    pub note: Option<String>,

    /// Overrides past this instant are ignored by the resolver.
    pub expires_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
}

impl CustomerPriceMemory {
    /// Whether this row still overrides tiered pricing at `now`.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expiry) => now < expiry,
            None => true,
        }
    }
}

// =============================================================================
// Calculation Results
// =============================================================================

/// Where a resolved unit price came from. Frozen into the order line and
/// the audit record for dispute resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "tier")]
pub enum PriceSource {
    /// An active CustomerPriceMemory row won.
    PriceMemory,
    /// A tiered price; the payload is the tier whose price was used,
    /// which after fallback may be lower than the customer's own tier.
    Tier(u8),
    /// Base retail price, the last-resort fallback.
    BasePrice,
}

impl PriceSource {
    /// Stable database tag ("price_memory", "tier_3", "base_price").
    pub fn as_tag(&self) -> String {
        match self {
            PriceSource::PriceMemory => "price_memory".to_string(),
            PriceSource::Tier(t) => format!("tier_{t}"),
            PriceSource::BasePrice => "base_price".to_string(),
        }
    }
}

/// One flat-tax rule's contribution to a line, with the amount frozen at
/// calculation time. Required for audit/compliance review even if the
/// rule is edited afterward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedFlatTax {
    pub rule_id: String,
    pub name: String,
    /// `rule.tax_amount_cents * quantity`, exact in integer cents.
    pub amount_cents: i64,
}

/// Why a referenced flat-tax rule was skipped instead of applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningReason {
    /// `flat_tax_ids` names a rule id that no longer exists in the
    /// snapshot.
    Missing,
    /// The referenced rule exists but has been deactivated.
    Inactive,
}

/// A non-fatal tax-configuration finding. Surfaced to staff through the
/// audit record, never to the customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxRuleWarning {
    pub rule_id: String,
    pub reason: WarningReason,
}

/// Per-line tax breakdown, the output of `compute_line`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineTaxResult {
    pub product_id: String,

    /// Product name at pricing time (frozen).
    pub name_snapshot: String,

    pub quantity: i64,

    /// Resolved unit price in cents and where it came from.
    pub unit_price_cents: i64,
    pub price_source: PriceSource,

    /// Standard (tier/base) price ignoring any memory override; equals
    /// `unit_price_cents` unless the price came from memory. Recorded on
    /// new memory rows so the granted delta survives in the history.
    pub list_price_cents: i64,

    /// `unit_price * quantity`.
    pub line_base_cents: i64,

    /// The ad-valorem rate actually used (0 when exempt/gated).
    pub tax_rate_bps: u32,
    pub percentage_tax_cents: i64,

    pub flat_tax_cents: i64,
    pub applied_flat_taxes: Vec<AppliedFlatTax>,

    /// `percentage_tax + flat_tax`.
    pub total_tax_cents: i64,

    /// True when a referenced flat-tax rule had to be skipped.
    pub tax_config_warning: bool,
    pub warnings: Vec<TaxRuleWarning>,

    /// Pass-through for the IL-TP1 tobacco-compliance exporter.
    pub is_tobacco_product: bool,
    pub tobacco_product_type: Option<TobaccoProductType>,
}

/// Order-level pricing result.
///
/// Invariant: `total_tax_cents` is the exact sum of each line's
/// `total_tax_cents` — there is no independent recomputation at order
/// level, so line display and order totals can never drift apart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderPricingResult {
    pub lines: Vec<LineTaxResult>,

    /// Sum of line base prices, excluding tax and delivery. The sole
    /// input the loyalty-points engine may use.
    pub subtotal_cents: i64,

    pub total_tax_cents: i64,

    /// `subtotal + total_tax`. Delivery fee is applied by the caller,
    /// outside this engine.
    pub total_cents: i64,

    /// True when any line carries a configuration warning.
    pub tax_config_warning: bool,
}

// =============================================================================
// Audit Record
// =============================================================================

/// The exact customer/tax-rule state a calculation saw. Typed rather than
/// an ad hoc JSON map so audit consumers get compile-time guarantees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationInput {
    pub customer_id: String,
    pub customer_level: u8,
    pub apply_flat_tax: bool,
    pub tax_exempt: bool,
    pub county: Option<String>,
    pub postal_code: Option<String>,

    /// Every rule the snapshot contained, with the amounts seen, whether
    /// applied or not.
    pub rules_seen: Vec<AuditedRule>,
}

/// One flat-tax rule as it existed at calculation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditedRule {
    pub rule_id: String,
    pub name: String,
    pub tax_amount_cents: i64,
    pub customer_tiers: Vec<u8>,
    pub county_restriction: Option<String>,
    pub zip_code_restriction: Option<String>,
    pub is_active: bool,
}

impl AuditedRule {
    pub fn from_rule(rule: &FlatTaxRule) -> Self {
        AuditedRule {
            rule_id: rule.id.clone(),
            name: rule.name.clone(),
            tax_amount_cents: rule.tax_amount_cents,
            customer_tiers: rule.customer_tiers.clone(),
            county_restriction: rule.county_restriction.clone(),
            zip_code_restriction: rule.zip_code_restriction.clone(),
            is_active: rule.is_active,
        }
    }
}

/// The frozen output side of an audit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationResult {
    pub pricing: OrderPricingResult,
}

/// One immutable pricing-calculation audit row.
///
/// Write-once: a re-run for the same order creates version n+1, it never
/// overwrites. Once an audit exists its contents are authoritative for
/// that order regardless of later Product/FlatTaxRule edits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxCalculationAudit {
    pub id: String,
    pub order_id: String,

    /// 1-based; incremented on every recalculation of the same order.
    pub version: i64,

    pub calculation_input: CalculationInput,
    pub calculation_result: CalculationResult,

    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tax_rate_from_bps() {
        let rate = TaxRate::from_bps(1000);
        assert_eq!(rate.bps(), 1000);
        assert!((rate.percentage() - 10.0).abs() < 0.001);
    }

    #[test]
    fn test_tax_rate_from_percentage() {
        assert_eq!(TaxRate::from_percentage(8.25).bps(), 825);
        assert_eq!(TaxRate::from_percentage(10.0).bps(), 1000);
    }

    #[test]
    fn test_clamp_tier() {
        assert_eq!(clamp_tier(0), 1);
        assert_eq!(clamp_tier(1), 1);
        assert_eq!(clamp_tier(3), 3);
        assert_eq!(clamp_tier(5), 5);
        assert_eq!(clamp_tier(9), 5);
    }

    #[test]
    fn test_price_source_tags() {
        assert_eq!(PriceSource::PriceMemory.as_tag(), "price_memory");
        assert_eq!(PriceSource::Tier(3).as_tag(), "tier_3");
        assert_eq!(PriceSource::BasePrice.as_tag(), "base_price");
    }

    #[test]
    fn test_reason_round_trip() {
        for reason in [
            PriceMemoryReason::ManualAdjustment,
            PriceMemoryReason::LoyaltyDiscount,
            PriceMemoryReason::BulkDiscount,
            PriceMemoryReason::Promotion,
            PriceMemoryReason::Standard,
        ] {
            assert_eq!(PriceMemoryReason::parse(reason.as_str()), Some(reason));
        }
        assert_eq!(PriceMemoryReason::parse("discount"), None);
    }

    /// Audit payloads are stored as JSON text; the serialized shape of
    /// these enums is effectively a wire format and must stay stable.
    #[test]
    fn test_audit_json_shapes() {
        let json = serde_json::to_value(PriceSource::Tier(3)).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "tier", "tier": 3}));

        let json = serde_json::to_value(PriceSource::PriceMemory).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "price_memory"}));

        let json = serde_json::to_value(WarningReason::Inactive).unwrap();
        assert_eq!(json, serde_json::json!("inactive"));

        let json = serde_json::to_value(TobaccoProductType::SmokelessTobacco).unwrap();
        assert_eq!(json, serde_json::json!("smokeless_tobacco"));
    }

    #[test]
    fn test_memory_activity_window() {
        let now = Utc::now();
        let mut memory = CustomerPriceMemory {
            id: "m1".to_string(),
            customer_id: "c1".to_string(),
            product_id: "p1".to_string(),
            last_paid_cents: 900,
            list_price_cents: 1000,
            reason: PriceMemoryReason::ManualAdjustment,
            note: None,
            expires_at: None,
            created_at: now,
        };
        assert!(memory.is_active(now));

        memory.expires_at = Some(now + chrono::Duration::days(1));
        assert!(memory.is_active(now));

        memory.expires_at = Some(now - chrono::Duration::seconds(1));
        assert!(!memory.is_active(now));
    }
}
