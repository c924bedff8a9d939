//! # Order Pricing Service
//!
//! The single entry point callers use to price and commit orders.
//!
//! ## Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Order Pricing Data Flow                            │
//! │                                                                         │
//! │  price_and_commit(customer_id, lines)                                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  1. SNAPSHOT    customer, products, every flat-tax rule, newest        │
//! │                 price-memory row per product  (reads, no locks)        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  2. COMPUTE     cardinal_core::price_order over the snapshot           │
//! │                 (pure, no I/O, deterministic)                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  3. COMMIT      one transaction: order + lines + flat-tax              │
//! │                 breakdown + audit version + price-memory rows          │
//! │                 (all-or-nothing)                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Stages never interleave: the calculation sees exactly the state the
//! snapshot read, and concurrent configuration edits affect the next run,
//! not this one. There is no event dispatch anywhere in the flow; a
//! pricing run either returns with everything committed or with nothing
//! written.

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::pool::Database;
use crate::repository::audit::AuditRepository;
use crate::repository::order::OrderRepository;
use crate::repository::price_memory::PriceMemoryRepository;
use cardinal_core::{
    build_calculation_input, build_calculation_result, price_order, Customer, CustomerPriceMemory,
    OrderLineRequest, OrderPricingResult, PriceMemoryReason, Product, TaxCalculationAudit,
    TaxRuleRegistry,
};

use std::collections::HashMap;

/// One requested order line, by product id.
#[derive(Debug, Clone)]
pub struct OrderRequestLine {
    pub product_id: String,
    pub quantity: i64,
}

/// The outcome of a committed pricing run.
#[derive(Debug, Clone)]
pub struct PricedOrder {
    pub order_id: String,
    pub pricing: OrderPricingResult,
    pub audit: TaxCalculationAudit,
}

/// Orchestrates snapshot -> calculation -> atomic commit.
#[derive(Debug, Clone)]
pub struct OrderPricingService {
    db: Database,
}

/// The immutable state one pricing run computes over.
struct PricingSnapshot {
    customer: Customer,
    products: Vec<(Product, i64)>,
    registry: TaxRuleRegistry,
    memories: HashMap<String, CustomerPriceMemory>,
}

impl OrderPricingService {
    pub fn new(db: Database) -> Self {
        OrderPricingService { db }
    }

    /// Prices a new order and commits it with its first audit version.
    ///
    /// Fatal validation problems (empty order, non-positive quantity, a
    /// product with no usable price) abort before any write. After the
    /// transaction begins, any failure rolls back the order, its lines,
    /// the audit row and the price-memory updates together.
    pub async fn price_and_commit(
        &self,
        customer_id: &str,
        lines: &[OrderRequestLine],
    ) -> DbResult<PricedOrder> {
        let now = Utc::now();
        let snapshot = self.load_snapshot(customer_id, lines).await?;
        let pricing = Self::compute(&snapshot, now)?;

        let order_id = Uuid::new_v4().to_string();
        let input = build_calculation_input(&snapshot.customer, &snapshot.registry);
        let result = build_calculation_result(pricing.clone());

        let mut tx = self.db.pool().begin().await?;
        OrderRepository::insert_priced(&mut *tx, &order_id, &snapshot.customer.id, &pricing, now)
            .await?;
        let audit = AuditRepository::record(&mut *tx, &order_id, &input, &result, now).await?;

        // Each priced line becomes the customer's new remembered price for
        // that product, in the same transaction as the order itself.
        for line in &pricing.lines {
            let memory = CustomerPriceMemory {
                id: Uuid::new_v4().to_string(),
                customer_id: snapshot.customer.id.clone(),
                product_id: line.product_id.clone(),
                last_paid_cents: line.unit_price_cents,
                list_price_cents: line.list_price_cents,
                reason: PriceMemoryReason::Standard,
                note: Some(format!("recorded automatically from order {order_id}")),
                expires_at: None,
                created_at: now,
            };
            PriceMemoryRepository::insert_with(&mut *tx, &memory).await?;
        }

        tx.commit().await?;

        if pricing.tax_config_warning {
            warn!(
                order_id = %order_id,
                customer_id = %snapshot.customer.id,
                "order committed with tax-configuration warnings"
            );
        }
        info!(
            order_id = %order_id,
            customer_id = %snapshot.customer.id,
            lines = pricing.lines.len(),
            subtotal_cents = pricing.subtotal_cents,
            total_tax_cents = pricing.total_tax_cents,
            audit_version = audit.version,
            "order priced and committed"
        );

        Ok(PricedOrder {
            order_id,
            pricing,
            audit,
        })
    }

    /// Re-runs pricing for an existing order against the current catalog
    /// and tax configuration.
    ///
    /// The order's totals and lines are rewritten and the order is
    /// flagged recalculated, but the previous audit versions are left
    /// untouched: the re-run appends version n+1 in the same transaction,
    /// so corrections are themselves auditable events.
    pub async fn reprice_and_commit(&self, order_id: &str) -> DbResult<PricedOrder> {
        let now = Utc::now();

        let order = self
            .db
            .orders()
            .get_by_id(order_id)
            .await?
            .ok_or_else(|| DbError::not_found("order", order_id))?;
        let existing_lines = self.db.orders().get_lines(order_id).await?;

        let requests: Vec<OrderRequestLine> = existing_lines
            .iter()
            .map(|line| OrderRequestLine {
                product_id: line.product_id.clone(),
                quantity: line.quantity,
            })
            .collect();

        let snapshot = self.load_snapshot(&order.customer_id, &requests).await?;
        let pricing = Self::compute(&snapshot, now)?;

        let input = build_calculation_input(&snapshot.customer, &snapshot.registry);
        let result = build_calculation_result(pricing.clone());

        let mut tx = self.db.pool().begin().await?;
        OrderRepository::replace_priced(&mut *tx, order_id, &pricing, now).await?;
        let audit = AuditRepository::record(&mut *tx, order_id, &input, &result, now).await?;
        tx.commit().await?;

        info!(
            order_id = %order_id,
            audit_version = audit.version,
            total_tax_cents = pricing.total_tax_cents,
            "order repriced"
        );

        Ok(PricedOrder {
            order_id: order_id.to_string(),
            pricing,
            audit,
        })
    }

    /// Every audit version recorded for an order, oldest first.
    pub async fn audits_for_order(&self, order_id: &str) -> DbResult<Vec<TaxCalculationAudit>> {
        self.db.audits().list_for_order(order_id).await
    }

    /// Stage 1: read everything a calculation needs, up front.
    async fn load_snapshot(
        &self,
        customer_id: &str,
        lines: &[OrderRequestLine],
    ) -> DbResult<PricingSnapshot> {
        let customer = self
            .db
            .customers()
            .get_by_id(customer_id)
            .await?
            .ok_or_else(|| DbError::not_found("customer", customer_id))?;

        let products_repo = self.db.products();
        let memory_repo = self.db.price_memory();

        let mut products = Vec::with_capacity(lines.len());
        let mut memories = HashMap::new();
        for line in lines {
            let product = products_repo
                .get_by_id(&line.product_id)
                .await?
                .ok_or_else(|| DbError::not_found("product", &line.product_id))?;

            if let Some(memory) = memory_repo
                .latest_for_pair(customer_id, &line.product_id)
                .await?
            {
                memories.insert(line.product_id.clone(), memory);
            }

            products.push((product, line.quantity));
        }

        let registry = TaxRuleRegistry::new(self.db.tax_rules().get_all().await?);

        Ok(PricingSnapshot {
            customer,
            products,
            registry,
            memories,
        })
    }

    /// Stage 2: pure calculation over the snapshot.
    fn compute(
        snapshot: &PricingSnapshot,
        now: chrono::DateTime<Utc>,
    ) -> DbResult<OrderPricingResult> {
        let requests: Vec<OrderLineRequest<'_>> = snapshot
            .products
            .iter()
            .map(|(product, quantity)| OrderLineRequest {
                product,
                quantity: *quantity,
            })
            .collect();

        let pricing = price_order(
            &snapshot.customer,
            &requests,
            &snapshot.registry,
            &snapshot.memories,
            now,
        )?;

        Ok(pricing)
    }
}
