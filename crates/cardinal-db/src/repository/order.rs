//! # Order Repository
//!
//! Persisted orders and their frozen line breakdowns.
//!
//! ## Snapshot Pattern
//! Everything pricing-relevant is copied onto the order line at commit
//! time: product name, resolved unit price (and its source), the rate
//! used, each flat-tax rule's id/name/amount. Later catalog or
//! tax-configuration edits can never change what an existing order says
//! it charged.
//!
//! Order totals are written exactly as the pipeline computed them - the
//! repository never recomputes, so the sum invariant established by the
//! pure code survives persistence.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use cardinal_core::OrderPricingResult;

/// Persisted order header.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Order {
    pub id: String,
    pub customer_id: String,
    pub subtotal_cents: i64,
    pub total_tax_cents: i64,
    pub total_cents: i64,
    pub tax_config_warning: bool,
    /// Set when pricing has been re-run; the audit trail holds every
    /// version.
    pub recalculated: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Persisted order line with the frozen tax breakdown.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OrderLine {
    pub id: String,
    pub order_id: String,
    pub line_no: i64,
    pub product_id: String,
    pub name_snapshot: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    /// "price_memory", "tier_N" or "base_price".
    pub price_source: String,
    pub line_base_cents: i64,
    pub tax_rate_bps: i64,
    pub percentage_tax_cents: i64,
    pub flat_tax_cents: i64,
    pub total_tax_cents: i64,
    pub tax_config_warning: bool,
    pub is_tobacco_product: bool,
    pub tobacco_product_type: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One frozen flat-tax contribution on a line. The IL-TP1 tobacco
/// exporter reads these together with the line's tobacco flags.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OrderLineFlatTax {
    pub order_line_id: String,
    pub rule_id: String,
    pub rule_name_snapshot: String,
    pub amount_cents: i64,
    /// Application order, frozen from the product's rule reference order.
    pub position: i64,
}

/// Repository for order persistence.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Writes the order header, lines and per-line flat taxes from a
    /// pricing result, inside the caller's open transaction. The
    /// pricing service wraps this together with the audit insert so the
    /// whole order commits or rolls back as one unit.
    pub async fn insert_priced(
        conn: &mut SqliteConnection,
        order_id: &str,
        customer_id: &str,
        pricing: &OrderPricingResult,
        now: DateTime<Utc>,
    ) -> DbResult<()> {
        debug!(order_id = %order_id, lines = pricing.lines.len(), "inserting priced order");

        sqlx::query(
            r#"
            INSERT INTO orders (
                id, customer_id, subtotal_cents, total_tax_cents, total_cents,
                tax_config_warning, recalculated, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7, ?7)
            "#,
        )
        .bind(order_id)
        .bind(customer_id)
        .bind(pricing.subtotal_cents)
        .bind(pricing.total_tax_cents)
        .bind(pricing.total_cents)
        .bind(pricing.tax_config_warning)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        Self::insert_lines(conn, order_id, pricing, now).await
    }

    /// Rewrites an order's totals and lines after a re-pricing run and
    /// flags it recalculated. Prior audit versions keep the old numbers.
    pub async fn replace_priced(
        conn: &mut SqliteConnection,
        order_id: &str,
        pricing: &OrderPricingResult,
        now: DateTime<Utc>,
    ) -> DbResult<()> {
        debug!(order_id = %order_id, "replacing order lines after re-pricing");

        let result = sqlx::query(
            r#"
            UPDATE orders SET
                subtotal_cents = ?2,
                total_tax_cents = ?3,
                total_cents = ?4,
                tax_config_warning = ?5,
                recalculated = 1,
                updated_at = ?6
            WHERE id = ?1
            "#,
        )
        .bind(order_id)
        .bind(pricing.subtotal_cents)
        .bind(pricing.total_tax_cents)
        .bind(pricing.total_cents)
        .bind(pricing.tax_config_warning)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("order", order_id));
        }

        // Cascade clears order_line_flat_taxes with the lines.
        sqlx::query("DELETE FROM order_lines WHERE order_id = ?1")
            .bind(order_id)
            .execute(&mut *conn)
            .await?;

        Self::insert_lines(conn, order_id, pricing, now).await
    }

    async fn insert_lines(
        conn: &mut SqliteConnection,
        order_id: &str,
        pricing: &OrderPricingResult,
        now: DateTime<Utc>,
    ) -> DbResult<()> {
        for (index, line) in pricing.lines.iter().enumerate() {
            let line_id = Uuid::new_v4().to_string();

            sqlx::query(
                r#"
                INSERT INTO order_lines (
                    id, order_id, line_no, product_id, name_snapshot,
                    quantity, unit_price_cents, price_source, line_base_cents,
                    tax_rate_bps, percentage_tax_cents, flat_tax_cents, total_tax_cents,
                    tax_config_warning, is_tobacco_product, tobacco_product_type, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)
                "#,
            )
            .bind(&line_id)
            .bind(order_id)
            .bind((index + 1) as i64)
            .bind(&line.product_id)
            .bind(&line.name_snapshot)
            .bind(line.quantity)
            .bind(line.unit_price_cents)
            .bind(line.price_source.as_tag())
            .bind(line.line_base_cents)
            .bind(line.tax_rate_bps as i64)
            .bind(line.percentage_tax_cents)
            .bind(line.flat_tax_cents)
            .bind(line.total_tax_cents)
            .bind(line.tax_config_warning)
            .bind(line.is_tobacco_product)
            .bind(line.tobacco_product_type.map(|t| t.as_str()))
            .bind(now)
            .execute(&mut *conn)
            .await?;

            for (position, applied) in line.applied_flat_taxes.iter().enumerate() {
                sqlx::query(
                    r#"
                    INSERT INTO order_line_flat_taxes (
                        order_line_id, rule_id, rule_name_snapshot, amount_cents, position
                    ) VALUES (?1, ?2, ?3, ?4, ?5)
                    "#,
                )
                .bind(&line_id)
                .bind(&applied.rule_id)
                .bind(&applied.name)
                .bind(applied.amount_cents)
                .bind(position as i64)
                .execute(&mut *conn)
                .await?;
            }
        }

        Ok(())
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Order>> {
        let order: Option<Order> = sqlx::query_as(
            r#"
            SELECT id, customer_id, subtotal_cents, total_tax_cents, total_cents,
                   tax_config_warning, recalculated, created_at, updated_at
            FROM orders
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(order)
    }

    /// Order lines in display (= aggregation) order.
    pub async fn get_lines(&self, order_id: &str) -> DbResult<Vec<OrderLine>> {
        let lines: Vec<OrderLine> = sqlx::query_as(
            r#"
            SELECT id, order_id, line_no, product_id, name_snapshot,
                   quantity, unit_price_cents, price_source, line_base_cents,
                   tax_rate_bps, percentage_tax_cents, flat_tax_cents, total_tax_cents,
                   tax_config_warning, is_tobacco_product, tobacco_product_type, created_at
            FROM order_lines
            WHERE order_id = ?1
            ORDER BY line_no
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(lines)
    }

    /// Frozen flat-tax contributions for one line, in application order.
    pub async fn get_line_flat_taxes(&self, order_line_id: &str) -> DbResult<Vec<OrderLineFlatTax>> {
        let taxes: Vec<OrderLineFlatTax> = sqlx::query_as(
            r#"
            SELECT order_line_id, rule_id, rule_name_snapshot, amount_cents, position
            FROM order_line_flat_taxes
            WHERE order_line_id = ?1
            ORDER BY position
            "#,
        )
        .bind(order_line_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(taxes)
    }

    /// Tobacco-flagged lines for an order, the IL-TP1 exporter's feed.
    pub async fn tobacco_lines(&self, order_id: &str) -> DbResult<Vec<OrderLine>> {
        let lines: Vec<OrderLine> = sqlx::query_as(
            r#"
            SELECT id, order_id, line_no, product_id, name_snapshot,
                   quantity, unit_price_cents, price_source, line_base_cents,
                   tax_rate_bps, percentage_tax_cents, flat_tax_cents, total_tax_cents,
                   tax_config_warning, is_tobacco_product, tobacco_product_type, created_at
            FROM order_lines
            WHERE order_id = ?1 AND is_tobacco_product = 1
            ORDER BY line_no
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(lines)
    }
}
