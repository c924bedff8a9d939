//! # Price Memory Repository
//!
//! Append-only per-(customer, product) price overrides. A newer row
//! supersedes an older one for the same pair; nothing is ever deleted,
//! so staff can always reconstruct what a customer was paying and why.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use cardinal_core::{CustomerPriceMemory, PriceMemoryReason};

#[derive(Debug, sqlx::FromRow)]
struct PriceMemoryRow {
    id: String,
    customer_id: String,
    product_id: String,
    last_paid_cents: i64,
    list_price_cents: i64,
    reason: String,
    note: Option<String>,
    expires_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl PriceMemoryRow {
    fn into_memory(self) -> DbResult<CustomerPriceMemory> {
        let reason = PriceMemoryReason::parse(&self.reason)
            .ok_or_else(|| DbError::corrupt("customer_price_memory", &self.id, "unknown reason tag"))?;

        Ok(CustomerPriceMemory {
            id: self.id,
            customer_id: self.customer_id,
            product_id: self.product_id,
            last_paid_cents: self.last_paid_cents,
            list_price_cents: self.list_price_cents,
            reason,
            note: self.note,
            expires_at: self.expires_at,
            created_at: self.created_at,
        })
    }
}

/// Repository for customer price-memory rows.
#[derive(Debug, Clone)]
pub struct PriceMemoryRepository {
    pool: SqlitePool,
}

impl PriceMemoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        PriceMemoryRepository { pool }
    }

    /// The newest row for a (customer, product) pair, expired or not.
    /// The core resolver decides whether it is still active.
    pub async fn latest_for_pair(
        &self,
        customer_id: &str,
        product_id: &str,
    ) -> DbResult<Option<CustomerPriceMemory>> {
        let row: Option<PriceMemoryRow> = sqlx::query_as(
            r#"
            SELECT id, customer_id, product_id, last_paid_cents, list_price_cents,
                   reason, note, expires_at, created_at
            FROM customer_price_memory
            WHERE customer_id = ?1 AND product_id = ?2
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(customer_id)
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(PriceMemoryRow::into_memory).transpose()
    }

    /// Full history for a pair, newest first. Staff review screens.
    pub async fn history_for_pair(
        &self,
        customer_id: &str,
        product_id: &str,
    ) -> DbResult<Vec<CustomerPriceMemory>> {
        let rows: Vec<PriceMemoryRow> = sqlx::query_as(
            r#"
            SELECT id, customer_id, product_id, last_paid_cents, list_price_cents,
                   reason, note, expires_at, created_at
            FROM customer_price_memory
            WHERE customer_id = ?1 AND product_id = ?2
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(customer_id)
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(PriceMemoryRow::into_memory).collect()
    }

    /// Appends a new row; the previous row for the pair is superseded by
    /// recency, never touched. Staff manual adjustments come through
    /// here; order commits use [`Self::insert_with`] inside the order
    /// transaction instead.
    pub async fn insert(&self, memory: &CustomerPriceMemory) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        Self::insert_with(&mut conn, memory).await
    }

    /// Appends a new row on an already-open connection, so the pricing
    /// service can write memory updates atomically with the order.
    pub async fn insert_with(
        conn: &mut SqliteConnection,
        memory: &CustomerPriceMemory,
    ) -> DbResult<()> {
        debug!(
            customer_id = %memory.customer_id,
            product_id = %memory.product_id,
            reason = memory.reason.as_str(),
            "appending price-memory row"
        );

        sqlx::query(
            r#"
            INSERT INTO customer_price_memory (
                id, customer_id, product_id, last_paid_cents, list_price_cents,
                reason, note, expires_at, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&memory.id)
        .bind(&memory.customer_id)
        .bind(&memory.product_id)
        .bind(memory.last_paid_cents)
        .bind(memory.list_price_cents)
        .bind(memory.reason.as_str())
        .bind(&memory.note)
        .bind(memory.expires_at)
        .bind(memory.created_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }
}
