//! # Pricing Audit Repository
//!
//! Append-only, versioned `tax_calculation_audits` rows.
//!
//! ## Write-Once Discipline
//! An audit row is never updated. Re-running pricing for an order does
//! not overwrite or error: it inserts version n+1 inside the same
//! transaction as the recomputed order, so a correction is itself an
//! auditable event. `UNIQUE(order_id, version)` backstops concurrent
//! writers - the loser's transaction rolls back and retries at the next
//! version.
//!
//! Once a row exists its contents are authoritative for that order no
//! matter how Product or FlatTaxRule rows change afterwards.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use cardinal_core::{CalculationInput, CalculationResult, TaxCalculationAudit};

#[derive(Debug, sqlx::FromRow)]
struct AuditRow {
    id: String,
    order_id: String,
    version: i64,
    calculation_input: String,
    calculation_result: String,
    created_at: DateTime<Utc>,
}

impl AuditRow {
    fn into_audit(self) -> DbResult<TaxCalculationAudit> {
        let calculation_input: CalculationInput = serde_json::from_str(&self.calculation_input)
            .map_err(|e| DbError::corrupt("tax_calculation_audit", &self.id, e.to_string()))?;
        let calculation_result: CalculationResult = serde_json::from_str(&self.calculation_result)
            .map_err(|e| DbError::corrupt("tax_calculation_audit", &self.id, e.to_string()))?;

        Ok(TaxCalculationAudit {
            id: self.id,
            order_id: self.order_id,
            version: self.version,
            calculation_input,
            calculation_result,
            created_at: self.created_at,
        })
    }
}

/// Repository for tax-calculation audit records.
#[derive(Debug, Clone)]
pub struct AuditRepository {
    pool: SqlitePool,
}

impl AuditRepository {
    pub fn new(pool: SqlitePool) -> Self {
        AuditRepository { pool }
    }

    /// Appends the next audit version for an order, inside the caller's
    /// open transaction (the same one that writes the order rows, so
    /// order and audit commit or roll back together).
    pub async fn record(
        conn: &mut SqliteConnection,
        order_id: &str,
        input: &CalculationInput,
        result: &CalculationResult,
        now: DateTime<Utc>,
    ) -> DbResult<TaxCalculationAudit> {
        // Next version computed inside the transaction; the UNIQUE
        // constraint catches a concurrent writer that raced us.
        let max_version: Option<i64> = sqlx::query_scalar(
            "SELECT MAX(version) FROM tax_calculation_audits WHERE order_id = ?1",
        )
        .bind(order_id)
        .fetch_one(&mut *conn)
        .await?;

        let version = max_version.unwrap_or(0) + 1;
        let id = Uuid::new_v4().to_string();

        debug!(order_id = %order_id, version, "recording pricing audit");

        let input_json =
            serde_json::to_string(input).map_err(|e| DbError::Internal(e.to_string()))?;
        let result_json =
            serde_json::to_string(result).map_err(|e| DbError::Internal(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO tax_calculation_audits (
                id, order_id, version, calculation_input, calculation_result, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&id)
        .bind(order_id)
        .bind(version)
        .bind(&input_json)
        .bind(&result_json)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        Ok(TaxCalculationAudit {
            id,
            order_id: order_id.to_string(),
            version,
            calculation_input: input.clone(),
            calculation_result: result.clone(),
            created_at: now,
        })
    }

    /// Every audit version for an order, oldest first. Read-only: admin
    /// review screens and the regulatory export consume this.
    pub async fn list_for_order(&self, order_id: &str) -> DbResult<Vec<TaxCalculationAudit>> {
        let rows: Vec<AuditRow> = sqlx::query_as(
            r#"
            SELECT id, order_id, version, calculation_input, calculation_result, created_at
            FROM tax_calculation_audits
            WHERE order_id = ?1
            ORDER BY version
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(AuditRow::into_audit).collect()
    }

    /// The latest audit version for an order, if any.
    pub async fn latest_for_order(&self, order_id: &str) -> DbResult<Option<TaxCalculationAudit>> {
        let row: Option<AuditRow> = sqlx::query_as(
            r#"
            SELECT id, order_id, version, calculation_input, calculation_result, created_at
            FROM tax_calculation_audits
            WHERE order_id = ?1
            ORDER BY version DESC
            LIMIT 1
            "#,
        )
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(AuditRow::into_audit).transpose()
    }
}
