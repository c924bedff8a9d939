//! # Flat-Tax Rule Repository
//!
//! Append-mostly tax configuration. Rules are edited and deactivated by
//! admins but a rule id is stable forever: historical audit records name
//! rules by id and must stay replayable after deactivation.
//!
//! `customer_tiers` is stored as a JSON array of tier integers.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use cardinal_core::FlatTaxRule;

#[derive(Debug, sqlx::FromRow)]
struct FlatTaxRuleRow {
    id: String,
    name: String,
    tax_amount_cents: i64,
    customer_tiers: String,
    county_restriction: Option<String>,
    zip_code_restriction: Option<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl FlatTaxRuleRow {
    fn into_rule(self) -> DbResult<FlatTaxRule> {
        let customer_tiers: Vec<u8> = serde_json::from_str(&self.customer_tiers)
            .map_err(|e| DbError::corrupt("flat_tax_rule", &self.id, e.to_string()))?;

        Ok(FlatTaxRule {
            id: self.id,
            name: self.name,
            tax_amount_cents: self.tax_amount_cents,
            customer_tiers,
            county_restriction: self.county_restriction,
            zip_code_restriction: self.zip_code_restriction,
            is_active: self.is_active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Repository for flat-tax rules.
#[derive(Debug, Clone)]
pub struct TaxRuleRepository {
    pool: SqlitePool,
}

impl TaxRuleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        TaxRuleRepository { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<FlatTaxRule>> {
        let row: Option<FlatTaxRuleRow> = sqlx::query_as(
            r#"
            SELECT id, name, tax_amount_cents, customer_tiers,
                   county_restriction, zip_code_restriction, is_active,
                   created_at, updated_at
            FROM flat_tax_rules
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(FlatTaxRuleRow::into_rule).transpose()
    }

    /// Every rule, active or not. The registry snapshot needs inactive
    /// rules too, to tell "deactivated" apart from "deleted".
    pub async fn get_all(&self) -> DbResult<Vec<FlatTaxRule>> {
        let rows: Vec<FlatTaxRuleRow> = sqlx::query_as(
            r#"
            SELECT id, name, tax_amount_cents, customer_tiers,
                   county_restriction, zip_code_restriction, is_active,
                   created_at, updated_at
            FROM flat_tax_rules
            ORDER BY created_at
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(FlatTaxRuleRow::into_rule).collect()
    }

    /// Tax-configuration admin path and test seeding.
    pub async fn insert(&self, rule: &FlatTaxRule) -> DbResult<()> {
        debug!(id = %rule.id, name = %rule.name, "inserting flat-tax rule");

        let tiers = serde_json::to_string(&rule.customer_tiers)
            .map_err(|e| DbError::Internal(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO flat_tax_rules (
                id, name, tax_amount_cents, customer_tiers,
                county_restriction, zip_code_restriction, is_active,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&rule.id)
        .bind(&rule.name)
        .bind(rule.tax_amount_cents)
        .bind(tiers)
        .bind(&rule.county_restriction)
        .bind(&rule.zip_code_restriction)
        .bind(rule.is_active)
        .bind(rule.created_at)
        .bind(rule.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Changes a rule's per-unit amount. Historical orders are
    /// unaffected: their applied amounts are frozen on order lines and
    /// in audit records.
    pub async fn update_amount(&self, id: &str, tax_amount_cents: i64) -> DbResult<()> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            UPDATE flat_tax_rules
            SET tax_amount_cents = ?2, updated_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(tax_amount_cents)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("flat_tax_rule", id));
        }

        Ok(())
    }

    /// Deactivates a rule. The row stays (audit replay); new pricing
    /// runs report it as an inactive-reference warning if products still
    /// link to it.
    pub async fn deactivate(&self, id: &str) -> DbResult<()> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            UPDATE flat_tax_rules
            SET is_active = 0, updated_at = ?2
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("flat_tax_rule", id));
        }

        Ok(())
    }
}
