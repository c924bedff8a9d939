//! # Customer Repository
//!
//! Read-mostly customer rows; the engine never writes customer state.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use cardinal_core::Customer;

#[derive(Debug, sqlx::FromRow)]
struct CustomerRow {
    id: String,
    name: String,
    customer_level: i64,
    apply_flat_tax: bool,
    tax_exempt: bool,
    county: Option<String>,
    postal_code: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CustomerRow> for Customer {
    fn from(row: CustomerRow) -> Self {
        Customer {
            id: row.id,
            name: row.name,
            // Legacy imports occasionally hold 0 or 6+; the core clamps
            // at point of use, the raw value is preserved here.
            customer_level: row.customer_level.clamp(0, u8::MAX as i64) as u8,
            apply_flat_tax: row.apply_flat_tax,
            tax_exempt: row.tax_exempt,
            county: row.county,
            postal_code: row.postal_code,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Repository for customer rows.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Customer>> {
        let row: Option<CustomerRow> = sqlx::query_as(
            r#"
            SELECT id, name, customer_level, apply_flat_tax, tax_exempt,
                   county, postal_code, created_at, updated_at
            FROM customers
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Customer::from))
    }

    /// Account-admin path and test seeding.
    pub async fn insert(&self, customer: &Customer) -> DbResult<()> {
        debug!(id = %customer.id, "inserting customer");

        sqlx::query(
            r#"
            INSERT INTO customers (
                id, name, customer_level, apply_flat_tax, tax_exempt,
                county, postal_code, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&customer.id)
        .bind(&customer.name)
        .bind(customer.customer_level as i64)
        .bind(customer.apply_flat_tax)
        .bind(customer.tax_exempt)
        .bind(&customer.county)
        .bind(&customer.postal_code)
        .bind(customer.created_at)
        .bind(customer.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
