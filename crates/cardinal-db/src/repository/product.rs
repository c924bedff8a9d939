//! # Product Repository
//!
//! Catalog rows plus their flat-tax rule links, loaded as immutable
//! snapshots for pricing runs. The product <-> rule association is a
//! real join table (`product_flat_taxes`) with referential integrity,
//! so a deleted rule fails loudly instead of leaving a dangling id.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use cardinal_core::{Product, TobaccoProductType};

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: String,
    sku: String,
    name: String,
    base_price_cents: i64,
    cost_cents: Option<i64>,
    price1_cents: Option<i64>,
    price2_cents: Option<i64>,
    price3_cents: Option<i64>,
    price4_cents: Option<i64>,
    price5_cents: Option<i64>,
    tax_rate_bps: i64,
    is_tobacco_product: bool,
    tobacco_product_type: Option<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ProductRow {
    fn into_product(self, flat_tax_ids: Vec<String>) -> Product {
        Product {
            id: self.id,
            sku: self.sku,
            name: self.name,
            base_price_cents: self.base_price_cents,
            cost_cents: self.cost_cents,
            tier_prices: [
                self.price1_cents,
                self.price2_cents,
                self.price3_cents,
                self.price4_cents,
                self.price5_cents,
            ],
            tax_rate_bps: self.tax_rate_bps as u32,
            flat_tax_ids,
            is_tobacco_product: self.is_tobacco_product,
            tobacco_product_type: self
                .tobacco_product_type
                .as_deref()
                .and_then(TobaccoProductType::parse),
            is_active: self.is_active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Repository for product rows.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Fetches one product with its flat-tax links, in link order.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let row: Option<ProductRow> = sqlx::query_as(
            r#"
            SELECT id, sku, name, base_price_cents, cost_cents,
                   price1_cents, price2_cents, price3_cents, price4_cents, price5_cents,
                   tax_rate_bps, is_tobacco_product, tobacco_product_type,
                   is_active, created_at, updated_at
            FROM products
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let flat_tax_ids = self.flat_tax_ids(id).await?;
        Ok(Some(row.into_product(flat_tax_ids)))
    }

    /// The product's rule references, ordered by admin-assigned position.
    async fn flat_tax_ids(&self, product_id: &str) -> DbResult<Vec<String>> {
        let ids: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT rule_id
            FROM product_flat_taxes
            WHERE product_id = ?1
            ORDER BY position
            "#,
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids.into_iter().map(|(id,)| id).collect())
    }

    /// Inserts a product and its flat-tax links. Catalog admin path and
    /// test seeding.
    pub async fn insert(&self, product: &Product) -> DbResult<()> {
        debug!(id = %product.id, sku = %product.sku, "inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, sku, name, base_price_cents, cost_cents,
                price1_cents, price2_cents, price3_cents, price4_cents, price5_cents,
                tax_rate_bps, is_tobacco_product, tobacco_product_type,
                is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
            "#,
        )
        .bind(&product.id)
        .bind(&product.sku)
        .bind(&product.name)
        .bind(product.base_price_cents)
        .bind(product.cost_cents)
        .bind(product.tier_prices[0])
        .bind(product.tier_prices[1])
        .bind(product.tier_prices[2])
        .bind(product.tier_prices[3])
        .bind(product.tier_prices[4])
        .bind(product.tax_rate_bps as i64)
        .bind(product.is_tobacco_product)
        .bind(product.tobacco_product_type.map(|t| t.as_str()))
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        for (position, rule_id) in product.flat_tax_ids.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO product_flat_taxes (product_id, rule_id, position)
                VALUES (?1, ?2, ?3)
                "#,
            )
            .bind(&product.id)
            .bind(rule_id)
            .bind(position as i64)
            .execute(&self.pool)
            .await?;
        }

        Ok(())
    }

    /// Replaces a product's flat-tax links. Admin path when tax
    /// configuration changes; existing priced orders are unaffected
    /// because their applied taxes are frozen on order lines.
    pub async fn set_flat_tax_links(&self, product_id: &str, rule_ids: &[String]) -> DbResult<()> {
        sqlx::query("DELETE FROM product_flat_taxes WHERE product_id = ?1")
            .bind(product_id)
            .execute(&self.pool)
            .await?;

        for (position, rule_id) in rule_ids.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO product_flat_taxes (product_id, rule_id, position)
                VALUES (?1, ?2, ?3)
                "#,
            )
            .bind(product_id)
            .bind(rule_id)
            .bind(position as i64)
            .execute(&self.pool)
            .await?;
        }

        Ok(())
    }
}
