//! # Product Repository
//!
//! Database operations for products.
//!
//! ## Key Operations
//! - CRUD operations (delete is a soft delete)
//! - Name / code search
//! - Stock lookup and adjustment
//!
//! ## Stock Updates
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ❌ WRONG: read-modify-write                                            │
//! │     stock = SELECT stock_quantity ...; UPDATE ... SET stock = 7         │
//! │                                                                         │
//! │  ✅ CORRECT: delta with a guard, in one statement                       │
//! │     UPDATE products SET stock_quantity = stock_quantity + ?2            │
//! │     WHERE id = ?1 AND stock_quantity + ?2 >= 0                          │
//! │                                                                         │
//! │  Two registers selling the last unit cannot both succeed.               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//! Sales go through [`crate::InvoiceRepository::save`], which applies the
//! same guard inside the invoice transaction.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use tillpoint_core::Product;

const COLUMNS: &str = "id, code, name, category_id, supplier_id, price_cents, promo_bps, \
                       promo_starts_at, promo_ends_at, stock_quantity, is_active, \
                       created_at, updated_at";

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
/// let hits = repo.search("coffee", 20).await?;
/// let stock = repo.stock(&hits[0].id).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Searches active products by code or name (case-insensitive substring).
    ///
    /// An empty query lists active products by name.
    pub async fn search(&self, query: &str, limit: u32) -> DbResult<Vec<Product>> {
        let query = query.trim();
        debug!(query = %query, limit = %limit, "Searching products");

        let pattern = format!("%{}%", query.replace('%', "").replace('_', ""));
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {COLUMNS} FROM products \
             WHERE is_active = 1 AND (code LIKE ?1 OR name LIKE ?1) \
             ORDER BY name LIMIT ?2"
        ))
        .bind(pattern)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        debug!(count = products.len(), "Search complete");
        Ok(products)
    }

    /// Active products in a category.
    pub async fn list_by_category(&self, category_id: &str) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {COLUMNS} FROM products WHERE is_active = 1 AND category_id = ?1 ORDER BY name"
        ))
        .bind(category_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Active products bought from a supplier.
    pub async fn list_by_supplier(&self, supplier_id: &str) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {COLUMNS} FROM products WHERE is_active = 1 AND supplier_id = ?1 ORDER BY name"
        ))
        .bind(supplier_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Gets a product by ID, including soft-deleted ones.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {COLUMNS} FROM products WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Gets an active product by its code.
    pub async fn get_by_code(&self, code: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {COLUMNS} FROM products WHERE code = ?1 AND is_active = 1"
        ))
        .bind(code.trim())
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Inserts a new product.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - code already exists
    /// * `Err(DbError::ForeignKeyViolation)` - unknown category
    pub async fn insert(&self, product: &Product) -> DbResult<Product> {
        debug!(code = %product.code, "Inserting product");

        sqlx::query(&format!(
            "INSERT INTO products ({COLUMNS}) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"
        ))
        .bind(&product.id)
        .bind(&product.code)
        .bind(&product.name)
        .bind(&product.category_id)
        .bind(&product.supplier_id)
        .bind(product.price_cents)
        .bind(product.promo_bps)
        .bind(product.promo_starts_at)
        .bind(product.promo_ends_at)
        .bind(product.stock_quantity)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => DbError::duplicate(field, &product.code),
            other => other,
        })?;

        Ok(product.clone())
    }

    /// Updates every editable field of a product, stock included.
    pub async fn update(&self, product: &Product) -> DbResult<()> {
        debug!(id = %product.id, "Updating product");

        let result = sqlx::query(
            r#"
            UPDATE products SET
                code = ?2,
                name = ?3,
                category_id = ?4,
                supplier_id = ?5,
                price_cents = ?6,
                promo_bps = ?7,
                promo_starts_at = ?8,
                promo_ends_at = ?9,
                stock_quantity = ?10,
                is_active = ?11,
                updated_at = ?12
            WHERE id = ?1
            "#,
        )
        .bind(&product.id)
        .bind(&product.code)
        .bind(&product.name)
        .bind(&product.category_id)
        .bind(&product.supplier_id)
        .bind(product.price_cents)
        .bind(product.promo_bps)
        .bind(product.promo_starts_at)
        .bind(product.promo_ends_at)
        .bind(product.stock_quantity)
        .bind(product.is_active)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", &product.id));
        }

        Ok(())
    }

    /// Current stock of a product, `None` if it doesn't exist.
    pub async fn stock(&self, id: &str) -> DbResult<Option<i64>> {
        let stock: Option<i64> =
            sqlx::query_scalar("SELECT stock_quantity FROM products WHERE id = ?1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(stock)
    }

    /// Adds `delta` to stock (negative to remove), never going below zero.
    ///
    /// ## Returns
    /// * `Err(DbError::InsufficientStock)` - the delta would go negative
    pub async fn adjust_stock(&self, id: &str, delta: i64) -> DbResult<i64> {
        debug!(id = %id, delta = %delta, "Adjusting stock");

        let updated: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE products
            SET stock_quantity = stock_quantity + ?2, updated_at = ?3
            WHERE id = ?1 AND stock_quantity + ?2 >= 0
            RETURNING stock_quantity
            "#,
        )
        .bind(id)
        .bind(delta)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        match updated {
            Some(stock) => Ok(stock),
            None => match self.stock(id).await? {
                Some(available) => Err(DbError::InsufficientStock {
                    product_id: id.to_string(),
                    available,
                    requested: -delta,
                }),
                None => Err(DbError::not_found("Product", id)),
            },
        }
    }

    /// Soft-deletes a product.
    ///
    /// Past invoices still reference it, so the row stays.
    pub async fn soft_delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Soft-deleting product");

        let result = sqlx::query("UPDATE products SET is_active = 0, updated_at = ?2 WHERE id = ?1")
            .bind(id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Counts active products.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
