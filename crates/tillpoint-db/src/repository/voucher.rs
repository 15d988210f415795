//! # Voucher Repository
//!
//! Voucher CRUD plus the candidate list handed to the voucher selector.
//! Usage counting happens inside the invoice transaction, see
//! [`crate::InvoiceRepository::save`].

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use tillpoint_core::Voucher;

const COLUMNS: &str = "id, code, discount_kind, discount_value, min_invoice_cents, \
                       starts_at, ends_at, usage_limit, used_count, is_active, created_at";

#[derive(Debug, Clone)]
pub struct VoucherRepository {
    pool: SqlitePool,
}

impl VoucherRepository {
    pub fn new(pool: SqlitePool) -> Self {
        VoucherRepository { pool }
    }

    /// Inserts a voucher.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - code already exists
    pub async fn insert(&self, voucher: &Voucher) -> DbResult<Voucher> {
        debug!(code = %voucher.code, "Inserting voucher");

        sqlx::query(&format!(
            "INSERT INTO vouchers ({COLUMNS}) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
        ))
        .bind(&voucher.id)
        .bind(&voucher.code)
        .bind(voucher.discount_kind)
        .bind(voucher.discount_value)
        .bind(voucher.min_invoice_cents)
        .bind(voucher.starts_at)
        .bind(voucher.ends_at)
        .bind(voucher.usage_limit)
        .bind(voucher.used_count)
        .bind(voucher.is_active)
        .bind(voucher.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => DbError::duplicate(field, &voucher.code),
            other => other,
        })?;

        Ok(voucher.clone())
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Voucher>> {
        let voucher = sqlx::query_as::<_, Voucher>(&format!(
            "SELECT {COLUMNS} FROM vouchers WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(voucher)
    }

    pub async fn get_by_code(&self, code: &str) -> DbResult<Option<Voucher>> {
        let voucher = sqlx::query_as::<_, Voucher>(&format!(
            "SELECT {COLUMNS} FROM vouchers WHERE code = ?1"
        ))
        .bind(code.trim())
        .fetch_optional(&self.pool)
        .await?;

        Ok(voucher)
    }

    /// Every voucher, newest first.
    pub async fn list(&self) -> DbResult<Vec<Voucher>> {
        let vouchers = sqlx::query_as::<_, Voucher>(&format!(
            "SELECT {COLUMNS} FROM vouchers ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(vouchers)
    }

    /// Vouchers that are active, inside their window at `now` and not used up.
    ///
    /// Ordered by creation so the selector's "first wins" tie-break is stable.
    pub async fn list_active(&self, now: DateTime<Utc>) -> DbResult<Vec<Voucher>> {
        let vouchers = sqlx::query_as::<_, Voucher>(&format!(
            "SELECT {COLUMNS} FROM vouchers \
             WHERE is_active = 1 AND starts_at <= ?1 AND ends_at >= ?1 \
               AND (usage_limit = 0 OR used_count < usage_limit) \
             ORDER BY created_at, code"
        ))
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        Ok(vouchers)
    }

    /// Updates the voucher definition. `used_count` is not touched.
    pub async fn update(&self, voucher: &Voucher) -> DbResult<()> {
        debug!(id = %voucher.id, "Updating voucher");

        let result = sqlx::query(
            r#"
            UPDATE vouchers SET
                code = ?2,
                discount_kind = ?3,
                discount_value = ?4,
                min_invoice_cents = ?5,
                starts_at = ?6,
                ends_at = ?7,
                usage_limit = ?8,
                is_active = ?9
            WHERE id = ?1
            "#,
        )
        .bind(&voucher.id)
        .bind(&voucher.code)
        .bind(voucher.discount_kind)
        .bind(voucher.discount_value)
        .bind(voucher.min_invoice_cents)
        .bind(voucher.starts_at)
        .bind(voucher.ends_at)
        .bind(voucher.usage_limit)
        .bind(voucher.is_active)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Voucher", &voucher.id));
        }

        Ok(())
    }

    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting voucher");

        let result = sqlx::query("DELETE FROM vouchers WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Voucher", id));
        }

        Ok(())
    }
}
