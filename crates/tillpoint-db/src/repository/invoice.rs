//! # Invoice Repository
//!
//! Atomic invoice commit and deletion, plus invoice history.
//!
//! ## Commit Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN                                                                  │
//! │   1. next invoice number for the day     INV-20261019-0007              │
//! │   2. INSERT invoices (totals, paid, change, voucher_code)               │
//! │   3. for each line:                                                     │
//! │        INSERT invoice_items                                             │
//! │        UPDATE products SET stock = stock - qty                          │
//! │          WHERE id = ? AND stock >= qty    ── 0 rows? InsufficientStock  │
//! │   4. UPDATE vouchers SET used_count = used_count + 1                    │
//! │        WHERE code = ? AND still redeemable ── 0 rows? VoucherUnavailable│
//! │  COMMIT                                                                 │
//! │                                                                         │
//! │  Any failure drops the transaction: nothing from steps 1-4 persists.    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Committed invoices are immutable. Deleting one restores the stock of
//! every line in a single transaction.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::new_id;
use tillpoint_core::{Invoice, InvoiceItem, InvoiceLine, InvoiceTotals, Settlement};

const INVOICE_COLUMNS: &str = "id, invoice_number, customer_id, employee_id, subtotal_cents, \
                               tax_cents, discount_cents, total_cents, paid_cents, change_cents, \
                               voucher_code, created_at";

const ITEM_COLUMNS: &str = "id, invoice_id, product_id, product_name, unit_price_cents, \
                            quantity, tax_rate_bps, line_total_cents";

/// Everything needed to commit an invoice.
#[derive(Debug, Clone)]
pub struct InvoiceDraft {
    pub customer_id: String,
    pub employee_id: String,
    pub lines: Vec<InvoiceLine>,
    pub totals: InvoiceTotals,
    pub settlement: Settlement,

    /// Code of the voucher counted in `totals.voucher_discount`.
    pub voucher_code: Option<String>,

    pub created_at: DateTime<Utc>,
}

/// An invoice header with its line items.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvoiceWithItems {
    pub invoice: Invoice,
    pub items: Vec<InvoiceItem>,
}

#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    pool: SqlitePool,
}

impl InvoiceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        InvoiceRepository { pool }
    }

    /// Commits an invoice: header, items, stock decrement and voucher usage
    /// in one transaction.
    ///
    /// ## Returns
    /// * `Ok(Invoice)` - the committed header
    /// * `Err(DbError::InsufficientStock)` - a line exceeds current stock
    /// * `Err(DbError::VoucherUnavailable)` - the voucher was used up meanwhile
    /// * `Err(DbError::ForeignKeyViolation)` - unknown customer or product
    pub async fn save(&self, draft: &InvoiceDraft) -> DbResult<Invoice> {
        debug!(
            customer_id = %draft.customer_id,
            lines = draft.lines.len(),
            total = %draft.totals.total,
            "Committing invoice"
        );

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        let invoice = Invoice {
            id: new_id(),
            invoice_number: next_invoice_number(&mut tx, draft.created_at).await?,
            customer_id: draft.customer_id.clone(),
            employee_id: draft.employee_id.clone(),
            subtotal_cents: draft.totals.subtotal.cents(),
            tax_cents: draft.totals.tax.cents(),
            discount_cents: draft.totals.discount.cents(),
            total_cents: draft.totals.total.cents(),
            paid_cents: draft.settlement.paid.cents(),
            change_cents: draft.settlement.change.cents(),
            voucher_code: draft.voucher_code.clone(),
            created_at: draft.created_at,
        };

        sqlx::query(&format!(
            "INSERT INTO invoices ({INVOICE_COLUMNS}) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"
        ))
        .bind(&invoice.id)
        .bind(&invoice.invoice_number)
        .bind(&invoice.customer_id)
        .bind(&invoice.employee_id)
        .bind(invoice.subtotal_cents)
        .bind(invoice.tax_cents)
        .bind(invoice.discount_cents)
        .bind(invoice.total_cents)
        .bind(invoice.paid_cents)
        .bind(invoice.change_cents)
        .bind(&invoice.voucher_code)
        .bind(invoice.created_at)
        .execute(&mut *tx)
        .await?;

        for line in &draft.lines {
            sqlx::query(&format!(
                "INSERT INTO invoice_items ({ITEM_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"
            ))
            .bind(new_id())
            .bind(&invoice.id)
            .bind(&line.product_id)
            .bind(&line.product_name)
            .bind(line.unit_price.cents())
            .bind(line.quantity)
            .bind(line.tax_rate.bps())
            .bind(line.line_total().cents())
            .execute(&mut *tx)
            .await?;

            let decremented = sqlx::query(
                "UPDATE products SET stock_quantity = stock_quantity - ?2, updated_at = ?3 \
                 WHERE id = ?1 AND stock_quantity >= ?2",
            )
            .bind(&line.product_id)
            .bind(line.quantity)
            .bind(draft.created_at)
            .execute(&mut *tx)
            .await?;

            if decremented.rows_affected() == 0 {
                let available: Option<i64> =
                    sqlx::query_scalar("SELECT stock_quantity FROM products WHERE id = ?1")
                        .bind(&line.product_id)
                        .fetch_optional(&mut *tx)
                        .await?;

                // Returning drops `tx`, which rolls back
                return Err(match available {
                    Some(available) => DbError::InsufficientStock {
                        product_id: line.product_id.clone(),
                        available,
                        requested: line.quantity,
                    },
                    None => DbError::not_found("Product", &line.product_id),
                });
            }
        }

        if let Some(code) = &draft.voucher_code {
            let redeemed = sqlx::query(
                "UPDATE vouchers SET used_count = used_count + 1 \
                 WHERE code = ?1 AND is_active = 1 \
                   AND starts_at <= ?2 AND ends_at >= ?2 \
                   AND (usage_limit = 0 OR used_count < usage_limit)",
            )
            .bind(code)
            .bind(draft.created_at)
            .execute(&mut *tx)
            .await?;

            if redeemed.rows_affected() == 0 {
                return Err(DbError::VoucherUnavailable { code: code.clone() });
            }
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        info!(
            invoice_id = %invoice.id,
            invoice_number = %invoice.invoice_number,
            total = %invoice.total(),
            "Invoice committed"
        );

        Ok(invoice)
    }

    /// Deletes an invoice and puts its quantities back into stock.
    ///
    /// Voucher usage is not refunded.
    pub async fn delete(&self, id: &str) -> DbResult<InvoiceWithItems> {
        debug!(id = %id, "Deleting invoice");

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DbError::not_found("Invoice", id))?;

        let items = fetch_items(&mut tx, id).await?;
        let now = Utc::now();

        for item in &items {
            sqlx::query(
                "UPDATE products SET stock_quantity = stock_quantity + ?2, updated_at = ?3 WHERE id = ?1",
            )
            .bind(&item.product_id)
            .bind(item.quantity)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("DELETE FROM invoice_items WHERE invoice_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM invoices WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        info!(invoice_id = %id, restored_lines = items.len(), "Invoice deleted");
        Ok(InvoiceWithItems { invoice, items })
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Invoice>> {
        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(invoice)
    }

    pub async fn items(&self, invoice_id: &str) -> DbResult<Vec<InvoiceItem>> {
        let mut conn = self.pool.acquire().await?;
        fetch_items(&mut conn, invoice_id).await
    }

    pub async fn get_with_items(&self, id: &str) -> DbResult<Option<InvoiceWithItems>> {
        let Some(invoice) = self.get_by_id(id).await? else {
            return Ok(None);
        };
        let items = self.items(id).await?;
        Ok(Some(InvoiceWithItems { invoice, items }))
    }

    /// Invoices with `from <= created_at < to`, newest first.
    pub async fn list_between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> DbResult<Vec<Invoice>> {
        let invoices = sqlx::query_as::<_, Invoice>(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices \
             WHERE created_at >= ?1 AND created_at < ?2 ORDER BY created_at DESC"
        ))
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(invoices)
    }

    /// A customer's invoices, newest first.
    pub async fn list_for_customer(&self, customer_id: &str) -> DbResult<Vec<Invoice>> {
        let invoices = sqlx::query_as::<_, Invoice>(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE customer_id = ?1 ORDER BY created_at DESC"
        ))
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(invoices)
    }
}

async fn fetch_items(conn: &mut SqliteConnection, invoice_id: &str) -> DbResult<Vec<InvoiceItem>> {
    let items = sqlx::query_as::<_, InvoiceItem>(&format!(
        "SELECT {ITEM_COLUMNS} FROM invoice_items WHERE invoice_id = ?1 ORDER BY rowid"
    ))
    .bind(invoice_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(items)
}

/// `INV-<yyyymmdd>-<seq>`, one past the highest number used that day.
async fn next_invoice_number(conn: &mut SqliteConnection, at: DateTime<Utc>) -> DbResult<String> {
    let prefix = format!("INV-{}-", at.format("%Y%m%d"));
    let last: i64 = sqlx::query_scalar(
        "SELECT COALESCE(MAX(CAST(substr(invoice_number, ?2) AS INTEGER)), 0) \
         FROM invoices WHERE invoice_number LIKE ?1",
    )
    .bind(format!("{prefix}%"))
    .bind(prefix.len() as i64 + 1)
    .fetch_one(&mut *conn)
    .await?;

    Ok(format!("{}{:04}", prefix, last + 1))
}
