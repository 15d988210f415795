//! # Storage Traits
//!
//! The register never touches SQL directly; it talks to these traits.
//! `tillpoint_db::Database` implements all of them, tests inject fakes.
//!
//! ```text
//! ┌──────────────────┐      ┌────────────────────────────────────────┐
//! │    Register      │      │  Arc<dyn RegisterStore>                │
//! │                  │─────►│  ├── Catalog       (stock, products)   │
//! │                  │      │  ├── InvoiceStore  (atomic commit)     │
//! │                  │      │  ├── LoyaltyStore  (points, tier)      │
//! │                  │      │  └── VoucherStore  (active vouchers)   │
//! └──────────────────┘      └────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use tillpoint_core::{Category, CustomerLoyalty, Invoice, Product, Voucher};
use tillpoint_db::{Database, DbResult, InvoiceDraft, InvoiceWithItems};

/// Product and stock lookups.
#[async_trait]
pub trait Catalog: Send + Sync {
    async fn product(&self, id: &str) -> DbResult<Option<Product>>;

    async fn category(&self, id: &str) -> DbResult<Option<Category>>;

    /// Units on hand; unknown products have none.
    async fn stock(&self, product_id: &str) -> DbResult<i64>;
}

/// Invoice persistence.
#[async_trait]
pub trait InvoiceStore: Send + Sync {
    /// Commits header, items, stock decrement and voucher usage atomically.
    async fn save_invoice(&self, draft: &InvoiceDraft) -> DbResult<Invoice>;

    /// Deletes an invoice and restores the stock of its items.
    async fn delete_invoice(&self, id: &str) -> DbResult<InvoiceWithItems>;
}

/// Customer points and tier.
#[async_trait]
pub trait LoyaltyStore: Send + Sync {
    async fn loyalty(&self, customer_id: &str) -> DbResult<Option<CustomerLoyalty>>;

    async fn all_loyalty(&self) -> DbResult<Vec<CustomerLoyalty>>;

    /// Writes points and tier together. `false` if the customer is gone.
    async fn set_loyalty(&self, customer_id: &str, points: i64, tier: &str) -> DbResult<bool>;
}

/// Voucher candidates for the selector.
#[async_trait]
pub trait VoucherStore: Send + Sync {
    /// Vouchers that may apply at `now`, in a stable order.
    async fn active_vouchers(&self, now: DateTime<Utc>) -> DbResult<Vec<Voucher>>;
}

/// Everything the register needs from storage.
pub trait RegisterStore: Catalog + InvoiceStore + LoyaltyStore + VoucherStore {}

impl<T> RegisterStore for T where T: Catalog + InvoiceStore + LoyaltyStore + VoucherStore {}

// =============================================================================
// SQLite implementation
// =============================================================================

#[async_trait]
impl Catalog for Database {
    async fn product(&self, id: &str) -> DbResult<Option<Product>> {
        self.products().get_by_id(id).await
    }

    async fn category(&self, id: &str) -> DbResult<Option<Category>> {
        self.categories().get_by_id(id).await
    }

    async fn stock(&self, product_id: &str) -> DbResult<i64> {
        Ok(self.products().stock(product_id).await?.unwrap_or(0))
    }
}

#[async_trait]
impl InvoiceStore for Database {
    async fn save_invoice(&self, draft: &InvoiceDraft) -> DbResult<Invoice> {
        self.invoices().save(draft).await
    }

    async fn delete_invoice(&self, id: &str) -> DbResult<InvoiceWithItems> {
        self.invoices().delete(id).await
    }
}

#[async_trait]
impl LoyaltyStore for Database {
    async fn loyalty(&self, customer_id: &str) -> DbResult<Option<CustomerLoyalty>> {
        self.customers().loyalty(customer_id).await
    }

    async fn all_loyalty(&self) -> DbResult<Vec<CustomerLoyalty>> {
        self.customers().all_loyalty().await
    }

    async fn set_loyalty(&self, customer_id: &str, points: i64, tier: &str) -> DbResult<bool> {
        self.customers().set_loyalty(customer_id, points, tier).await
    }
}

#[async_trait]
impl VoucherStore for Database {
    async fn active_vouchers(&self, now: DateTime<Utc>) -> DbResult<Vec<Voucher>> {
        self.vouchers().list_active(now).await
    }
}
