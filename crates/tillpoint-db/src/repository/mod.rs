//! # Repository Module
//!
//! Database repository implementations for Tillpoint.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Register service                                                      │
//! │       │                                                                 │
//! │       │  db.invoices().save(&draft)                                    │
//! │       ▼                                                                 │
//! │  InvoiceRepository                                                     │
//! │  ├── save(&self, draft)        header + items + stock + voucher (1 tx) │
//! │  ├── delete(&self, id)         restore stock (1 tx)                    │
//! │  └── get_with_items(&self, id)                                         │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`CategoryRepository`] - Category CRUD
//! - [`ProductRepository`] - Product CRUD, search and stock
//! - [`SupplierRepository`] - Supplier CRUD
//! - [`CustomerRepository`] - Customer CRUD and loyalty state
//! - [`VoucherRepository`] - Voucher CRUD and active list
//! - [`InvoiceRepository`] - Atomic invoice commit, history and deletion
//! - [`ReportRepository`] - Revenue and ranking queries

pub mod category;
pub mod customer;
pub mod invoice;
pub mod product;
pub mod report;
pub mod supplier;
pub mod voucher;

pub use category::CategoryRepository;
pub use customer::CustomerRepository;
pub use invoice::{InvoiceDraft, InvoiceRepository, InvoiceWithItems};
pub use product::ProductRepository;
pub use report::{CustomerSpend, DailyRevenue, ProductSales, ReportRepository};
pub use supplier::SupplierRepository;
pub use voucher::VoucherRepository;

/// Generates a new entity ID.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
