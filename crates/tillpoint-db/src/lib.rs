//! # tillpoint-db: Database Layer for Tillpoint
//!
//! SQLite persistence for the register, built on sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tillpoint Data Flow                              │
//! │                                                                         │
//! │  Register::checkout()                                                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   tillpoint-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories  │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │◄───│ categories     │    │  (embedded)  │  │   │
//! │  │   │               │    │ products       │    │              │  │   │
//! │  │   │ SqlitePool    │    │ customers      │    │ 001_initial  │  │   │
//! │  │   │ WAL, FKs on   │    │ vouchers       │    │  _schema.sql │  │   │
//! │  │   │               │    │ invoices       │    │              │  │   │
//! │  │   │               │    │ reports        │    │              │  │   │
//! │  │   └───────────────┘    └────────────────┘    └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite file in the platform data directory                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tillpoint_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("tillpoint.db")).await?;
//! let vouchers = db.vouchers().list_active(Utc::now()).await?;
//! let invoice = db.invoices().save(&draft).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::{
    CategoryRepository, CustomerRepository, CustomerSpend, DailyRevenue, InvoiceDraft,
    InvoiceRepository, InvoiceWithItems, ProductRepository, ProductSales, ReportRepository,
    SupplierRepository, VoucherRepository,
};
