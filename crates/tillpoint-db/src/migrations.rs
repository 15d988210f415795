//! # Database Migrations
//!
//! Embedded SQL migrations for Tillpoint.
//!
//! ```text
//! migrations/sqlite/
//! └── 001_initial_schema.sql   categories, products, customers,
//!                              vouchers, invoices, invoice_items
//! ```
//!
//! The `sqlx::migrate!()` macro embeds every file at compile time and
//! `_sqlx_migrations` records what has been applied, so running them on
//! every start is safe. Existing migrations are never edited; schema
//! changes go into a new `NNN_description.sql` file.

use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::DbResult;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Applies all pending migrations in filename order.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    debug!(embedded = MIGRATOR.migrations.len(), "Checking for pending migrations");
    MIGRATOR.run(pool).await?;
    info!("All migrations applied successfully");
    Ok(())
}

/// Returns `(embedded, applied)` migration counts for diagnostics.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<(usize, usize)> {
    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1")
        .fetch_one(pool)
        .await?;

    Ok((MIGRATOR.migrations.len(), applied as usize))
}
