//! # Tillpoint Register
//!
//! Orchestration layer of the point-of-sale back end: holds the cart and
//! the loyalty tier policy, prices sales with `tillpoint-core` and commits
//! them through the storage traits implemented by `tillpoint-db`.
//!
//! ## Module Organization
//! ```text
//! tillpoint_register/
//! ├── lib.rs          ◄─── You are here (startup helpers)
//! ├── config.rs       ◄─── register.toml + TILLPOINT_* overrides
//! ├── settings.rs     ◄─── tier_settings.json, payment_settings.json
//! ├── store.rs        ◄─── storage traits (Catalog, InvoiceStore, ...)
//! ├── state.rs        ◄─── CartState, TierPolicyState
//! ├── events.rs       ◄─── broadcast of committed/deleted invoices
//! ├── register.rs     ◄─── Register service (cart, quote, checkout)
//! ├── payment.rs      ◄─── bank transfer request payload
//! ├── dashboard.rs    ◄─── summary + refresher task
//! └── error.rs        ◄─── RegisterError { code, message, retryable }
//! ```
//!
//! ## Startup Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. Initialize Logging ─── tracing-subscriber, RUST_LOG or default      │
//! │  2. Load Config ────────── register.toml, env overrides, fallback       │
//! │  3. Connect Database ───── SQLite (WAL), embedded migrations            │
//! │  4. Load Tier Policy ───── tier_settings.json or default tiers          │
//! │  5. Build Register ─────── empty cart, event bus                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod dashboard;
pub mod error;
pub mod events;
pub mod payment;
pub mod register;
pub mod settings;
pub mod state;
pub mod store;

use std::sync::Arc;

use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

use tillpoint_db::{Database, DbConfig};

pub use config::{ConfigError, RegisterConfig};
pub use error::{ErrorCode, RegisterError, RegisterResult};
pub use events::{EventBus, RegisterEvent};
pub use register::{CheckoutReceipt, Quote, Register};
pub use settings::{JsonSettings, PaymentSettings, TierPolicyStore};

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=tillpoint_db=trace` - Trace the database layer only
/// - Default: INFO, DEBUG for tillpoint crates
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tillpoint=debug,sqlx=warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_max_level(Level::TRACE)
        .try_init();
}

/// Opens the configured database, running pending migrations.
pub async fn open_database(config: &RegisterConfig) -> RegisterResult<Database> {
    let path = config.database_path()?;
    info!(?path, "Database path determined");

    let db = Database::new(DbConfig::new(path).max_connections(config.database.max_connections)).await?;
    info!("Database connected and migrations applied");
    Ok(db)
}

/// Builds a register over `db` with settings from the configured folder.
pub fn build_register(config: &RegisterConfig, db: Database) -> RegisterResult<(Register, JsonSettings)> {
    let settings = JsonSettings::new(config.settings_dir()?);
    let register = Register::new(
        Arc::new(db),
        Arc::new(settings.clone()),
        config.terminal.employee_id.clone(),
    );
    info!(
        terminal = %config.terminal.id,
        tiers = register.tier_policy().tiers().len(),
        "Register ready"
    );
    Ok((register, settings))
}
