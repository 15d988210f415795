//! # Tillpoint Register Admin Entry Point
//!
//! Boots the register stack the way a till does, brings every customer's
//! tier in line with the stored policy and prints the dashboard.
//!
//! ## Usage
//! ```bash
//! # Uses register.toml from the platform config dir, or defaults
//! cargo run -p tillpoint-register
//!
//! # Point at a specific config file
//! cargo run -p tillpoint-register -- --config ./register.toml
//! ```

use std::path::PathBuf;

use chrono::Utc;
use tracing::{error, info};

use tillpoint_register::dashboard::DashboardSummary;
use tillpoint_register::{build_register, init_tracing, open_database, RegisterConfig, RegisterResult};

#[tokio::main]
async fn main() {
    init_tracing();
    info!("Starting Tillpoint register admin");

    if let Err(e) = run(config_path_arg()).await {
        error!(code = ?e.code, "{}", e.message);
        std::process::exit(1);
    }
}

async fn run(config_path: Option<PathBuf>) -> RegisterResult<()> {
    let config = RegisterConfig::load_or_default(config_path);
    let db = open_database(&config).await?;
    let (register, settings) = build_register(&config, db.clone())?;

    let updated = register.recalculate_tiers().await?;
    println!("{}", config.store.name);
    println!("{}", "=".repeat(config.store.name.chars().count()));
    println!("Customer tiers updated: {}", updated);

    let payment = settings.load_payment_or_default();
    println!(
        "Bank transfer: {}",
        match (payment.enable_transfer, payment.is_configured()) {
            (false, _) => "disabled",
            (true, false) => "enabled, bank details missing",
            (true, true) => "ready",
        }
    );
    println!();

    let summary = DashboardSummary::load(&db, &config.reports, Utc::now()).await?;
    let money = |m| config.currency.format(m);

    println!("Today: {} invoices, {}", summary.invoices_today, money(summary.revenue_today));

    println!();
    println!("Last 7 days:");
    for day in &summary.revenue_by_day {
        println!("  {}  {:>4}  {:>16}", day.day, day.invoice_count, money(day.revenue()));
    }

    println!();
    println!("Top products:");
    for p in &summary.top_products {
        println!("  {:<32} {:>6}", p.product_name, p.quantity);
    }

    println!();
    println!("Top customers:");
    for c in &summary.top_customers {
        println!("  {:<32} {:>16}", c.name, money(tillpoint_core::Money::from_cents(c.spent_cents)));
    }

    println!();
    println!("Low stock (< {}):", config.reports.low_stock_threshold);
    for p in &summary.low_stock {
        println!("  {:<12} {:<32} {:>4}", p.code, p.name, p.stock_quantity);
    }

    db.close().await;
    Ok(())
}

/// `--config <PATH>` / `-c <PATH>`.
fn config_path_arg() -> Option<PathBuf> {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" || arg == "-c" {
            return args.next().map(PathBuf::from);
        }
    }
    None
}
