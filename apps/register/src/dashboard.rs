//! # Dashboard
//!
//! Today's numbers, the last week's revenue, best sellers, best customers
//! and what needs restocking.
//!
//! The summary is rebuilt whenever the register reports a change:
//!
//! ```text
//! Register ──► EventBus ──► refresher task ──► ReportRepository
//!                                 │
//!                                 ▼
//!                     watch::Receiver<DashboardSummary>  ◄── screens
//! ```

use chrono::{DateTime, Duration, NaiveTime, Utc};
use serde::Serialize;
use tokio::sync::{broadcast, watch};
use tracing::{debug, warn};

use tillpoint_core::{Money, Product};
use tillpoint_db::{CustomerSpend, DailyRevenue, Database, DbResult, ProductSales};

use crate::config::ReportConfig;
use crate::events::RegisterEvent;

/// Days shown in the revenue chart, today included.
const REVENUE_DAYS: i64 = 7;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub generated_at: DateTime<Utc>,
    pub revenue_today: Money,
    pub invoices_today: i64,
    pub revenue_by_day: Vec<DailyRevenue>,
    pub top_products: Vec<ProductSales>,
    pub top_customers: Vec<CustomerSpend>,
    pub low_stock: Vec<Product>,
}

impl DashboardSummary {
    /// Builds the summary for the UTC day containing `now`.
    pub async fn load(db: &Database, config: &ReportConfig, now: DateTime<Utc>) -> DbResult<Self> {
        let today = now.date_naive().and_time(NaiveTime::MIN).and_utc();
        let tomorrow = today + Duration::days(1);
        let week_start = tomorrow - Duration::days(REVENUE_DAYS);
        let reports = db.reports();

        Ok(DashboardSummary {
            generated_at: now,
            revenue_today: reports.revenue_between(today, tomorrow).await?,
            invoices_today: reports.invoice_count_between(today, tomorrow).await?,
            revenue_by_day: reports.revenue_by_day(week_start, tomorrow).await?,
            top_products: reports.top_products(week_start, tomorrow, config.top_n).await?,
            top_customers: reports.top_customers(week_start, tomorrow, config.top_n).await?,
            low_stock: reports.low_stock(config.low_stock_threshold).await?,
        })
    }
}

/// Keeps a summary current by rebuilding it after every register event.
///
/// The task ends when the register's event bus or every receiver is gone.
pub fn spawn_refresher(
    db: Database,
    config: ReportConfig,
    mut events: broadcast::Receiver<RegisterEvent>,
    initial: DashboardSummary,
) -> watch::Receiver<DashboardSummary> {
    let (tx, rx) = watch::channel(initial);

    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => break,
            }

            match DashboardSummary::load(&db, &config, Utc::now()).await {
                Ok(summary) => {
                    debug!(invoices_today = summary.invoices_today, "Dashboard refreshed");
                    if tx.send(summary).is_err() {
                        break;
                    }
                }
                Err(e) => warn!("Dashboard refresh failed: {}", e),
            }
        }
    });

    rx
}
