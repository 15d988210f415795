//! # Report Repository
//!
//! Read-only aggregate queries for the dashboard and sales reports.
//!
//! All ranges are half-open: `from <= created_at < to`.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::SqlitePool;

use crate::error::DbResult;
use tillpoint_core::{Money, Product};

/// Revenue for one calendar day (UTC).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct DailyRevenue {
    pub day: NaiveDate,
    pub invoice_count: i64,
    pub revenue_cents: i64,
}

impl DailyRevenue {
    pub fn revenue(&self) -> Money {
        Money::from_cents(self.revenue_cents)
    }
}

/// Units and revenue for a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct ProductSales {
    pub product_id: String,
    pub product_name: String,
    pub quantity: i64,
    pub revenue_cents: i64,
}

/// Total spend of a customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct CustomerSpend {
    pub customer_id: String,
    pub name: String,
    pub invoice_count: i64,
    pub spent_cents: i64,
}

#[derive(Debug, Clone)]
pub struct ReportRepository {
    pool: SqlitePool,
}

impl ReportRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ReportRepository { pool }
    }

    /// Sum of invoice totals in the range.
    pub async fn revenue_between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> DbResult<Money> {
        let cents: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(total_cents), 0) FROM invoices \
             WHERE created_at >= ?1 AND created_at < ?2",
        )
        .bind(from)
        .bind(to)
        .fetch_one(&self.pool)
        .await?;

        Ok(Money::from_cents(cents))
    }

    pub async fn invoice_count_between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM invoices WHERE created_at >= ?1 AND created_at < ?2",
        )
        .bind(from)
        .bind(to)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// Revenue per day, oldest first. Days without invoices are omitted.
    pub async fn revenue_by_day(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> DbResult<Vec<DailyRevenue>> {
        let rows = sqlx::query_as::<_, DailyRevenue>(
            r#"
            SELECT substr(created_at, 1, 10) AS day,
                   COUNT(*) AS invoice_count,
                   COALESCE(SUM(total_cents), 0) AS revenue_cents
            FROM invoices
            WHERE created_at >= ?1 AND created_at < ?2
            GROUP BY day
            ORDER BY day
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Best sellers by quantity.
    pub async fn top_products(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        limit: u32,
    ) -> DbResult<Vec<ProductSales>> {
        let rows = sqlx::query_as::<_, ProductSales>(
            r#"
            SELECT ii.product_id AS product_id,
                   MAX(ii.product_name) AS product_name,
                   SUM(ii.quantity) AS quantity,
                   SUM(ii.line_total_cents) AS revenue_cents
            FROM invoice_items ii
            JOIN invoices i ON i.id = ii.invoice_id
            WHERE i.created_at >= ?1 AND i.created_at < ?2
            GROUP BY ii.product_id
            ORDER BY quantity DESC, revenue_cents DESC
            LIMIT ?3
            "#,
        )
        .bind(from)
        .bind(to)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Biggest spenders by invoice total.
    pub async fn top_customers(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        limit: u32,
    ) -> DbResult<Vec<CustomerSpend>> {
        let rows = sqlx::query_as::<_, CustomerSpend>(
            r#"
            SELECT c.id AS customer_id,
                   c.name AS name,
                   COUNT(i.id) AS invoice_count,
                   SUM(i.total_cents) AS spent_cents
            FROM invoices i
            JOIN customers c ON c.id = i.customer_id
            WHERE i.created_at >= ?1 AND i.created_at < ?2
            GROUP BY c.id
            ORDER BY spent_cents DESC
            LIMIT ?3
            "#,
        )
        .bind(from)
        .bind(to)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Active products with `stock_quantity < threshold`, lowest first.
    pub async fn low_stock(&self, threshold: i64) -> DbResult<Vec<Product>> {
        let rows = sqlx::query_as::<_, Product>(
            "SELECT id, code, name, category_id, supplier_id, price_cents, promo_bps, promo_starts_at, \
                    promo_ends_at, stock_quantity, is_active, created_at, updated_at \
             FROM products WHERE is_active = 1 AND stock_quantity < ?1 \
             ORDER BY stock_quantity, name",
        )
        .bind(threshold)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use tillpoint_core::pricing::{calculate, Adjustments};
    use tillpoint_core::{InvoiceLine, Money, Percent};

    use crate::pool::Database;
    use crate::repository::test_support::{customer, product, test_db};
    use crate::repository::InvoiceDraft;

    async fn sell(db: &Database, customer_id: &str, lines: Vec<InvoiceLine>) {
        let now = Utc::now();
        let totals = calculate(&lines, &Adjustments::none(now));
        let draft = InvoiceDraft {
            customer_id: customer_id.to_string(),
            employee_id: "emp-1".to_string(),
            settlement: totals.settle(totals.total),
            totals,
            lines,
            voucher_code: None,
            created_at: now,
        };
        db.invoices().save(&draft).await.unwrap();
    }

    #[tokio::test]
    async fn test_reports() {
        let db = test_db().await;
        let alice = customer(&db, "Alice").await;
        let bob = customer(&db, "Bob").await;
        let cup = product(&db, "CUP", 10_00, 50).await;
        let pot = product(&db, "POT", 90_00, 12).await;

        sell(&db, &alice.id, vec![InvoiceLine::new(&cup.id, &cup.name, cup.price(), 5, Percent::zero())]).await;
        sell(&db, &bob.id, vec![InvoiceLine::new(&pot.id, &pot.name, pot.price(), 3, Percent::zero())]).await;

        let now = Utc::now();
        let (from, to) = (now - Duration::hours(1), now + Duration::hours(1));
        let reports = db.reports();

        assert_eq!(reports.revenue_between(from, to).await.unwrap(), Money::from_cents(320_00));
        assert_eq!(reports.invoice_count_between(from, to).await.unwrap(), 2);

        let days = reports.revenue_by_day(from, to).await.unwrap();
        assert_eq!(days.iter().map(|d| d.invoice_count).sum::<i64>(), 2);
        assert_eq!(days.iter().map(|d| d.revenue()).sum::<Money>(), Money::from_cents(320_00));

        let products = reports.top_products(from, to, 10).await.unwrap();
        assert_eq!(products[0].product_id, cup.id);
        assert_eq!(products[0].quantity, 5);

        let customers = reports.top_customers(from, to, 1).await.unwrap();
        assert_eq!(customers.len(), 1);
        assert_eq!(customers[0].name, "Bob");
        assert_eq!(customers[0].spent_cents, 270_00);

        let low = reports.low_stock(10).await.unwrap();
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].code, "POT");
        assert_eq!(low[0].stock_quantity, 9);
    }

    #[tokio::test]
    async fn test_empty_range() {
        let db = test_db().await;
        let now = Utc::now();
        let reports = db.reports();
        assert_eq!(
            reports.revenue_between(now - Duration::days(1), now).await.unwrap(),
            Money::zero()
        );
        assert!(reports.revenue_by_day(now - Duration::days(1), now).await.unwrap().is_empty());
    }
}
