//! # Customer Repository
//!
//! Customer records and their loyalty state (`points`, `tier`).
//!
//! Loyalty columns are written only by [`CustomerRepository::set_loyalty`],
//! after a committed sale or a tier recalculation; [`CustomerRepository::update`]
//! leaves them alone.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use tillpoint_core::{Customer, CustomerLoyalty};

const COLUMNS: &str = "id, name, phone, email, address, tier, points, created_at";

#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    pub async fn insert(&self, customer: &Customer) -> DbResult<Customer> {
        debug!(name = %customer.name, "Inserting customer");

        sqlx::query(&format!(
            "INSERT INTO customers ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"
        ))
        .bind(&customer.id)
        .bind(&customer.name)
        .bind(&customer.phone)
        .bind(&customer.email)
        .bind(&customer.address)
        .bind(&customer.tier)
        .bind(customer.points)
        .bind(customer.created_at)
        .execute(&self.pool)
        .await?;

        Ok(customer.clone())
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Customer>> {
        let customer = sqlx::query_as::<_, Customer>(&format!(
            "SELECT {COLUMNS} FROM customers WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(customer)
    }

    /// All customers by name.
    pub async fn list(&self) -> DbResult<Vec<Customer>> {
        let customers = sqlx::query_as::<_, Customer>(&format!(
            "SELECT {COLUMNS} FROM customers ORDER BY name"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(customers)
    }

    /// Customers whose name or phone contains `query`.
    pub async fn search(&self, query: &str, limit: u32) -> DbResult<Vec<Customer>> {
        let pattern = format!("%{}%", query.trim());
        let customers = sqlx::query_as::<_, Customer>(&format!(
            "SELECT {COLUMNS} FROM customers WHERE name LIKE ?1 OR phone LIKE ?1 \
             ORDER BY name LIMIT ?2"
        ))
        .bind(pattern)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(customers)
    }

    /// Updates contact details.
    pub async fn update(&self, customer: &Customer) -> DbResult<()> {
        debug!(id = %customer.id, "Updating customer");

        let result = sqlx::query(
            "UPDATE customers SET name = ?2, phone = ?3, email = ?4, address = ?5 WHERE id = ?1",
        )
        .bind(&customer.id)
        .bind(&customer.name)
        .bind(&customer.phone)
        .bind(&customer.email)
        .bind(&customer.address)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Customer", &customer.id));
        }

        Ok(())
    }

    /// Deletes a customer.
    ///
    /// ## Returns
    /// * `Err(DbError::ForeignKeyViolation)` - the customer has invoices
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting customer");

        let result = sqlx::query("DELETE FROM customers WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Customer", id));
        }

        Ok(())
    }

    /// Loyalty state of one customer.
    pub async fn loyalty(&self, customer_id: &str) -> DbResult<Option<CustomerLoyalty>> {
        let loyalty = sqlx::query_as::<_, CustomerLoyalty>(
            "SELECT id AS customer_id, points, tier FROM customers WHERE id = ?1",
        )
        .bind(customer_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(loyalty)
    }

    /// Loyalty state of every customer (for tier recalculation).
    pub async fn all_loyalty(&self) -> DbResult<Vec<CustomerLoyalty>> {
        let rows = sqlx::query_as::<_, CustomerLoyalty>(
            "SELECT id AS customer_id, points, tier FROM customers ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Writes points and tier together.
    ///
    /// Returns `false` when no such customer exists.
    pub async fn set_loyalty(&self, customer_id: &str, points: i64, tier: &str) -> DbResult<bool> {
        debug!(customer_id = %customer_id, points, tier = %tier, "Setting loyalty");

        let result = sqlx::query("UPDATE customers SET points = ?2, tier = ?3 WHERE id = ?1")
            .bind(customer_id)
            .bind(points)
            .bind(tier)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM customers")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use crate::error::DbError;
    use crate::repository::test_support::{customer, test_db};

    #[tokio::test]
    async fn test_loyalty_roundtrip() {
        let db = test_db().await;
        let alice = customer(&db, "Alice").await;

        let loyalty = db.customers().loyalty(&alice.id).await.unwrap().unwrap();
        assert_eq!(loyalty.points, 0);
        assert_eq!(loyalty.tier, "Regular");

        assert!(db.customers().set_loyalty(&alice.id, 1200, "Gold").await.unwrap());
        let loyalty = db.customers().loyalty(&alice.id).await.unwrap().unwrap();
        assert_eq!(loyalty.points, 1200);
        assert_eq!(loyalty.tier, "Gold");

        assert!(!db.customers().set_loyalty("ghost", 1, "Gold").await.unwrap());
        assert!(db.customers().loyalty("ghost").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_keeps_loyalty() {
        let db = test_db().await;
        let mut bob = customer(&db, "Bob").await;
        db.customers().set_loyalty(&bob.id, 600, "Silver").await.unwrap();

        bob.email = Some("bob@example.com".to_string());
        bob.points = 0;
        db.customers().update(&bob).await.unwrap();

        let loaded = db.customers().get_by_id(&bob.id).await.unwrap().unwrap();
        assert_eq!(loaded.email.as_deref(), Some("bob@example.com"));
        assert_eq!(loaded.points, 600);
    }

    #[tokio::test]
    async fn test_search_and_list() {
        let db = test_db().await;
        customer(&db, "Carol").await;
        customer(&db, "Dave").await;

        assert_eq!(db.customers().list().await.unwrap().len(), 2);
        assert_eq!(db.customers().search("car", 10).await.unwrap().len(), 1);
        assert_eq!(db.customers().search("0900", 10).await.unwrap().len(), 2);
        assert_eq!(db.customers().all_loyalty().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_delete_missing() {
        let db = test_db().await;
        let err = db.customers().delete("nope").await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
