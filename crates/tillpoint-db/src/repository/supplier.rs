//! # Supplier Repository
//!
//! Where stock is bought from. Products point at their supplier; removing
//! a supplier leaves its products in the catalog without one.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use tillpoint_core::Supplier;

const COLUMNS: &str = "id, name, contact_name, phone, email, address, created_at";

#[derive(Debug, Clone)]
pub struct SupplierRepository {
    pool: SqlitePool,
}

impl SupplierRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SupplierRepository { pool }
    }

    pub async fn insert(&self, supplier: &Supplier) -> DbResult<Supplier> {
        debug!(name = %supplier.name, "Inserting supplier");

        sqlx::query(&format!(
            "INSERT INTO suppliers ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"
        ))
        .bind(&supplier.id)
        .bind(&supplier.name)
        .bind(&supplier.contact_name)
        .bind(&supplier.phone)
        .bind(&supplier.email)
        .bind(&supplier.address)
        .bind(supplier.created_at)
        .execute(&self.pool)
        .await?;

        Ok(supplier.clone())
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Supplier>> {
        let supplier = sqlx::query_as::<_, Supplier>(&format!(
            "SELECT {COLUMNS} FROM suppliers WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(supplier)
    }

    /// All suppliers by name.
    pub async fn list(&self) -> DbResult<Vec<Supplier>> {
        let suppliers = sqlx::query_as::<_, Supplier>(&format!(
            "SELECT {COLUMNS} FROM suppliers ORDER BY name"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(suppliers)
    }

    pub async fn update(&self, supplier: &Supplier) -> DbResult<()> {
        debug!(id = %supplier.id, "Updating supplier");

        let result = sqlx::query(
            r#"
            UPDATE suppliers SET
                name = ?2,
                contact_name = ?3,
                phone = ?4,
                email = ?5,
                address = ?6
            WHERE id = ?1
            "#,
        )
        .bind(&supplier.id)
        .bind(&supplier.name)
        .bind(&supplier.contact_name)
        .bind(&supplier.phone)
        .bind(&supplier.email)
        .bind(&supplier.address)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Supplier", &supplier.id));
        }

        Ok(())
    }

    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting supplier");

        let result = sqlx::query("DELETE FROM suppliers WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Supplier", id));
        }

        Ok(())
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM suppliers")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use tillpoint_core::Supplier;

    use crate::error::DbError;
    use crate::repository::test_support::{product, test_db};

    #[tokio::test]
    async fn test_insert_list_update() {
        let db = test_db().await;
        let mut tea_house = Supplier::new("Tea House Ltd");
        tea_house.contact_name = Some("Minh Tran".to_string());
        db.suppliers().insert(&tea_house).await.unwrap();
        db.suppliers().insert(&Supplier::new("Anchor Ceramics")).await.unwrap();

        let names: Vec<_> = db
            .suppliers()
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["Anchor Ceramics", "Tea House Ltd"]);

        tea_house.phone = Some("0281234567".to_string());
        db.suppliers().update(&tea_house).await.unwrap();
        let loaded = db.suppliers().get_by_id(&tea_house.id).await.unwrap().unwrap();
        assert_eq!(loaded.phone.as_deref(), Some("0281234567"));
        assert_eq!(loaded.contact_name.as_deref(), Some("Minh Tran"));
    }

    #[tokio::test]
    async fn test_products_by_supplier() {
        let db = test_db().await;
        let supplier = db.suppliers().insert(&Supplier::new("Tea House Ltd")).await.unwrap();
        let mut tea = product(&db, "TEA", 2000, 5).await;
        product(&db, "MUG", 5000, 5).await;

        tea.supplier_id = Some(supplier.id.clone());
        db.products().update(&tea).await.unwrap();

        let supplied = db.products().list_by_supplier(&supplier.id).await.unwrap();
        assert_eq!(supplied.len(), 1);
        assert_eq!(supplied[0].code, "TEA");
    }

    #[tokio::test]
    async fn test_delete_detaches_products() {
        let db = test_db().await;
        let supplier = db.suppliers().insert(&Supplier::new("Tea House Ltd")).await.unwrap();
        let mut tea = product(&db, "TEA", 2000, 5).await;
        tea.supplier_id = Some(supplier.id.clone());
        db.products().update(&tea).await.unwrap();

        db.suppliers().delete(&supplier.id).await.unwrap();
        let tea = db.products().get_by_id(&tea.id).await.unwrap().unwrap();
        assert_eq!(tea.supplier_id, None);
        assert_eq!(db.suppliers().count().await.unwrap(), 0);

        assert!(matches!(
            db.suppliers().delete(&supplier.id).await,
            Err(DbError::NotFound { .. })
        ));
        assert!(matches!(
            db.suppliers().update(&supplier).await,
            Err(DbError::NotFound { .. })
        ));
    }
}
