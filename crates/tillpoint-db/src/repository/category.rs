//! # Category Repository
//!
//! Categories carry the tax rate snapshotted onto every invoice line.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use tillpoint_core::Category;

const COLUMNS: &str = "id, name, description, tax_rate_bps, created_at";

#[derive(Debug, Clone)]
pub struct CategoryRepository {
    pool: SqlitePool,
}

impl CategoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CategoryRepository { pool }
    }

    /// Inserts a category.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - name already exists
    pub async fn insert(&self, category: &Category) -> DbResult<Category> {
        debug!(name = %category.name, "Inserting category");

        sqlx::query(
            "INSERT INTO categories (id, name, description, tax_rate_bps, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&category.id)
        .bind(&category.name)
        .bind(&category.description)
        .bind(category.tax_rate_bps)
        .bind(category.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => DbError::duplicate(field, &category.name),
            other => other,
        })?;

        Ok(category.clone())
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Category>> {
        let category = sqlx::query_as::<_, Category>(&format!(
            "SELECT {COLUMNS} FROM categories WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(category)
    }

    /// All categories by name.
    pub async fn list(&self) -> DbResult<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(&format!(
            "SELECT {COLUMNS} FROM categories ORDER BY name"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(categories)
    }

    pub async fn update(&self, category: &Category) -> DbResult<()> {
        debug!(id = %category.id, "Updating category");

        let result = sqlx::query(
            "UPDATE categories SET name = ?2, description = ?3, tax_rate_bps = ?4 WHERE id = ?1",
        )
        .bind(&category.id)
        .bind(&category.name)
        .bind(&category.description)
        .bind(category.tax_rate_bps)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Category", &category.id));
        }

        Ok(())
    }

    /// Deletes a category. Its products become uncategorised (0% tax).
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting category");

        let result = sqlx::query("DELETE FROM categories WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Category", id));
        }

        Ok(())
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM categories")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use crate::error::DbError;
    use crate::repository::test_support::{category, product, test_db};

    #[tokio::test]
    async fn test_insert_get_update() {
        let db = test_db().await;
        let mut drinks = category(&db, "Drinks", 1000).await;

        let loaded = db.categories().get_by_id(&drinks.id).await.unwrap().unwrap();
        assert_eq!(loaded.tax_rate_bps, 1000);

        drinks.tax_rate_bps = 800;
        db.categories().update(&drinks).await.unwrap();
        let loaded = db.categories().get_by_id(&drinks.id).await.unwrap().unwrap();
        assert_eq!(loaded.tax_rate().bps(), 800);
    }

    #[tokio::test]
    async fn test_duplicate_name() {
        let db = test_db().await;
        category(&db, "Drinks", 1000).await;

        let mut dup = category(&db, "Snacks", 0).await;
        dup.id = crate::repository::new_id();
        dup.name = "Drinks".to_string();
        let err = db.categories().insert(&dup).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_delete_uncategorises_products() {
        let db = test_db().await;
        let drinks = category(&db, "Drinks", 1000).await;
        let mut tea = product(&db, "TEA", 2000, 5).await;
        tea.category_id = Some(drinks.id.clone());
        db.products().update(&tea).await.unwrap();

        db.categories().delete(&drinks.id).await.unwrap();
        let tea = db.products().get_by_id(&tea.id).await.unwrap().unwrap();
        assert_eq!(tea.category_id, None);
        assert_eq!(db.categories().count().await.unwrap(), 0);

        assert!(matches!(
            db.categories().delete(&drinks.id).await,
            Err(DbError::NotFound { .. })
        ));
    }
}
