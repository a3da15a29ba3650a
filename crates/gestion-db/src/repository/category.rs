//! # Category Repository

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use gestion_core::validation::validate_text;
use gestion_core::Category;

/// Repository for product categories. Names are unique.
#[derive(Debug, Clone)]
pub struct CategoryRepository {
    pool: SqlitePool,
}

impl CategoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CategoryRepository { pool }
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Category>> {
        let category = sqlx::query_as::<_, Category>("SELECT id, name FROM categories WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(category)
    }

    pub async fn insert(&self, name: &str) -> DbResult<Category> {
        let name = name.trim();
        validate_text("name", name, 100)?;
        debug!(name, "Inserting category");

        let id = sqlx::query("INSERT INTO categories (name) VALUES (?1)")
            .bind(name)
            .execute(&self.pool)
            .await
            .map_err(|e| match DbError::from(e) {
                DbError::UniqueViolation { field, .. } => DbError::duplicate(field, name),
                other => other,
            })?
            .last_insert_rowid();

        Ok(Category {
            id,
            name: name.to_string(),
        })
    }

    pub async fn update(&self, category: &Category) -> DbResult<()> {
        validate_text("name", &category.name, 100)?;
        debug!(id = category.id, "Updating category");

        let result = sqlx::query("UPDATE categories SET name = ?2 WHERE id = ?1")
            .bind(category.id)
            .bind(category.name.trim())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Category", category.id));
        }

        Ok(())
    }

    /// Deletes a category; its products become uncategorized.
    pub async fn delete(&self, id: i64) -> DbResult<()> {
        debug!(id, "Deleting category");

        let result = sqlx::query("DELETE FROM categories WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Category", id));
        }

        Ok(())
    }

    pub async fn list(&self) -> DbResult<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>("SELECT id, name FROM categories ORDER BY name")
            .fetch_all(&self.pool)
            .await?;

        Ok(categories)
    }
}

#[cfg(test)]
mod tests {
    use crate::repository::test_support::test_db;
    use crate::DbError;

    #[tokio::test]
    async fn test_category_names_are_unique() {
        let db = test_db().await;
        let repo = db.categories();

        repo.insert("Bebidas").await.unwrap();
        let err = repo.insert("Bebidas").await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_category_crud() {
        let db = test_db().await;
        let repo = db.categories();

        let mut category = repo.insert("Bebidas").await.unwrap();
        category.name = "Bebidas calientes".to_string();
        repo.update(&category).await.unwrap();

        assert_eq!(
            repo.get_by_id(category.id).await.unwrap().unwrap().name,
            "Bebidas calientes"
        );
        assert_eq!(repo.list().await.unwrap().len(), 1);

        repo.delete(category.id).await.unwrap();
        assert!(repo.list().await.unwrap().is_empty());
    }
}
