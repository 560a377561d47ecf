//! # Category Repository
//!
//! Database operations for categories. Names are unique; a category that
//! still has products (live or archived) cannot be deleted.

use chrono::Utc;
use kasir_core::validation::validate_name;
use kasir_core::{Category, CoreError};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{unique_or, DbResult};
use crate::new_id;

const SELECT_CATEGORY: &str = "SELECT id, name, created_at, updated_at FROM categories";

/// Repository for category database operations.
#[derive(Debug, Clone)]
pub struct CategoryRepository {
    pool: SqlitePool,
}

impl CategoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CategoryRepository { pool }
    }

    /// Lists all categories ordered by name.
    pub async fn list(&self) -> DbResult<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(&format!("{SELECT_CATEGORY} ORDER BY name"))
            .fetch_all(&self.pool)
            .await?;

        debug!(count = categories.len(), "Listed categories");
        Ok(categories)
    }

    /// Gets a category by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Category))` - Category found
    /// * `Ok(None)` - Category not found
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Category>> {
        let category = sqlx::query_as::<_, Category>(&format!("{SELECT_CATEGORY} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(category)
    }

    pub async fn get_by_name(&self, name: &str) -> DbResult<Option<Category>> {
        let category = sqlx::query_as::<_, Category>(&format!("{SELECT_CATEGORY} WHERE name = ?1"))
            .bind(name.trim())
            .fetch_optional(&self.pool)
            .await?;

        Ok(category)
    }

    /// Creates a category.
    ///
    /// ## Errors
    /// - Validation: name shorter than 2 characters
    /// - `UniqueViolation`: name already taken
    pub async fn create(&self, name: &str) -> DbResult<Category> {
        validate_name("name", name)?;
        let name = name.trim();
        let now = Utc::now();

        let category = Category {
            id: new_id(),
            name: name.to_string(),
            created_at: now,
            updated_at: now,
        };

        sqlx::query("INSERT INTO categories (id, name, created_at, updated_at) VALUES (?1, ?2, ?3, ?4)")
            .bind(&category.id)
            .bind(&category.name)
            .bind(category.created_at)
            .bind(category.updated_at)
            .execute(&self.pool)
            .await
            .map_err(|e| unique_or(e, "category name", name))?;

        info!(category_id = %category.id, name = %category.name, "Category created");
        Ok(category)
    }

    /// Renames a category.
    pub async fn update(&self, id: &str, name: &str) -> DbResult<Category> {
        validate_name("name", name)?;
        let name = name.trim();

        let result = sqlx::query("UPDATE categories SET name = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(name)
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .map_err(|e| unique_or(e, "category name", name))?;

        if result.rows_affected() == 0 {
            return Err(CoreError::CategoryNotFound(id.to_string()).into());
        }

        info!(category_id = %id, name = %name, "Category updated");
        self.get_by_id(id)
            .await?
            .ok_or_else(|| CoreError::CategoryNotFound(id.to_string()).into())
    }

    /// Deletes a category that no product references.
    ///
    /// ## Errors
    /// - `CategoryNotFound`
    /// - `CategoryInUse` when any product (archived ones included) points at it
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let category = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| CoreError::CategoryNotFound(id.to_string()))?;

        let products: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE category_id = ?1")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;

        if products > 0 {
            return Err(CoreError::CategoryInUse {
                name: category.name,
                products,
            }
            .into());
        }

        sqlx::query("DELETE FROM categories WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        info!(category_id = %id, name = %category.name, "Category deleted");
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
