//! # Product Repository
//!
//! Database operations for products.
//!
//! ## Key Operations
//! - Listing with category filter and name search
//! - CRUD on catalog fields (name, price, category, image)
//! - Stock adjustment through the inventory adjuster
//! - Archiving (soft delete)
//!
//! ## Archived Products
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  DELETE /products/{id}  →  deleted_at = now                             │
//! │                                                                         │
//! │  • hidden from every read in this repository                           │
//! │  • cannot be sold (stock decrements refuse it)                         │
//! │  • still receives stock back when an old sale is cancelled             │
//! │  • old transaction items keep their snapshot name and price            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use kasir_core::validation::{validate_search_query, validate_stock_delta};
use kasir_core::{CoreError, NewProduct, Product, ProductUpdate, LOW_STOCK_THRESHOLD};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::{debug, info};

use crate::error::DbResult;
use crate::inventory::{self, StockLevel};
use crate::new_id;

const SELECT_PRODUCT: &str = r#"
    SELECT
        p.id,
        p.category_id,
        c.name AS category_name,
        p.name,
        p.price,
        p.stock,
        p.image,
        p.created_at,
        p.updated_at,
        p.deleted_at
    FROM products p
    INNER JOIN categories c ON c.id = p.category_id
"#;

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = ProductRepository::new(pool);
///
/// let drinks = repo.list(Some(&minuman_id), Some("coffee")).await?;
/// let level = repo.adjust_stock(&product_id, 24).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Lists live products ordered by name.
    ///
    /// ## Arguments
    /// * `category_id` - Only products in this category
    /// * `search` - Case-insensitive substring of the product name
    pub async fn list(&self, category_id: Option<&str>, search: Option<&str>) -> DbResult<Vec<Product>> {
        let search = search.map(validate_search_query).transpose()?;

        debug!(category_id = ?category_id, search = ?search, "Listing products");

        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(SELECT_PRODUCT);
        qb.push(" WHERE p.deleted_at IS NULL");

        if let Some(category_id) = category_id {
            qb.push(" AND p.category_id = ").push_bind(category_id.to_string());
        }

        if let Some(search) = search.filter(|s| !s.is_empty()) {
            qb.push(" AND p.name LIKE ").push_bind(format!("%{search}%"));
        }

        qb.push(" ORDER BY p.name");

        let products = qb.build_query_as::<Product>().fetch_all(&self.pool).await?;

        debug!(count = products.len(), "Listed products");
        Ok(products)
    }

    /// Live products below the low-stock threshold, emptiest first.
    pub async fn low_stock(&self) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "{SELECT_PRODUCT} WHERE p.deleted_at IS NULL AND p.stock < ?1 ORDER BY p.stock, p.name"
        ))
        .bind(LOW_STOCK_THRESHOLD)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Gets a live product by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found
    /// * `Ok(None)` - Product not found or archived
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "{SELECT_PRODUCT} WHERE p.id = ?1 AND p.deleted_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Creates a product with its opening stock.
    ///
    /// ## Errors
    /// - Validation: short name, non-positive price, negative stock
    /// - `CategoryNotFound`
    pub async fn create(&self, new: &NewProduct) -> DbResult<Product> {
        new.validate()?;
        self.ensure_category(&new.category_id).await?;

        let id = new_id();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO products (id, category_id, name, price, stock, image, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
            "#,
        )
        .bind(&id)
        .bind(&new.category_id)
        .bind(new.name.trim())
        .bind(new.price)
        .bind(new.stock)
        .bind(&new.image)
        .bind(now)
        .execute(&self.pool)
        .await?;

        info!(product_id = %id, name = %new.name.trim(), stock = new.stock, "Product created");

        self.get_by_id(&id)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(id).into())
    }

    /// Updates catalog fields. Stock is left untouched.
    pub async fn update(&self, id: &str, update: &ProductUpdate) -> DbResult<Product> {
        update.validate()?;
        self.ensure_category(&update.category_id).await?;

        let result = sqlx::query(
            r#"
            UPDATE products
               SET category_id = ?2, name = ?3, price = ?4, image = ?5, updated_at = ?6
             WHERE id = ?1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .bind(&update.category_id)
        .bind(update.name.trim())
        .bind(update.price)
        .bind(&update.image)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::ProductNotFound(id.to_string()).into());
        }

        info!(product_id = %id, "Product updated");

        self.get_by_id(id)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(id.to_string()).into())
    }

    /// Applies a manual stock adjustment (restock, shrinkage, count fix).
    ///
    /// Archived products are refused; only cancellations put stock back on them.
    pub async fn adjust_stock(&self, id: &str, delta: i64) -> DbResult<StockLevel> {
        validate_stock_delta(delta)?;

        if self.get_by_id(id).await?.is_none() {
            return Err(CoreError::ProductNotFound(id.to_string()).into());
        }

        let mut conn = self.pool.acquire().await?;
        let level = inventory::apply_delta(&mut conn, id, delta).await?;

        info!(product_id = %id, delta, stock = level.stock, "Stock adjusted");
        Ok(level)
    }

    /// Archives a product. Past transactions keep their snapshots.
    pub async fn archive(&self, id: &str) -> DbResult<()> {
        let now = Utc::now();
        let result = sqlx::query(
            "UPDATE products SET deleted_at = ?2, updated_at = ?2 WHERE id = ?1 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::ProductNotFound(id.to_string()).into());
        }

        info!(product_id = %id, "Product archived");
        Ok(())
    }

    async fn ensure_category(&self, category_id: &str) -> DbResult<()> {
        let exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM categories WHERE id = ?1")
            .bind(category_id)
            .fetch_optional(&self.pool)
            .await?;

        match exists {
            Some(_) => Ok(()),
            None => Err(CoreError::CategoryNotFound(category_id.to_string()).into()),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
