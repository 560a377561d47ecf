//! # Inventory Adjuster
//!
//! The only code path that changes a product's stock after creation.
//! Checkout, cancellation and the manual stock endpoint all end up here.
//!
//! ## One Statement
//! ```text
//! UPDATE products
//!    SET stock = stock + delta
//!  WHERE id = ?
//!    AND stock + delta >= 0              ← never negative
//!    AND stock + delta <= MAX_STOCK      ← stays an INTEGER column
//!    AND (delta >= 0 OR deleted_at IS NULL)  ← archived products only grow
//! RETURNING stock, name, price
//! ```
//!
//! The check and the write are one statement, so two writers can never both
//! see "enough stock" for the same units. When no row comes back a follow-up
//! read explains why (missing, archived, short, or over the ceiling).
//!
//! SQLite turns an overflowing `stock + delta` into a REAL that passes both
//! range checks against zero, so the upper bound is what keeps the column
//! decodable.
//!
//! Because it is usually the first statement of a write transaction, it also
//! takes SQLite's write lock up front, and concurrent checkouts queue behind
//! each other instead of deadlocking on a read-then-write upgrade.

use chrono::{DateTime, Utc};
use kasir_core::{CoreError, Money, ValidationError, MAX_STOCK};
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::DbResult;

/// A product's stock right after an adjustment, with the catalog fields the
/// ledger snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockLevel {
    pub product_id: String,
    pub name: String,
    pub price: Money,
    pub stock: i64,
}

/// Adds `delta` (signed) to a product's stock.
///
/// ## Errors
/// - `ProductNotFound` when the row is missing, or archived and `delta < 0`
/// - `InsufficientStock` when the result would be negative
/// - Validation `OutOfRange` when the result would exceed `MAX_STOCK`
///
/// Runs on whatever connection it is given, so callers decide the
/// transaction boundary.
pub async fn apply_delta(
    conn: &mut SqliteConnection,
    product_id: &str,
    delta: i64,
) -> DbResult<StockLevel> {
    debug!(product_id = %product_id, delta, "Applying stock delta");

    let updated: Option<(i64, String, Money)> = sqlx::query_as(
        r#"
        UPDATE products
           SET stock = stock + ?2,
               updated_at = ?3
         WHERE id = ?1
           AND stock + ?2 >= 0
           AND stock + ?2 <= ?4
           AND (?2 >= 0 OR deleted_at IS NULL)
        RETURNING stock, name, price
        "#,
    )
    .bind(product_id)
    .bind(delta)
    .bind(Utc::now())
    .bind(MAX_STOCK)
    .fetch_optional(&mut *conn)
    .await?;

    if let Some((stock, name, price)) = updated {
        return Ok(StockLevel {
            product_id: product_id.to_string(),
            name,
            price,
            stock,
        });
    }

    let current: Option<(String, i64, Option<DateTime<Utc>>)> =
        sqlx::query_as("SELECT name, stock, deleted_at FROM products WHERE id = ?1")
            .bind(product_id)
            .fetch_optional(&mut *conn)
            .await?;

    let err = match current {
        None => CoreError::ProductNotFound(product_id.to_string()),
        Some((_, _, Some(_))) if delta < 0 => CoreError::ProductNotFound(product_id.to_string()),
        Some((_, stock, _)) if delta > 0 && stock.saturating_add(delta) > MAX_STOCK => ValidationError::OutOfRange {
            field: "stock".to_string(),
            min: 0,
            max: MAX_STOCK,
        }
        .into(),
        Some((name, stock, _)) => CoreError::InsufficientStock {
            product: name,
            available: stock,
            requested: delta.saturating_neg(),
        },
    };

    debug!(product_id = %product_id, error = %err, "Stock delta refused");
    Err(err.into())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fixture_db, seed_product};
    use crate::DbError;

    #[tokio::test]
    async fn test_decrement_and_increment() {
        let db = fixture_db().await;
        let product = seed_product(&db, "Avo Coffee", 25_000, 5).await;
        let mut conn = db.pool().acquire().await.unwrap();

        let level = apply_delta(&mut conn, &product.id, -2).await.unwrap();
        assert_eq!(level.stock, 3);
        assert_eq!(level.name, "Avo Coffee");
        assert_eq!(level.price.minor(), 25_000);

        let level = apply_delta(&mut conn, &product.id, 4).await.unwrap();
        assert_eq!(level.stock, 7);
    }

    #[tokio::test]
    async fn test_refuses_negative_result() {
        let db = fixture_db().await;
        let product = seed_product(&db, "Green Tea", 18_000, 2).await;
        let mut conn = db.pool().acquire().await.unwrap();

        let err = apply_delta(&mut conn, &product.id, -3).await.unwrap_err();
        match err {
            DbError::Domain(CoreError::InsufficientStock {
                product,
                available,
                requested,
            }) => {
                assert_eq!(product, "Green Tea");
                assert_eq!(available, 2);
                assert_eq!(requested, 3);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        // Draining to exactly zero is fine
        let level = apply_delta(&mut conn, &product.id, -2).await.unwrap();
        assert_eq!(level.stock, 0);
    }

    #[tokio::test]
    async fn test_missing_product() {
        let db = fixture_db().await;
        let mut conn = db.pool().acquire().await.unwrap();

        let err = apply_delta(&mut conn, "no-such-id", 1).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::ProductNotFound(_))));
    }

    #[tokio::test]
    async fn test_refuses_stock_past_ceiling() {
        let db = fixture_db().await;
        let product = seed_product(&db, "Kopi Susu", 10_000, 5).await;
        let mut conn = db.pool().acquire().await.unwrap();

        for delta in [i64::MAX, MAX_STOCK] {
            let err = apply_delta(&mut conn, &product.id, delta).await.unwrap_err();
            assert!(matches!(
                err,
                DbError::Domain(CoreError::Validation(ValidationError::OutOfRange { .. }))
            ));
        }

        // The row is untouched and still decodes as an integer.
        let stored: (String, i64) = sqlx::query_as("SELECT typeof(stock), stock FROM products WHERE id = ?1")
            .bind(&product.id)
            .fetch_one(&mut *conn)
            .await
            .unwrap();
        assert_eq!(stored, ("integer".to_string(), 5));
        drop(conn);
        assert_eq!(db.products().list(None, None).await.unwrap().len(), 1);

        // Filling exactly to the ceiling is fine.
        let mut conn = db.pool().acquire().await.unwrap();
        let level = apply_delta(&mut conn, &product.id, MAX_STOCK - 5).await.unwrap();
        assert_eq!(level.stock, MAX_STOCK);
    }

    #[tokio::test]
    async fn test_huge_decrement_is_insufficient_stock() {
        let db = fixture_db().await;
        let product = seed_product(&db, "Green Tea", 18_000, 2).await;
        let mut conn = db.pool().acquire().await.unwrap();

        let err = apply_delta(&mut conn, &product.id, i64::MIN).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::InsufficientStock { .. })));
    }

    #[tokio::test]
    async fn test_archived_product_only_grows() {
        let db = fixture_db().await;
        let product = seed_product(&db, "Chococa", 20_000, 5).await;
        db.products().archive(&product.id).await.unwrap();
        let mut conn = db.pool().acquire().await.unwrap();

        let err = apply_delta(&mut conn, &product.id, -1).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::ProductNotFound(_))));

        let level = apply_delta(&mut conn, &product.id, 1).await.unwrap();
        assert_eq!(level.stock, 6);
    }
}
