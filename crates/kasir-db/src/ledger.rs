//! # Transaction Ledger (write side)
//!
//! Checkout and cancellation. Each runs as one SQLite write transaction, so a
//! failure anywhere leaves stock and the ledger exactly as they were.
//!
//! ## Checkout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  request.validate()           empty cart, qty <= 0 → ValidationError   │
//! │       │                                                                 │
//! │  BEGIN                                                                  │
//! │       │                                                                 │
//! │  for each line (cart order):                                           │
//! │       apply_delta(product, -qty)   ← first write takes the lock        │
//! │         ├─ missing / archived  → ProductNotFound   ─┐                  │
//! │         ├─ short               → InsufficientStock ─┤ ROLLBACK         │
//! │         └─ ok: name + price snapshot                │                  │
//! │       │                                             │                  │
//! │  OrderTotals::from_lines(lines, 11%)                │                  │
//! │  cashier name                  → UserNotFound      ─┘                  │
//! │  next per-day sequence         → TRX-YYYYMMDD-NNNN                     │
//! │  INSERT header, INSERT items                                           │
//! │       │                                                                 │
//! │  COMMIT                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Repeated lines for one product are decremented one after another, so
//! they are checked against the running stock, not the opening stock.
//!
//! ## Cancel
//! `completed → cancelled` and every item's quantity goes back on the shelf,
//! archived products included.

use chrono::Utc;
use kasir_core::checkout::{sequence_day, transaction_code, CheckoutRequest, OrderTotals, PricedLine};
use kasir_core::{CoreError, Transaction, TransactionStatus, CHECKOUT_TAX_RATE};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::inventory::apply_delta;
use crate::new_id;
use crate::repository::transaction::{load, load_items};

/// Checkout and cancellation engine.
///
/// ## Usage
/// ```rust,ignore
/// let sale = db.ledger().checkout(&request).await?;
/// let cancelled = db.ledger().cancel(&sale.id).await?;
/// ```
#[derive(Debug, Clone)]
pub struct Ledger {
    pool: SqlitePool,
}

impl Ledger {
    pub fn new(pool: SqlitePool) -> Self {
        Ledger { pool }
    }

    /// Records a sale: decrements stock, prices the cart from the catalog and
    /// persists the transaction, all or nothing.
    ///
    /// ## Errors
    /// - Validation: empty cart, bad quantity, amounts past i64
    /// - `ProductNotFound`: unknown or archived product
    /// - `InsufficientStock`: a line exceeds remaining stock
    /// - `UserNotFound`: unknown cashier
    pub async fn checkout(&self, request: &CheckoutRequest) -> DbResult<Transaction> {
        request.validate()?;

        debug!(
            user_id = %request.user_id,
            lines = request.items.len(),
            payment_method = %request.payment_method,
            "Starting checkout"
        );

        let mut tx = self.pool.begin().await?;

        let mut lines = Vec::with_capacity(request.items.len());
        for line in &request.items {
            let level = apply_delta(&mut tx, &line.product_id, -line.quantity).await?;
            lines.push(PricedLine::new(level.product_id, level.name, level.price, line.quantity)?);
        }

        let totals = OrderTotals::from_lines(&lines, CHECKOUT_TAX_RATE)?;

        let cashier: Option<String> = sqlx::query_scalar("SELECT name FROM users WHERE id = ?1")
            .bind(&request.user_id)
            .fetch_optional(&mut *tx)
            .await?;
        if cashier.is_none() {
            return Err(CoreError::UserNotFound(request.user_id.clone()).into());
        }

        let now = Utc::now();
        let sequence = next_sequence(&mut tx, &sequence_day(now.date_naive())).await?;
        let code = transaction_code(now.date_naive(), sequence);
        let id = new_id();

        insert_header(&mut tx, &id, &code, request, &totals, now).await?;
        for (position, line) in lines.iter().enumerate() {
            insert_item(&mut tx, &id, position as i64, line, now).await?;
        }

        // Read back before commit: an in-memory pool has a single connection.
        let transaction = load(&mut tx, &id)
            .await?
            .ok_or_else(|| DbError::TransactionFailed(format!("transaction {id} vanished before commit")))?;

        tx.commit().await?;

        info!(
            transaction_id = %transaction.id,
            code = %transaction.code,
            total = transaction.total.minor(),
            lines = transaction.items.len(),
            "Checkout completed"
        );
        Ok(transaction)
    }

    /// Cancels a completed transaction and restores its stock.
    ///
    /// ## Errors
    /// - `TransactionNotFound`
    /// - `AlreadyCancelled`
    pub async fn cancel(&self, id: &str) -> DbResult<Transaction> {
        let mut tx = self.pool.begin().await?;

        // Status flip first: it is the write that takes the lock, and its
        // WHERE clause makes a second cancel a no-op.
        let result = sqlx::query(
            "UPDATE transactions SET status = ?2, updated_at = ?3 WHERE id = ?1 AND status = ?4",
        )
        .bind(id)
        .bind(TransactionStatus::Cancelled)
        .bind(Utc::now())
        .bind(TransactionStatus::Completed)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            let code: Option<String> = sqlx::query_scalar("SELECT code FROM transactions WHERE id = ?1")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;

            return Err(match code {
                None => CoreError::TransactionNotFound(id.to_string()),
                Some(code) => CoreError::AlreadyCancelled { code },
            }
            .into());
        }

        for item in load_items(&mut tx, id).await? {
            match apply_delta(&mut tx, &item.product_id, item.quantity).await {
                Ok(level) => {
                    debug!(product_id = %item.product_id, stock = level.stock, "Stock restored");
                }
                Err(DbError::Domain(CoreError::ProductNotFound(_))) => {
                    warn!(
                        transaction_id = %id,
                        product_id = %item.product_id,
                        quantity = item.quantity,
                        "Product missing, stock not restored"
                    );
                }
                Err(e) => return Err(e),
            }
        }

        let transaction = load(&mut tx, id)
            .await?
            .ok_or_else(|| CoreError::TransactionNotFound(id.to_string()))?;

        tx.commit().await?;

        info!(transaction_id = %id, code = %transaction.code, "Transaction cancelled");
        Ok(transaction)
    }
}

/// Bumps and returns the day's sequence (1 for the first sale of the day).
async fn next_sequence(conn: &mut SqliteConnection, day: &str) -> DbResult<i64> {
    let value: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO transaction_sequences (day, last_value) VALUES (?1, 1)
        ON CONFLICT (day) DO UPDATE SET last_value = last_value + 1
        RETURNING last_value
        "#,
    )
    .bind(day)
    .fetch_one(&mut *conn)
    .await?;

    Ok(value)
}

async fn insert_header(
    conn: &mut SqliteConnection,
    id: &str,
    code: &str,
    request: &CheckoutRequest,
    totals: &OrderTotals,
    now: chrono::DateTime<Utc>,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO transactions
            (id, code, user_id, subtotal, tax_rate, tax, total, payment_method, status, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)
        "#,
    )
    .bind(id)
    .bind(code)
    .bind(&request.user_id)
    .bind(totals.subtotal)
    .bind(totals.tax_rate)
    .bind(totals.tax)
    .bind(totals.total)
    .bind(request.payment_method)
    .bind(TransactionStatus::Completed)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

async fn insert_item(
    conn: &mut SqliteConnection,
    transaction_id: &str,
    position: i64,
    line: &PricedLine,
    now: chrono::DateTime<Utc>,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO transaction_items
            (id, transaction_id, product_id, position, product_name, price, quantity, subtotal, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
    )
    .bind(new_id())
    .bind(transaction_id)
    .bind(&line.product_id)
    .bind(position)
    .bind(&line.product_name)
    .bind(line.unit_price)
    .bind(line.quantity)
    .bind(line.subtotal)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fixture_db, seed_product, seed_user};
    use crate::{Database, DbConfig};
    use kasir_core::checkout::CheckoutLine;
    use kasir_core::{PaymentMethod, Role, ValidationError};

    fn request(user_id: &str, lines: &[(&str, i64)]) -> CheckoutRequest {
        CheckoutRequest {
            user_id: user_id.to_string(),
            items: lines
                .iter()
                .map(|(id, qty)| CheckoutLine {
                    product_id: id.to_string(),
                    quantity: *qty,
                })
                .collect(),
            payment_method: PaymentMethod::Cash,
        }
    }

    async fn stock_of(db: &Database, product_id: &str) -> i64 {
        sqlx::query_scalar("SELECT stock FROM products WHERE id = ?1")
            .bind(product_id)
            .fetch_one(db.pool())
            .await
            .unwrap()
    }

    async fn transaction_count(db: &Database) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM transactions")
            .fetch_one(db.pool())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_checkout_then_cancel() {
        let db = fixture_db().await;
        let cashier = seed_user(&db, "kasir@kasir.com", Role::Cashier).await;
        let product = seed_product(&db, "Kopi Susu", 10_000, 5).await;

        let sale = db
            .ledger()
            .checkout(&request(&cashier.id, &[(&product.id, 1)]))
            .await
            .unwrap();

        assert_eq!(sale.subtotal.minor(), 10_000);
        assert_eq!(sale.tax.minor(), 1_100);
        assert_eq!(sale.total.minor(), 11_100);
        assert_eq!(sale.tax_rate, CHECKOUT_TAX_RATE);
        assert_eq!(sale.status, TransactionStatus::Completed);
        assert_eq!(sale.payment_method, PaymentMethod::Cash);
        assert_eq!(sale.cashier_name, "Kasir Satu");
        assert!(sale.code.starts_with("TRX-"));
        assert_eq!(sale.items.len(), 1);
        assert_eq!(sale.items[0].product_name, "Kopi Susu");
        assert_eq!(sale.items[0].subtotal.minor(), 10_000);
        assert_eq!(stock_of(&db, &product.id).await, 4);

        let cancelled = db.ledger().cancel(&sale.id).await.unwrap();
        assert!(cancelled.is_cancelled());
        assert_eq!(stock_of(&db, &product.id).await, 5);
    }

    #[tokio::test]
    async fn test_snapshot_survives_catalog_edit() {
        let db = fixture_db().await;
        let cashier = seed_user(&db, "kasir@kasir.com", Role::Cashier).await;
        let product = seed_product(&db, "Cappucino", 22_000, 5).await;

        let sale = db
            .ledger()
            .checkout(&request(&cashier.id, &[(&product.id, 2)]))
            .await
            .unwrap();

        sqlx::query("UPDATE products SET name = 'Cappuccino', price = 30000 WHERE id = ?1")
            .bind(&product.id)
            .execute(db.pool())
            .await
            .unwrap();

        let reread = db.transactions().get_by_id(&sale.id).await.unwrap().unwrap();
        assert_eq!(reread.items[0].product_name, "Cappucino");
        assert_eq!(reread.items[0].price.minor(), 22_000);
        assert_eq!(reread.subtotal.minor(), 44_000);
    }

    #[tokio::test]
    async fn test_empty_cart_changes_nothing() {
        let db = fixture_db().await;
        let cashier = seed_user(&db, "kasir@kasir.com", Role::Cashier).await;

        let err = db.ledger().checkout(&request(&cashier.id, &[])).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::Validation(ValidationError::Required { .. }))
        ));
        assert_eq!(transaction_count(&db).await, 0);
    }

    #[tokio::test]
    async fn test_unknown_product_rolls_back_earlier_lines() {
        let db = fixture_db().await;
        let cashier = seed_user(&db, "kasir@kasir.com", Role::Cashier).await;
        let first = seed_product(&db, "Avo Coffee", 25_000, 5).await;

        let err = db
            .ledger()
            .checkout(&request(&cashier.id, &[(&first.id, 2), ("no-such-product", 1)]))
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::Domain(CoreError::ProductNotFound(_))));
        assert_eq!(stock_of(&db, &first.id).await, 5);
        assert_eq!(transaction_count(&db).await, 0);
    }

    #[tokio::test]
    async fn test_amount_overflow_rejected_cleanly() {
        let db = fixture_db().await;
        let cashier = seed_user(&db, "kasir@kasir.com", Role::Cashier).await;
        let product = seed_product(&db, "Mahal", 10_000, 10).await;
        // A row priced past what the catalog accepts today.
        sqlx::query("UPDATE products SET price = ?2 WHERE id = ?1")
            .bind(&product.id)
            .bind(i64::MAX / 2)
            .execute(db.pool())
            .await
            .unwrap();

        let err = db
            .ledger()
            .checkout(&request(&cashier.id, &[(&product.id, 3)]))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DbError::Domain(CoreError::Validation(ValidationError::OutOfRange { .. }))
        ));
        assert_eq!(stock_of(&db, &product.id).await, 10);
        assert_eq!(transaction_count(&db).await, 0);
    }

    #[tokio::test]
    async fn test_repeated_lines_checked_cumulatively() {
        let db = fixture_db().await;
        let cashier = seed_user(&db, "kasir@kasir.com", Role::Cashier).await;
        let product = seed_product(&db, "Green Tea", 18_000, 3).await;

        let err = db
            .ledger()
            .checkout(&request(&cashier.id, &[(&product.id, 2), (&product.id, 2)]))
            .await
            .unwrap_err();

        match err {
            DbError::Domain(CoreError::InsufficientStock {
                product,
                available,
                requested,
            }) => {
                assert_eq!(product, "Green Tea");
                assert_eq!(available, 1);
                assert_eq!(requested, 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(stock_of(&db, &product.id).await, 3);
    }

    #[tokio::test]
    async fn test_archived_product_not_sold() {
        let db = fixture_db().await;
        let cashier = seed_user(&db, "kasir@kasir.com", Role::Cashier).await;
        let product = seed_product(&db, "Chococa", 20_000, 5).await;
        db.products().archive(&product.id).await.unwrap();

        let err = db
            .ledger()
            .checkout(&request(&cashier.id, &[(&product.id, 1)]))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::ProductNotFound(_))));
    }

    #[tokio::test]
    async fn test_unknown_cashier_rolls_back() {
        let db = fixture_db().await;
        let product = seed_product(&db, "Chococa", 20_000, 5).await;

        let err = db
            .ledger()
            .checkout(&request("ghost", &[(&product.id, 1)]))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::UserNotFound(_))));
        assert_eq!(stock_of(&db, &product.id).await, 5);
    }

    #[tokio::test]
    async fn test_cancel_twice_is_conflict() {
        let db = fixture_db().await;
        let cashier = seed_user(&db, "kasir@kasir.com", Role::Cashier).await;
        let product = seed_product(&db, "Macachino", 24_000, 5).await;

        let sale = db
            .ledger()
            .checkout(&request(&cashier.id, &[(&product.id, 3)]))
            .await
            .unwrap();
        db.ledger().cancel(&sale.id).await.unwrap();

        let err = db.ledger().cancel(&sale.id).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::AlreadyCancelled { .. })));
        assert_eq!(stock_of(&db, &product.id).await, 5);

        let err = db.ledger().cancel("missing").await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::TransactionNotFound(_))));
    }

    #[tokio::test]
    async fn test_cancel_restores_archived_product() {
        let db = fixture_db().await;
        let cashier = seed_user(&db, "kasir@kasir.com", Role::Cashier).await;
        let product = seed_product(&db, "Machiato", 26_000, 5).await;

        let sale = db
            .ledger()
            .checkout(&request(&cashier.id, &[(&product.id, 2)]))
            .await
            .unwrap();
        db.products().archive(&product.id).await.unwrap();

        db.ledger().cancel(&sale.id).await.unwrap();
        assert_eq!(stock_of(&db, &product.id).await, 5);
    }

    #[tokio::test]
    async fn test_codes_follow_daily_sequence() {
        let db = fixture_db().await;
        let cashier = seed_user(&db, "kasir@kasir.com", Role::Cashier).await;
        let product = seed_product(&db, "Avo Coffee", 25_000, 10).await;

        let a = db
            .ledger()
            .checkout(&request(&cashier.id, &[(&product.id, 1)]))
            .await
            .unwrap();
        let b = db
            .ledger()
            .checkout(&request(&cashier.id, &[(&product.id, 1)]))
            .await
            .unwrap();

        let day = sequence_day(a.created_at.date_naive());
        assert_eq!(a.code, format!("TRX-{day}-0001"));
        assert_eq!(b.code, format!("TRX-{day}-0002"));
    }

    #[tokio::test]
    async fn test_stock_accounting_over_mixed_history() {
        let db = fixture_db().await;
        let cashier = seed_user(&db, "kasir@kasir.com", Role::Cashier).await;
        let product = seed_product(&db, "Vallate Coffee Milk", 23_000, 20).await;

        let mut kept = 0;
        for qty in 1..=5 {
            let sale = db
                .ledger()
                .checkout(&request(&cashier.id, &[(&product.id, qty)]))
                .await
                .unwrap();
            if qty % 2 == 0 {
                db.ledger().cancel(&sale.id).await.unwrap();
            } else {
                kept += qty;
            }
        }

        assert_eq!(stock_of(&db, &product.id).await, 20 - kept);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_checkouts_never_oversell() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(DbConfig::new(dir.path().join("kasir.db")).max_connections(4))
            .await
            .unwrap();
        let cashier = seed_user(&db, "kasir@kasir.com", Role::Cashier).await;
        let product = seed_product(&db, "Avo Coffee", 10_000, 5).await;

        let attempts: Vec<_> = (0..2)
            .map(|_| {
                let ledger = db.ledger();
                let req = request(&cashier.id, &[(&product.id, 3)]);
                tokio::spawn(async move { ledger.checkout(&req).await })
            })
            .collect();

        let mut ok = 0;
        let mut short = 0;
        for attempt in attempts {
            match attempt.await.unwrap() {
                Ok(_) => ok += 1,
                Err(DbError::Domain(CoreError::InsufficientStock { .. })) => short += 1,
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }

        assert_eq!((ok, short), (1, 1));
        assert_eq!(stock_of(&db, &product.id).await, 2);
        assert_eq!(transaction_count(&db).await, 1);
    }
}
