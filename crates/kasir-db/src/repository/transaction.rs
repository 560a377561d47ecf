//! # Transaction Repository
//!
//! Read side of the ledger. Transactions are written only by
//! [`crate::ledger::Ledger`]; everything here is a query.
//!
//! Every transaction is returned with its items in cart order and the
//! cashier's current display name.

use chrono::{DateTime, Utc};
use kasir_core::{PaymentMethod, Transaction, TransactionItem};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;

const SELECT_TRANSACTION: &str = r#"
    SELECT
        t.id,
        t.code,
        t.user_id,
        u.name AS cashier_name,
        t.subtotal,
        t.tax_rate,
        t.tax,
        t.total,
        t.payment_method,
        t.status,
        t.created_at,
        t.updated_at
    FROM transactions t
    INNER JOIN users u ON u.id = t.user_id
"#;

/// Optional filters for listing transactions. `start` is inclusive, `end`
/// exclusive.
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub payment_method: Option<PaymentMethod>,
    pub user_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TransactionRepository {
    pool: SqlitePool,
}

impl TransactionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        TransactionRepository { pool }
    }

    /// Lists transactions of every status, newest first.
    pub async fn list(&self, filter: &TransactionFilter) -> DbResult<Vec<Transaction>> {
        debug!(?filter, "Listing transactions");

        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(SELECT_TRANSACTION);
        qb.push(" WHERE 1 = 1");

        if let Some(start) = filter.start {
            qb.push(" AND t.created_at >= ").push_bind(start);
        }
        if let Some(end) = filter.end {
            qb.push(" AND t.created_at < ").push_bind(end);
        }
        if let Some(method) = filter.payment_method {
            qb.push(" AND t.payment_method = ").push_bind(method);
        }
        if let Some(user_id) = &filter.user_id {
            qb.push(" AND t.user_id = ").push_bind(user_id.clone());
        }

        qb.push(" ORDER BY t.created_at DESC, t.code DESC");

        let mut conn = self.pool.acquire().await?;
        let mut transactions = qb
            .build_query_as::<Transaction>()
            .fetch_all(&mut *conn)
            .await?;

        for transaction in &mut transactions {
            transaction.items = load_items(&mut conn, &transaction.id).await?;
        }

        debug!(count = transactions.len(), "Listed transactions");
        Ok(transactions)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Transaction>> {
        let mut conn = self.pool.acquire().await?;
        load(&mut conn, id).await
    }

    /// Looks a transaction up by its receipt code (`TRX-YYYYMMDD-NNNN`).
    pub async fn get_by_code(&self, code: &str) -> DbResult<Option<Transaction>> {
        let mut conn = self.pool.acquire().await?;

        let transaction = sqlx::query_as::<_, Transaction>(&format!("{SELECT_TRANSACTION} WHERE t.code = ?1"))
            .bind(code.trim())
            .fetch_optional(&mut *conn)
            .await?;

        match transaction {
            Some(mut transaction) => {
                transaction.items = load_items(&mut conn, &transaction.id).await?;
                Ok(Some(transaction))
            }
            None => Ok(None),
        }
    }
}

/// Loads one transaction with its items on the given connection.
///
/// Used by the ledger to read back what it just wrote before committing.
pub(crate) async fn load(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Transaction>> {
    let transaction = sqlx::query_as::<_, Transaction>(&format!("{SELECT_TRANSACTION} WHERE t.id = ?1"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    match transaction {
        Some(mut transaction) => {
            transaction.items = load_items(conn, id).await?;
            Ok(Some(transaction))
        }
        None => Ok(None),
    }
}

pub(crate) async fn load_items(conn: &mut SqliteConnection, transaction_id: &str) -> DbResult<Vec<TransactionItem>> {
    let items = sqlx::query_as::<_, TransactionItem>(
        r#"
        SELECT id, transaction_id, product_id, product_name, price, quantity, subtotal, created_at
        FROM transaction_items
        WHERE transaction_id = ?1
        ORDER BY position
        "#,
    )
    .bind(transaction_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(items)
}

// =============================================================================
// Unit Tests
// =============================================================================
