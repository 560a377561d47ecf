//! # Report Repository
//!
//! Read-only rollups over the ledger. Windows and zero-filling come from
//! `kasir_core::report`; this module runs the aggregates.
//!
//! ## Which Transactions Count
//! ```text
//! ┌──────────────────────────┬──────────────┬──────────────────────────┐
//! │ Figure                   │ completed    │ cancelled                │
//! ├──────────────────────────┼──────────────┼──────────────────────────┤
//! │ revenue (any report)     │ yes          │ no                       │
//! │ dashboard / daily counts │ yes          │ yes                      │
//! │ monthly count            │ yes          │ no                       │
//! │ payment distribution     │ yes          │ no                       │
//! │ top products             │ yes          │ no                       │
//! │ export                   │ yes          │ yes                      │
//! └──────────────────────────┴──────────────┴──────────────────────────┘
//! ```

use chrono::NaiveDate;
use kasir_core::report::{day_window, fill_daily, month_window, payment_shares, range_window, trailing_days, Window};
use kasir_core::{
    DailyRevenue, DashboardStats, Money, MonthlySummary, PaymentMethod, PaymentShare, RevenueSummary, TopProduct,
    Transaction, ValidationError, LOW_STOCK_THRESHOLD,
};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use crate::repository::transaction::{TransactionFilter, TransactionRepository};

/// Most rows the top-products report returns.
pub const MAX_TOP_PRODUCTS: u32 = 100;

#[derive(Debug, Clone)]
pub struct ReportRepository {
    pool: SqlitePool,
}

impl ReportRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ReportRepository { pool }
    }

    /// Today's figures plus catalog counts.
    pub async fn dashboard(&self, today: NaiveDate) -> DbResult<DashboardStats> {
        let window = day_window(today);

        let (today_revenue, today_transactions): (Money, i64) = sqlx::query_as(
            r#"
            SELECT
                COALESCE(SUM(CASE WHEN status = 'completed' THEN total ELSE 0 END), 0),
                COUNT(*)
            FROM transactions
            WHERE created_at >= ?1 AND created_at < ?2
            "#,
        )
        .bind(window.start)
        .bind(window.end)
        .fetch_one(&self.pool)
        .await?;

        let (total_products, low_stock_products): (i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COUNT(*),
                COALESCE(SUM(CASE WHEN stock < ?1 THEN 1 ELSE 0 END), 0)
            FROM products
            WHERE deleted_at IS NULL
            "#,
        )
        .bind(LOW_STOCK_THRESHOLD)
        .fetch_one(&self.pool)
        .await?;

        Ok(DashboardStats {
            today_revenue,
            today_transactions,
            total_products,
            low_stock_products,
        })
    }

    /// One row per day for the last `days` days ending `today`, oldest first.
    pub async fn daily_revenue(&self, today: NaiveDate, days: u32) -> DbResult<Vec<DailyRevenue>> {
        let calendar = trailing_days(today, days)?;
        let window = Window {
            start: day_window(calendar[0]).start,
            end: day_window(today).end,
        };

        debug!(days, start = %window.start, "Aggregating daily revenue");

        let rows: Vec<(NaiveDate, Money, i64)> = sqlx::query_as(
            r#"
            SELECT
                substr(created_at, 1, 10) AS day,
                COALESCE(SUM(CASE WHEN status = 'completed' THEN total ELSE 0 END), 0),
                COUNT(*)
            FROM transactions
            WHERE created_at >= ?1 AND created_at < ?2
            GROUP BY day
            "#,
        )
        .bind(window.start)
        .bind(window.end)
        .fetch_all(&self.pool)
        .await?;

        Ok(fill_daily(&calendar, &rows))
    }

    /// Completed revenue for `start..=end`.
    pub async fn revenue_range(&self, start: NaiveDate, end: NaiveDate) -> DbResult<RevenueSummary> {
        let window = range_window(start, end)?;
        let (revenue, transactions) = self.completed_in(window).await?;

        Ok(RevenueSummary {
            start_date: start,
            end_date: end,
            revenue,
            transactions,
        })
    }

    /// Completed revenue and count for the calendar month containing `today`.
    pub async fn monthly_summary(&self, today: NaiveDate) -> DbResult<MonthlySummary> {
        let (window, month) = month_window(today)?;
        let (revenue, transactions) = self.completed_in(window).await?;

        Ok(MonthlySummary {
            month,
            revenue,
            transactions,
        })
    }

    /// Share of completed transactions per payment method, all time.
    pub async fn payment_distribution(&self) -> DbResult<Vec<PaymentShare>> {
        let counts: Vec<(PaymentMethod, i64)> = sqlx::query_as(
            r#"
            SELECT payment_method, COUNT(*)
            FROM transactions
            WHERE status = 'completed'
            GROUP BY payment_method
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(payment_shares(&counts))
    }

    /// Best sellers by units sold in completed transactions.
    ///
    /// Ties are broken by product name so the order is stable.
    pub async fn top_products(&self, limit: u32) -> DbResult<Vec<TopProduct>> {
        if limit == 0 || limit > MAX_TOP_PRODUCTS {
            return Err(ValidationError::OutOfRange {
                field: "limit".to_string(),
                min: 1,
                max: MAX_TOP_PRODUCTS as i64,
            }
            .into());
        }

        let products = sqlx::query_as::<_, TopProduct>(
            r#"
            SELECT
                ti.product_id,
                p.name AS product_name,
                SUM(ti.quantity) AS quantity_sold,
                SUM(ti.subtotal) AS revenue
            FROM transaction_items ti
            INNER JOIN transactions t ON t.id = ti.transaction_id
            INNER JOIN products p ON p.id = ti.product_id
            WHERE t.status = 'completed'
            GROUP BY ti.product_id, p.name
            ORDER BY quantity_sold DESC, product_name
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Every transaction in `start..=end`, cancelled ones included.
    pub async fn export_transactions(&self, start: NaiveDate, end: NaiveDate) -> DbResult<Vec<Transaction>> {
        let window = range_window(start, end)?;

        TransactionRepository::new(self.pool.clone())
            .list(&TransactionFilter {
                start: Some(window.start),
                end: Some(window.end),
                ..Default::default()
            })
            .await
    }

    async fn completed_in(&self, window: Window) -> DbResult<(Money, i64)> {
        let row: (Money, i64) = sqlx::query_as(
            r#"
            SELECT COALESCE(SUM(total), 0), COUNT(*)
            FROM transactions
            WHERE status = 'completed' AND created_at >= ?1 AND created_at < ?2
            "#,
        )
        .bind(window.start)
        .bind(window.end)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fixture_db, seed_product, seed_user};
    use crate::Database;
    use chrono::{Duration, Utc};
    use kasir_core::checkout::{CheckoutLine, CheckoutRequest};
    use kasir_core::Role;

    async fn sell(db: &Database, user_id: &str, lines: &[(&str, i64)], method: PaymentMethod) -> Transaction {
        db.ledger()
            .checkout(&CheckoutRequest {
                user_id: user_id.to_string(),
                items: lines
                    .iter()
                    .map(|(id, qty)| CheckoutLine {
                        product_id: id.to_string(),
                        quantity: *qty,
                    })
                    .collect(),
                payment_method: method,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_empty_ledger() {
        let db = fixture_db().await;
        let today = Utc::now().date_naive();

        let stats = db.reports().dashboard(today).await.unwrap();
        assert!(stats.today_revenue.is_zero());
        assert_eq!(stats.today_transactions, 0);
        assert_eq!(stats.total_products, 0);

        let shares = db.reports().payment_distribution().await.unwrap();
        assert_eq!(shares.len(), 3);
        assert!(shares.iter().all(|s| s.percentage == 0.0));

        let daily = db.reports().daily_revenue(today, 7).await.unwrap();
        assert_eq!(daily.len(), 7);
        assert_eq!(daily[6].date, today);
    }

    #[tokio::test]
    async fn test_cancelled_counted_but_not_revenue() {
        let db = fixture_db().await;
        let cashier = seed_user(&db, "kasir@kasir.com", Role::Cashier).await;
        let coffee = seed_product(&db, "Avo Coffee", 10_000, 50).await;
        seed_product(&db, "Green Tea", 18_000, 3).await;
        let today = Utc::now().date_naive();

        sell(&db, &cashier.id, &[(&coffee.id, 1)], PaymentMethod::Cash).await;
        let cancelled = sell(&db, &cashier.id, &[(&coffee.id, 2)], PaymentMethod::Card).await;
        db.ledger().cancel(&cancelled.id).await.unwrap();

        let stats = db.reports().dashboard(today).await.unwrap();
        assert_eq!(stats.today_revenue.minor(), 11_100);
        assert_eq!(stats.today_transactions, 2);
        assert_eq!(stats.total_products, 2);
        assert_eq!(stats.low_stock_products, 1);

        let daily = db.reports().daily_revenue(today, 3).await.unwrap();
        assert_eq!(daily[2].revenue.minor(), 11_100);
        assert_eq!(daily[2].transactions, 2);
        assert_eq!(daily[0].transactions, 0);

        let range = db
            .reports()
            .revenue_range(today - Duration::days(1), today)
            .await
            .unwrap();
        assert_eq!(range.revenue.minor(), 11_100);
        assert_eq!(range.transactions, 1);

        let month = db.reports().monthly_summary(today).await.unwrap();
        assert_eq!(month.revenue.minor(), 11_100);
        assert_eq!(month.transactions, 1);
        assert_eq!(month.month, today.format("%Y-%m").to_string());

        let shares = db.reports().payment_distribution().await.unwrap();
        assert_eq!(shares[0].count, 1);
        assert_eq!(shares[0].percentage, 100.0);
        assert_eq!(shares[1].count, 0);

        let export = db.reports().export_transactions(today, today).await.unwrap();
        assert_eq!(export.len(), 2);
    }

    #[tokio::test]
    async fn test_top_products() {
        let db = fixture_db().await;
        let cashier = seed_user(&db, "kasir@kasir.com", Role::Cashier).await;
        let coffee = seed_product(&db, "Avo Coffee", 25_000, 50).await;
        let tea = seed_product(&db, "Green Tea", 18_000, 50).await;
        let milk = seed_product(&db, "Vallate Coffee Milk", 23_000, 50).await;

        sell(&db, &cashier.id, &[(&coffee.id, 2), (&tea.id, 5)], PaymentMethod::Qris).await;
        sell(&db, &cashier.id, &[(&coffee.id, 1)], PaymentMethod::Cash).await;
        let gone = sell(&db, &cashier.id, &[(&milk.id, 9)], PaymentMethod::Cash).await;
        db.ledger().cancel(&gone.id).await.unwrap();

        let top = db.reports().top_products(10).await.unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].product_name, "Green Tea");
        assert_eq!(top[0].quantity_sold, 5);
        assert_eq!(top[0].revenue.minor(), 90_000);
        assert_eq!(top[1].product_name, "Avo Coffee");
        assert_eq!(top[1].quantity_sold, 3);

        assert_eq!(db.reports().top_products(1).await.unwrap().len(), 1);
        assert!(db.reports().top_products(0).await.is_err());
    }

    #[tokio::test]
    async fn test_bad_ranges_rejected() {
        let db = fixture_db().await;
        let today = Utc::now().date_naive();

        assert!(db.reports().daily_revenue(today, 0).await.is_err());
        assert!(db
            .reports()
            .revenue_range(today, today - Duration::days(1))
            .await
            .is_err());
    }
}
