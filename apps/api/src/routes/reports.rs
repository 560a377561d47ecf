//! Read-only reports. "Today" is the current UTC date.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::routing::get;
use axum::Router;
use chrono::{NaiveDate, Utc};
use kasir_core::{
    DailyRevenue, DashboardStats, MonthlySummary, PaymentShare, RevenueSummary, Role, TopProduct, Transaction,
};
use serde::Deserialize;

use crate::auth::CurrentUser;
use crate::error::ApiResult;
use crate::response::ApiResponse;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/reports/dashboard", get(dashboard))
        .route("/reports/revenue/daily", get(daily_revenue))
        .route("/reports/revenue/range", get(revenue_range))
        .route("/reports/payment-distribution", get(payment_distribution))
        .route("/reports/products/top", get(top_products))
        .route("/reports/summary/monthly", get(monthly_summary))
        .route("/reports/export/transactions", get(export_transactions))
}

#[derive(Debug, Deserialize)]
struct DaysQuery {
    #[serde(default = "default_days")]
    days: u32,
}

fn default_days() -> u32 {
    7
}

#[derive(Debug, Deserialize)]
struct LimitQuery {
    #[serde(default = "default_limit")]
    limit: u32,
}

fn default_limit() -> u32 {
    10
}

/// Both dates are required and inclusive.
#[derive(Debug, Deserialize)]
struct DateRangeQuery {
    start_date: NaiveDate,
    end_date: NaiveDate,
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

async fn dashboard(State(state): State<AppState>, _user: CurrentUser) -> ApiResult<ApiResponse<DashboardStats>> {
    let stats = state.db.reports().dashboard(today()).await?;
    Ok(ApiResponse::ok("Dashboard retrieved", stats))
}

async fn daily_revenue(
    State(state): State<AppState>,
    _user: CurrentUser,
    query: Result<Query<DaysQuery>, QueryRejection>,
) -> ApiResult<ApiResponse<Vec<DailyRevenue>>> {
    let Query(query) = query?;
    let rows = state.db.reports().daily_revenue(today(), query.days).await?;
    Ok(ApiResponse::ok("Daily revenue retrieved", rows))
}

async fn revenue_range(
    State(state): State<AppState>,
    _user: CurrentUser,
    query: Result<Query<DateRangeQuery>, QueryRejection>,
) -> ApiResult<ApiResponse<RevenueSummary>> {
    let Query(range) = query?;
    let summary = state
        .db
        .reports()
        .revenue_range(range.start_date, range.end_date)
        .await?;
    Ok(ApiResponse::ok("Revenue retrieved", summary))
}

async fn monthly_summary(State(state): State<AppState>, _user: CurrentUser) -> ApiResult<ApiResponse<MonthlySummary>> {
    let summary = state.db.reports().monthly_summary(today()).await?;
    Ok(ApiResponse::ok("Monthly summary retrieved", summary))
}

async fn payment_distribution(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> ApiResult<ApiResponse<Vec<PaymentShare>>> {
    let shares = state.db.reports().payment_distribution().await?;
    Ok(ApiResponse::ok("Payment distribution retrieved", shares))
}

async fn top_products(
    State(state): State<AppState>,
    _user: CurrentUser,
    query: Result<Query<LimitQuery>, QueryRejection>,
) -> ApiResult<ApiResponse<Vec<TopProduct>>> {
    let Query(query) = query?;
    let products = state.db.reports().top_products(query.limit).await?;
    Ok(ApiResponse::ok("Top products retrieved", products))
}

async fn export_transactions(
    State(state): State<AppState>,
    user: CurrentUser,
    query: Result<Query<DateRangeQuery>, QueryRejection>,
) -> ApiResult<ApiResponse<Vec<Transaction>>> {
    user.require(Role::Manager)?;
    let Query(range) = query?;
    let transactions = state
        .db
        .reports()
        .export_transactions(range.start_date, range.end_date)
        .await?;
    Ok(ApiResponse::ok("Transactions exported", transactions))
}
