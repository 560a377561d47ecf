//! Checkout, cancellation and ledger reads.
//!
//! The cashier on a checkout is always the token subject; the body never
//! names one.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{NaiveDate, Utc};
use kasir_core::checkout::{CheckoutLine, CheckoutRequest};
use kasir_core::report::{day_window, range_window};
use kasir_core::{CoreError, PaymentMethod, Role, Transaction};
use kasir_db::TransactionFilter;
use serde::Deserialize;

use crate::auth::CurrentUser;
use crate::error::ApiResult;
use crate::response::ApiResponse;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/transactions", get(list_transactions).post(checkout))
        .route("/transactions/today", get(today_transactions))
        .route("/transactions/code/{code}", get(get_by_code))
        .route("/transactions/user/{user_id}", get(transactions_by_user))
        .route("/transactions/{id}", get(get_transaction))
        .route("/transactions/{id}/cancel", post(cancel_transaction))
}

#[derive(Debug, Deserialize)]
struct CheckoutBody {
    #[serde(default)]
    items: Vec<CheckoutLine>,
    /// Parsed by hand so an unknown method is a validation error.
    payment_method: String,
}

#[derive(Debug, Default, Deserialize)]
struct TransactionQuery {
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    payment_method: Option<String>,
}

impl TransactionQuery {
    fn into_filter(self) -> ApiResult<TransactionFilter> {
        let (start, end) = match (self.start_date, self.end_date) {
            (Some(start), Some(end)) => {
                let window = range_window(start, end)?;
                (Some(window.start), Some(window.end))
            }
            (Some(start), None) => (Some(day_window(start).start), None),
            (None, Some(end)) => (None, Some(day_window(end).end)),
            (None, None) => (None, None),
        };

        let payment_method = self
            .payment_method
            .filter(|m| !m.trim().is_empty())
            .map(|m| m.parse::<PaymentMethod>())
            .transpose()?;

        Ok(TransactionFilter {
            start,
            end,
            payment_method,
            user_id: None,
        })
    }
}

async fn checkout(
    State(state): State<AppState>,
    user: CurrentUser,
    body: Result<Json<CheckoutBody>, JsonRejection>,
) -> ApiResult<(StatusCode, ApiResponse<Transaction>)> {
    let Json(body) = body?;
    let payment_method: PaymentMethod = body.payment_method.parse()?;

    let transaction = state
        .db
        .ledger()
        .checkout(&CheckoutRequest {
            user_id: user.id,
            items: body.items,
            payment_method,
        })
        .await?;

    Ok(ApiResponse::created("Transaction created", transaction))
}

async fn cancel_transaction(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<ApiResponse<Transaction>> {
    user.require(Role::Manager)?;
    let transaction = state.db.ledger().cancel(&id).await?;
    Ok(ApiResponse::ok("Transaction cancelled", transaction))
}

async fn list_transactions(
    State(state): State<AppState>,
    _user: CurrentUser,
    query: Result<Query<TransactionQuery>, QueryRejection>,
) -> ApiResult<ApiResponse<Vec<Transaction>>> {
    let Query(query) = query?;
    let transactions = state.db.transactions().list(&query.into_filter()?).await?;
    Ok(ApiResponse::ok("Transactions retrieved", transactions))
}

async fn today_transactions(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> ApiResult<ApiResponse<Vec<Transaction>>> {
    let today = day_window(Utc::now().date_naive());
    let transactions = state
        .db
        .transactions()
        .list(&TransactionFilter {
            start: Some(today.start),
            end: Some(today.end),
            ..Default::default()
        })
        .await?;
    Ok(ApiResponse::ok("Today's transactions retrieved", transactions))
}

async fn transactions_by_user(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(user_id): Path<String>,
) -> ApiResult<ApiResponse<Vec<Transaction>>> {
    let transactions = state
        .db
        .transactions()
        .list(&TransactionFilter {
            user_id: Some(user_id),
            ..Default::default()
        })
        .await?;
    Ok(ApiResponse::ok("Transactions retrieved", transactions))
}

async fn get_transaction(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<ApiResponse<Transaction>> {
    let transaction = state
        .db
        .transactions()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| CoreError::TransactionNotFound(id))?;
    Ok(ApiResponse::ok("Transaction retrieved", transaction))
}

async fn get_by_code(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(code): Path<String>,
) -> ApiResult<ApiResponse<Transaction>> {
    let transaction = state
        .db
        .transactions()
        .get_by_code(&code)
        .await?
        .ok_or_else(|| CoreError::TransactionNotFound(code))?;
    Ok(ApiResponse::ok("Transaction retrieved", transaction))
}
