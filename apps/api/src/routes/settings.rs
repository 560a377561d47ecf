use std::collections::BTreeMap;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::{get, put};
use axum::{Json, Router};
use kasir_core::{Role, Setting, StoreInfo};
use serde::Deserialize;

use crate::auth::CurrentUser;
use crate::error::ApiResult;
use crate::response::ApiResponse;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/settings", get(list_settings).put(upsert_setting))
        .route("/settings/batch", put(upsert_batch))
        .route("/settings/store", get(store_info))
        .route("/settings/payment", get(payment_settings))
        .route("/settings/{key}", get(get_setting))
}

#[derive(Debug, Deserialize)]
struct SettingEntry {
    key: String,
    value: String,
}

async fn list_settings(State(state): State<AppState>, _user: CurrentUser) -> ApiResult<ApiResponse<Vec<Setting>>> {
    let settings = state.db.settings().list().await?;
    Ok(ApiResponse::ok("Settings retrieved", settings))
}

async fn get_setting(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(key): Path<String>,
) -> ApiResult<ApiResponse<Setting>> {
    let setting = state.db.settings().get(&key).await?;
    Ok(ApiResponse::ok("Setting retrieved", setting))
}

async fn store_info(State(state): State<AppState>, _user: CurrentUser) -> ApiResult<ApiResponse<StoreInfo>> {
    let info = state.db.settings().store_info().await?;
    Ok(ApiResponse::ok("Store info retrieved", info))
}

async fn payment_settings(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> ApiResult<ApiResponse<BTreeMap<String, String>>> {
    let settings = state.db.settings().payment_settings().await?;
    Ok(ApiResponse::ok("Payment settings retrieved", settings))
}

async fn upsert_setting(
    State(state): State<AppState>,
    user: CurrentUser,
    body: Result<Json<SettingEntry>, JsonRejection>,
) -> ApiResult<ApiResponse<Setting>> {
    user.require(Role::Admin)?;
    let Json(entry) = body?;
    let setting = state.db.settings().upsert(&entry.key, &entry.value).await?;
    Ok(ApiResponse::ok("Setting updated", setting))
}

/// All entries are written in one transaction or none are.
async fn upsert_batch(
    State(state): State<AppState>,
    user: CurrentUser,
    body: Result<Json<Vec<SettingEntry>>, JsonRejection>,
) -> ApiResult<ApiResponse<Vec<Setting>>> {
    user.require(Role::Admin)?;
    let Json(entries) = body?;

    let pairs: Vec<(String, String)> = entries.into_iter().map(|e| (e.key, e.value)).collect();
    let settings = state.db.settings().upsert_many(&pairs).await?;
    Ok(ApiResponse::ok("Settings updated", settings))
}
