use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use kasir_core::{Category, CoreError, Role};
use serde::Deserialize;

use crate::auth::CurrentUser;
use crate::error::ApiResult;
use crate::response::ApiResponse;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/categories", get(list_categories).post(create_category))
        .route(
            "/categories/{id}",
            get(get_category).put(update_category).delete(delete_category),
        )
}

#[derive(Debug, Deserialize)]
struct CategoryRequest {
    name: String,
}

async fn list_categories(State(state): State<AppState>, _user: CurrentUser) -> ApiResult<ApiResponse<Vec<Category>>> {
    let categories = state.db.categories().list().await?;
    Ok(ApiResponse::ok("Categories retrieved", categories))
}

async fn get_category(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<ApiResponse<Category>> {
    let category = state
        .db
        .categories()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| CoreError::CategoryNotFound(id))?;
    Ok(ApiResponse::ok("Category retrieved", category))
}

async fn create_category(
    State(state): State<AppState>,
    user: CurrentUser,
    body: Result<Json<CategoryRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, ApiResponse<Category>)> {
    user.require(Role::Manager)?;
    let Json(request) = body?;
    let category = state.db.categories().create(&request.name).await?;
    Ok(ApiResponse::created("Category created", category))
}

async fn update_category(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    body: Result<Json<CategoryRequest>, JsonRejection>,
) -> ApiResult<ApiResponse<Category>> {
    user.require(Role::Manager)?;
    let Json(request) = body?;
    let category = state.db.categories().update(&id, &request.name).await?;
    Ok(ApiResponse::ok("Category updated", category))
}

async fn delete_category(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<ApiResponse<()>> {
    user.require(Role::Admin)?;
    state.db.categories().delete(&id).await?;
    Ok(ApiResponse::ok("Category deleted", ()))
}
