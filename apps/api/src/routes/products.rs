use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, patch};
use axum::{Json, Router};
use kasir_core::{CoreError, NewProduct, Product, ProductUpdate, Role};
use serde::Deserialize;

use crate::auth::CurrentUser;
use crate::error::ApiResult;
use crate::response::ApiResponse;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products).post(create_product))
        .route("/products/low-stock", get(low_stock))
        .route("/products/category/{category_id}", get(products_by_category))
        .route(
            "/products/{id}",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route("/products/{id}/stock", patch(adjust_stock))
}

#[derive(Debug, Default, Deserialize)]
struct ProductQuery {
    category_id: Option<String>,
    search: Option<String>,
}

/// Signed stock change: positive restocks, negative writes off.
///
/// Older clients send the field as `stock`.
#[derive(Debug, Deserialize)]
struct StockAdjustment {
    #[serde(alias = "stock")]
    quantity: i64,
}

async fn list_products(
    State(state): State<AppState>,
    _user: CurrentUser,
    query: Result<Query<ProductQuery>, QueryRejection>,
) -> ApiResult<ApiResponse<Vec<Product>>> {
    let Query(query) = query?;
    let products = state
        .db
        .products()
        .list(query.category_id.as_deref(), query.search.as_deref())
        .await?;
    Ok(ApiResponse::ok("Products retrieved", products))
}

async fn products_by_category(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(category_id): Path<String>,
) -> ApiResult<ApiResponse<Vec<Product>>> {
    let products = state.db.products().list(Some(category_id.as_str()), None).await?;
    Ok(ApiResponse::ok("Products retrieved", products))
}

async fn low_stock(State(state): State<AppState>, _user: CurrentUser) -> ApiResult<ApiResponse<Vec<Product>>> {
    let products = state.db.products().low_stock().await?;
    Ok(ApiResponse::ok("Low stock products retrieved", products))
}

async fn get_product(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<ApiResponse<Product>> {
    let product = state
        .db
        .products()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| CoreError::ProductNotFound(id))?;
    Ok(ApiResponse::ok("Product retrieved", product))
}

async fn create_product(
    State(state): State<AppState>,
    user: CurrentUser,
    body: Result<Json<NewProduct>, JsonRejection>,
) -> ApiResult<(StatusCode, ApiResponse<Product>)> {
    user.require(Role::Manager)?;
    let Json(new) = body?;
    let product = state.db.products().create(&new).await?;
    Ok(ApiResponse::created("Product created", product))
}

async fn update_product(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    body: Result<Json<ProductUpdate>, JsonRejection>,
) -> ApiResult<ApiResponse<Product>> {
    user.require(Role::Manager)?;
    let Json(update) = body?;
    let product = state.db.products().update(&id, &update).await?;
    Ok(ApiResponse::ok("Product updated", product))
}

async fn adjust_stock(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    body: Result<Json<StockAdjustment>, JsonRejection>,
) -> ApiResult<ApiResponse<Product>> {
    user.require(Role::Manager)?;
    let Json(adjustment) = body?;

    let products = state.db.products();
    products.adjust_stock(&id, adjustment.quantity).await?;
    let product = products
        .get_by_id(&id)
        .await?
        .ok_or_else(|| CoreError::ProductNotFound(id))?;
    Ok(ApiResponse::ok("Stock updated", product))
}

/// Archives the product; past transactions keep their snapshot.
async fn delete_product(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<ApiResponse<()>> {
    user.require(Role::Admin)?;
    state.db.products().archive(&id).await?;
    Ok(ApiResponse::ok("Product deleted", ()))
}
