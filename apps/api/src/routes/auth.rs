use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use kasir_core::User;

use crate::error::ApiResult;
use crate::response::ApiResponse;
use crate::services::auth_service::{LoginRequest, LoginResponse, RegisterRequest};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/register", post(register))
}

async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<ApiResponse<LoginResponse>> {
    let Json(request) = body?;
    let session = state.auth().login(&request).await?;
    Ok(ApiResponse::ok("Login successful", session))
}

async fn register(
    State(state): State<AppState>,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, ApiResponse<User>)> {
    let Json(request) = body?;
    let user = state.auth().register(&request).await?;
    Ok(ApiResponse::created("Registration successful", user))
}
