use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};
use kasir_core::{CoreError, Role, User};
use kasir_db::UserUpdate;
use serde::Deserialize;

use crate::auth::CurrentUser;
use crate::error::ApiResult;
use crate::response::ApiResponse;
use crate::services::auth_service::{ChangePasswordRequest, CreateUserRequest};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route("/users/profile", get(profile))
        .route("/users/password", put(change_password))
        .route("/users/{id}", get(get_user).put(update_user).delete(delete_user))
}

#[derive(Debug, Deserialize)]
struct UpdateUserRequest {
    name: String,
    email: String,
    role: Role,
    #[serde(default = "active_by_default")]
    is_active: bool,
}

fn active_by_default() -> bool {
    true
}

async fn profile(State(state): State<AppState>, user: CurrentUser) -> ApiResult<ApiResponse<User>> {
    let profile = state
        .db
        .users()
        .get_by_id(&user.id)
        .await?
        .ok_or_else(|| CoreError::UserNotFound(user.id.clone()))?;
    Ok(ApiResponse::ok("Profile retrieved", profile))
}

async fn change_password(
    State(state): State<AppState>,
    user: CurrentUser,
    body: Result<Json<ChangePasswordRequest>, JsonRejection>,
) -> ApiResult<ApiResponse<()>> {
    let Json(request) = body?;
    state.auth().change_password(&user.id, &request).await?;
    Ok(ApiResponse::ok("Password changed", ()))
}

async fn list_users(State(state): State<AppState>, user: CurrentUser) -> ApiResult<ApiResponse<Vec<User>>> {
    user.require(Role::Admin)?;
    let users = state.db.users().list().await?;
    Ok(ApiResponse::ok("Users retrieved", users))
}

async fn create_user(
    State(state): State<AppState>,
    user: CurrentUser,
    body: Result<Json<CreateUserRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, ApiResponse<User>)> {
    user.require(Role::Admin)?;
    let Json(request) = body?;
    let created = state.auth().create_user(&request).await?;
    Ok(ApiResponse::created("User created", created))
}

async fn get_user(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<ApiResponse<User>> {
    user.require(Role::Admin)?;
    let found = state
        .db
        .users()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| CoreError::UserNotFound(id))?;
    Ok(ApiResponse::ok("User retrieved", found))
}

async fn update_user(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    body: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> ApiResult<ApiResponse<User>> {
    user.require(Role::Admin)?;
    let Json(request) = body?;

    let updated = state
        .db
        .users()
        .update(
            &id,
            &UserUpdate {
                name: request.name,
                email: request.email,
                role: request.role,
                is_active: request.is_active,
            },
        )
        .await?;
    Ok(ApiResponse::ok("User updated", updated))
}

async fn delete_user(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<ApiResponse<()>> {
    user.require(Role::Admin)?;
    state.db.users().delete(&id).await?;
    Ok(ApiResponse::ok("User deleted", ()))
}
