//! # Kasir API
//!
//! JSON-over-HTTP surface of Kasir POS. Handlers are thin: they extract the
//! request, check the caller's role, call into `kasir-db` and wrap the
//! result in the response envelope.
//!
//! ## Request Flow
//! ```text
//! ┌──────────┐   ┌────────────┐   ┌──────────────┐   ┌──────────────────┐
//! │  client  │──►│ TraceLayer │──►│ require_auth │──►│ handler          │
//! └──────────┘   │ CorsLayer  │   │ (protected)  │   │  user.require()? │
//!                └────────────┘   └──────────────┘   │  repo / ledger   │
//!                                                    │  ApiResponse     │
//!                                                    └──────────────────┘
//! ```
//!
//! The router is built by [`build_router`] so integration tests can drive it
//! without binding a socket.

pub mod auth;
pub mod config;
pub mod error;
pub mod response;
pub mod routes;
pub mod services;

use std::sync::Arc;

use axum::middleware;
use axum::routing::get;
use axum::Router;
use kasir_db::Database;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::JwtManager;
use crate::config::ApiConfig;
use crate::services::AuthService;

/// Shared application state, cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub jwt: Arc<JwtManager>,
    pub config: Arc<ApiConfig>,
}

impl AppState {
    pub fn new(db: Database, config: ApiConfig) -> Self {
        let jwt = JwtManager::new(config.jwt_secret.clone(), config.jwt_expiry_secs);
        AppState {
            db,
            jwt: Arc::new(jwt),
            config: Arc::new(config),
        }
    }

    pub fn auth(&self) -> AuthService {
        AuthService::new(self.db.clone(), self.jwt.clone())
    }
}

/// Assembles the full application router.
pub fn build_router(state: AppState) -> Router {
    let public = Router::new().merge(routes::auth::router());

    let protected = Router::new()
        .merge(routes::users::router())
        .merge(routes::categories::router())
        .merge(routes::products::router())
        .merge(routes::transactions::router())
        .merge(routes::settings::router())
        .merge(routes::reports::router())
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::require_auth));

    Router::new()
        .route("/health", get(routes::health::health))
        .nest("/api/v1", public.merge(protected))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
