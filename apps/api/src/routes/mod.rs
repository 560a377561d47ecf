//! # HTTP Routes
//!
//! One module per resource, each exposing a `router()` mounted under
//! `/api/v1` by [`crate::build_router`].
//!
//! ```text
//! /health                      public
//! /api/v1/auth/*               public
//! /api/v1/users/*              bearer token
//! /api/v1/categories/*         bearer token
//! /api/v1/products/*           bearer token
//! /api/v1/transactions/*       bearer token
//! /api/v1/settings/*           bearer token
//! /api/v1/reports/*            bearer token
//! ```
//!
//! Role checks happen inside handlers via [`crate::auth::CurrentUser::require`].

pub mod auth;
pub mod categories;
pub mod health;
pub mod products;
pub mod reports;
pub mod settings;
pub mod transactions;
pub mod users;
