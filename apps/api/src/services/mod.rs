//! Business flows that span more than one repository call.
//!
//! Handlers stay thin: extract, authorize, call a service or repository,
//! wrap the result in the envelope.

pub mod auth_service;

pub use auth_service::AuthService;
