//! # kasir-core: Pure Business Logic for Kasir POS
//!
//! Domain types and the arithmetic behind checkout and reporting, with no
//! I/O of any kind. The database crate and the HTTP app both build on it.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Kasir POS Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    HTTP API (axum)                              │   │
//! │  │    /auth  /products  /transactions  /reports  /settings         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ kasir-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │ checkout  │  │  report   │  │   │
//! │  │   │  Product  │  │   Money   │  │ pricing   │  │ buckets   │  │   │
//! │  │   │Transaction│  │  TaxRate  │  │ codes     │  │ shares    │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    kasir-db (Database Layer)                    │   │
//! │  │        SQLite repositories, ledger, inventory adjuster          │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Category, Product, Transaction, User, ...)
//! - [`money`] - Money type with integer arithmetic
//! - [`checkout`] - Line pricing, order totals, transaction codes
//! - [`report`] - Day bucketing and payment shares
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Example Usage
//!
//! ```rust
//! use kasir_core::money::Money;
//! use kasir_core::CHECKOUT_TAX_RATE;
//!
//! let subtotal = Money::from_minor(10_000);
//! let tax = subtotal.calculate_tax(CHECKOUT_TAX_RATE);
//!
//! assert_eq!(tax.minor(), 1_100);
//! assert_eq!((subtotal + tax).minor(), 11_100);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod checkout;
pub mod error;
pub mod money;
pub mod report;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Tax applied to every checkout: 11% (1100 basis points).
///
/// The `tax_rate` store setting is display-only; checkout always uses this.
pub const CHECKOUT_TAX_RATE: TaxRate = TaxRate::from_bps(1100);

/// Maximum lines allowed in a single checkout.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity of a single line.
///
/// Prevents accidental over-ordering (typing 1000 instead of 10).
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Highest unit price a product may carry, in minor units (Rp100.000.000.000).
///
/// With `MAX_ITEM_QUANTITY` and `MAX_CART_ITEMS` this keeps every order
/// total well inside i64.
pub const MAX_PRICE: i64 = 100_000_000_000;

/// Highest stock a product may hold.
pub const MAX_STOCK: i64 = 1_000_000_000;

/// Products with stock strictly below this count are "low stock".
pub const LOW_STOCK_THRESHOLD: i64 = 10;

/// Prefix of every human-readable transaction code.
pub const TRANSACTION_CODE_PREFIX: &str = "TRX";
