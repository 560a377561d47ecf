//! # Repository Module
//!
//! Database repository implementations for Kasir POS.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  HTTP handler                                                          │
//! │       │                                                                 │
//! │       │  state.db.products().list(category, search)                    │
//! │       ▼                                                                 │
//! │  ProductRepository                                                     │
//! │  ├── list(&self, category_id, search)                                  │
//! │  ├── get_by_id(&self, id)                                              │
//! │  ├── create(&self, new_product)                                        │
//! │  └── adjust_stock(&self, id, delta) ──► inventory::apply_delta         │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`CategoryRepository`] - Category CRUD
//! - [`ProductRepository`] - Product CRUD, search, stock adjustment
//! - [`UserRepository`] - User directory
//! - [`TransactionRepository`] - Ledger reads (the writes live in [`crate::ledger`])
//! - [`SettingRepository`] - Key/value store settings
//! - [`ReportRepository`] - Read-only rollups over the ledger
//!
//! Loaders that must also run inside a ledger write transaction take a
//! `&mut SqliteConnection` and are `pub(crate)`.

pub mod category;
pub mod product;
pub mod report;
pub mod setting;
pub mod transaction;
pub mod user;

pub use category::CategoryRepository;
pub use product::ProductRepository;
pub use report::ReportRepository;
pub use setting::SettingRepository;
pub use transaction::TransactionRepository;
pub use user::UserRepository;
