//! # Checkout Math
//!
//! The pure half of a checkout: request validation, line pricing, order
//! totals and transaction-code formatting. The database half (stock
//! decrements, sequence allocation, persistence) lives in `kasir-db`'s ledger
//! and calls into this module inside its write transaction.
//!
//! ## Flow
//! ```text
//! CheckoutRequest { user_id, items[(product_id, qty)], payment_method }
//!      │
//!      ▼
//! validate() ── empty cart / qty <= 0 / qty > 999 → ValidationError
//!      │
//!      ▼  (per line, in kasir-db: conditional stock decrement returns name + price)
//! PricedLine::new(product_id, name, server price, qty)
//!      │                       (checked: overflow → ValidationError)
//!      ▼
//! OrderTotals::from_lines(lines, 11%)
//!      subtotal = Σ price × qty   (checked)
//!      tax      = round_half_up(subtotal × 0.11)
//!      total    = subtotal + tax
//!      │
//!      ▼
//! transaction_code(today, next_sequence) → "TRX-20261016-0042"
//! ```
//!
//! Prices are never taken from the client; only product ids and quantities
//! are accepted.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{PaymentMethod, TaxRate};
use crate::validation::{validate_cart_size, validate_quantity};
use crate::TRANSACTION_CODE_PREFIX;

// =============================================================================
// Request
// =============================================================================

/// One requested line: a product and how many.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CheckoutLine {
    pub product_id: String,
    pub quantity: i64,
}

/// Everything a checkout needs.
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    /// Cashier ringing the sale.
    pub user_id: String,
    pub items: Vec<CheckoutLine>,
    pub payment_method: PaymentMethod,
}

impl CheckoutRequest {
    /// Rejects malformed carts before any database work.
    pub fn validate(&self) -> CoreResult<()> {
        validate_cart_size(self.items.len())?;

        for line in &self.items {
            if line.product_id.trim().is_empty() {
                return Err(ValidationError::required("product_id").into());
            }
            validate_quantity(line.quantity)?;
        }

        Ok(())
    }
}

// =============================================================================
// Pricing
// =============================================================================

/// A line priced from the catalog at sale time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedLine {
    pub product_id: String,
    pub product_name: String,
    pub unit_price: Money,
    pub quantity: i64,
    pub subtotal: Money,
}

impl PricedLine {
    /// Fails when `unit_price × quantity` does not fit an amount.
    pub fn new(
        product_id: impl Into<String>,
        product_name: impl Into<String>,
        unit_price: Money,
        quantity: i64,
    ) -> CoreResult<Self> {
        let subtotal = unit_price
            .checked_multiply_quantity(quantity)
            .ok_or_else(|| amount_out_of_range("subtotal"))?;

        Ok(PricedLine {
            product_id: product_id.into(),
            product_name: product_name.into(),
            unit_price,
            quantity,
            subtotal,
        })
    }
}

/// Header amounts of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderTotals {
    pub subtotal: Money,
    pub tax_rate: TaxRate,
    pub tax: Money,
    pub total: Money,
}

impl OrderTotals {
    /// Sums the lines and applies tax once, on the order subtotal.
    pub fn from_lines(lines: &[PricedLine], tax_rate: TaxRate) -> CoreResult<Self> {
        let subtotal = lines
            .iter()
            .try_fold(Money::zero(), |acc, l| acc.checked_add(l.subtotal))
            .ok_or_else(|| amount_out_of_range("subtotal"))?;
        let tax = subtotal.calculate_tax(tax_rate);
        let total = subtotal
            .checked_add(tax)
            .ok_or_else(|| amount_out_of_range("total"))?;

        Ok(OrderTotals {
            subtotal,
            tax_rate,
            tax,
            total,
        })
    }
}

fn amount_out_of_range(field: &str) -> CoreError {
    ValidationError::OutOfRange {
        field: field.to_string(),
        min: 0,
        max: i64::MAX,
    }
    .into()
}

// =============================================================================
// Transaction Codes
// =============================================================================

/// Key of the per-day sequence row: `YYYYMMDD`.
pub fn sequence_day(day: NaiveDate) -> String {
    day.format("%Y%m%d").to_string()
}

/// Formats `TRX-YYYYMMDD-NNNN`.
///
/// The sequence is zero-padded to four digits and simply grows wider past
/// 9999, so codes stay unique on very busy days.
///
/// ```rust
/// use chrono::NaiveDate;
/// use kasir_core::checkout::transaction_code;
///
/// let day = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
/// assert_eq!(transaction_code(day, 42), "TRX-20261016-0042");
/// ```
pub fn transaction_code(day: NaiveDate, sequence: i64) -> String {
    format!(
        "{}-{}-{:04}",
        TRANSACTION_CODE_PREFIX,
        sequence_day(day),
        sequence
    )
}

// =============================================================================
// Unit Tests
// =============================================================================
