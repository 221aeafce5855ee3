//! Bounds for client-supplied decimals, matching the schema's column types.
//!
//! Quantities are `DECIMAL(14, 3)`, prices `DECIMAL(14, 2)` and totals
//! `DECIMAL(16, 2)`. Anything outside those ranges is rejected before it
//! reaches arithmetic or the database.

use rust_decimal::Decimal;

use crate::error::AppError;

fn max_quantity() -> Decimal {
    Decimal::new(99_999_999_999_999, 3)
}

fn max_price() -> Decimal {
    Decimal::new(999_999_999_999_99, 2)
}

fn max_total() -> Decimal {
    Decimal::new(99_999_999_999_999_99, 2)
}

fn max_ratio() -> Decimal {
    Decimal::new(9_999_999_999, 4)
}

fn within(value: Decimal, max: Decimal, field: &str) -> Result<Decimal, AppError> {
    if value > max {
        return Err(AppError::validation(format!("{field} is too large (max {max})")));
    }
    Ok(value)
}

/// A strictly positive quantity.
pub fn positive_quantity(value: Decimal, field: &str) -> Result<Decimal, AppError> {
    if value <= Decimal::ZERO {
        return Err(AppError::validation(format!("{field} must be greater than 0")));
    }
    within(value, max_quantity(), field)
}

/// A quantity that may be zero, such as stock on hand or safety stock.
pub fn stock_quantity(value: Decimal, field: &str) -> Result<Decimal, AppError> {
    if value < Decimal::ZERO {
        return Err(AppError::validation(format!("{field} cannot be negative")));
    }
    within(value, max_quantity(), field)
}

pub fn price(value: Decimal, field: &str) -> Result<Decimal, AppError> {
    if value < Decimal::ZERO {
        return Err(AppError::validation(format!("{field} cannot be negative")));
    }
    within(value, max_price(), field)
}

pub fn total(value: Decimal, field: &str) -> Result<Decimal, AppError> {
    if value < Decimal::ZERO {
        return Err(AppError::validation(format!("{field} cannot be negative")));
    }
    within(value, max_total(), field)
}

/// A composition ratio or processing factor, `DECIMAL(10, 4)`.
pub fn ratio(value: Decimal, field: &str) -> Result<Decimal, AppError> {
    if value < Decimal::ZERO {
        return Err(AppError::validation(format!("{field} cannot be negative")));
    }
    within(value, max_ratio(), field)
}

/// `a × b`, or a 400 naming `what` when the product does not fit a decimal.
pub fn checked_product(a: Decimal, b: Decimal, what: &str) -> Result<Decimal, AppError> {
    a.checked_mul(b)
        .ok_or_else(|| AppError::validation(format!("{what} is too large")))
}

/// `quantity × price` rounded to cents, within the total column's range.
pub fn line_total(quantity: Decimal, price: Decimal, field: &str) -> Result<Decimal, AppError> {
    let product = checked_product(quantity, price, field)?.round_dp(2);
    total(product, field)
}
