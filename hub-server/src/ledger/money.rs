//! Money calculation utilities using rust_decimal for precision
//!
//! Amounts are stored and serialized as `f64` with two decimal places. Every
//! sum, product and balance comparison goes through `Decimal` first.

use super::error::{LedgerError, LedgerResult};
use rust_decimal::prelude::*;

/// Rounding strategy for monetary values (2 decimal places, half-up)
const DECIMAL_PLACES: u32 = 2;

/// Tolerance for monetary comparisons (0.01)
pub const MONEY_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Maximum allowed price per item
pub const MAX_PRICE: f64 = 1_000_000.0;
/// Maximum allowed quantity per cart line
pub const MAX_QUANTITY: i32 = 9999;

/// Validate that a f64 value is finite (not NaN, not Infinity)
#[inline]
pub fn require_finite(value: f64, field_name: &str) -> LedgerResult<()> {
    if !value.is_finite() {
        return Err(LedgerError::Validation(format!(
            "{} must be a finite number, got {}",
            field_name, value
        )));
    }
    Ok(())
}

/// Convert f64 to Decimal for calculation
#[inline]
pub fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default()
}

/// Convert Decimal back to f64, rounded to 2 decimal places
#[inline]
pub fn to_f64(value: Decimal) -> f64 {
    value
        .round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
        .to_f64()
        .unwrap_or_default()
}

/// Round an f64 amount to 2 decimal places
#[inline]
pub fn round_money(value: f64) -> f64 {
    to_f64(to_decimal(value))
}

/// Validate a voucher face value: finite, positive, at most `max`
pub fn validate_face_value(value: f64, max: f64) -> LedgerResult<f64> {
    require_finite(value, "face_value")?;
    let rounded = round_money(value);
    if rounded <= 0.0 {
        return Err(LedgerError::Validation(format!(
            "face_value must be positive, got {}",
            value
        )));
    }
    if rounded > max {
        return Err(LedgerError::Validation(format!(
            "face_value exceeds maximum allowed ({}), got {}",
            max, value
        )));
    }
    Ok(rounded)
}

/// Validate a cart line quantity
pub fn validate_quantity(quantity: i32) -> LedgerResult<()> {
    if quantity <= 0 {
        return Err(LedgerError::Validation(format!(
            "quantity must be positive, got {}",
            quantity
        )));
    }
    if quantity > MAX_QUANTITY {
        return Err(LedgerError::Validation(format!(
            "quantity exceeds maximum allowed ({}), got {}",
            MAX_QUANTITY, quantity
        )));
    }
    Ok(())
}

/// unit_price × quantity
pub fn line_total(unit_price: f64, quantity: i32) -> Decimal {
    to_decimal(unit_price) * Decimal::from(quantity)
}

/// True when two amounts differ by less than one cent
pub fn amounts_match(a: Decimal, b: Decimal) -> bool {
    (a - b).abs() < MONEY_TOLERANCE
}
