//! Money calculation utilities using rust_decimal for precision
//!
//! Wire amounts are `f64`. Every sum and product is done in `Decimal`, then
//! rounded half-up to 2 places on the way back out.

use rust_decimal::prelude::*;

use crate::{ClientError, ClientResult};

/// Rounding strategy for monetary values (2 decimal places, half-up)
const DECIMAL_PLACES: u32 = 2;

/// Maximum allowed quantity per line
pub const MAX_QUANTITY: u32 = 9999;

/// Convert f64 to Decimal; NaN and infinities become zero
#[inline]
pub fn to_decimal(value: f64) -> Decimal {
    if !value.is_finite() {
        return Decimal::ZERO;
    }
    Decimal::from_f64(value).unwrap_or_default()
}

/// Round to 2 decimal places, half-up
#[inline]
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// Convert Decimal back to f64, rounded to 2 decimal places
#[inline]
pub fn to_f64(value: Decimal) -> f64 {
    round_money(value).to_f64().unwrap_or_default()
}

/// `unit_price * quantity`, exact
#[inline]
pub fn line_total(unit_price: f64, quantity: u32) -> Decimal {
    to_decimal(unit_price) * Decimal::from(quantity)
}

/// Check a requested aggregate quantity before anything touches the network
pub fn validate_target(target: i64) -> ClientResult<u32> {
    if target < 0 {
        return Err(ClientError::Validation(format!(
            "quantity must not be negative, got {}",
            target
        )));
    }
    if target > i64::from(MAX_QUANTITY) {
        return Err(ClientError::Validation(format!(
            "quantity exceeds maximum allowed ({}), got {}",
            MAX_QUANTITY, target
        )));
    }
    // bounded above
    Ok(target as u32)
}
