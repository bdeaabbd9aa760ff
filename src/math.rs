//! Fixed-point helpers.
//!
//! `Decimal` already carries 18 decimal places, so a scaled multiply or divide is a plain
//! operation on it. The helpers here add overflow checking and route products through
//! `PreciseDecimal` so that `a * b / c` does not lose the low digits of `a * b` before dividing.

use crate::errors::BondError;
use scrypto::prelude::*;

/// `a * b / c`, computed in `PreciseDecimal` and truncated toward zero.
pub fn mul_div(a: Decimal, b: Decimal, c: Decimal) -> Result<Decimal, BondError> {
    if c.is_zero() {
        return Err(BondError::MathOverflow);
    }
    PreciseDecimal::from(a)
        .checked_mul(b)
        .and_then(|product| product.checked_div(c))
        .and_then(|quotient| quotient.checked_truncate(RoundingMode::ToZero))
        .ok_or(BondError::MathOverflow)
}

pub fn mul(a: Decimal, b: Decimal) -> Result<Decimal, BondError> {
    a.checked_mul(b).ok_or(BondError::MathOverflow)
}

pub fn div(a: Decimal, b: Decimal) -> Result<Decimal, BondError> {
    if b.is_zero() {
        return Err(BondError::MathOverflow);
    }
    a.checked_div(b).ok_or(BondError::MathOverflow)
}

/// Share of `amount` accrued over `elapsed` seconds of a `period`: `amount * elapsed / period`.
///
/// Negative elapsed time counts as zero and the result never exceeds `amount`.
pub fn pro_rata(amount: Decimal, elapsed: i64, period: i64) -> Result<Decimal, BondError> {
    if elapsed <= 0 || amount.is_zero() {
        return Ok(Decimal::ZERO);
    }
    if period <= 0 || elapsed >= period {
        return Ok(amount);
    }
    mul_div(amount, Decimal::from(elapsed), Decimal::from(period))
}

/// `a - b`, clamped at zero.
pub fn saturating_sub(a: Decimal, b: Decimal) -> Decimal {
    if b >= a {
        Decimal::ZERO
    } else {
        a - b
    }
}
