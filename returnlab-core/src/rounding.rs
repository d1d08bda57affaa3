//! Decimal rounding for reported statistics.
//!
//! Rule: round-half-to-even ("banker's rounding") applied to the exact
//! binary value the `f64` holds, not to its shortest decimal spelling.
//! `0.125` is exactly representable and is a true tie, so it rounds to
//! `0.12`; `0.015` is stored as `0.01499999...` and rounds down to `0.01`;
//! `0.005` is stored as `0.005000...0104` and rounds up to `0.01`.
//!
//! The value is widened to a [`Decimal`] first so no intermediate `f64`
//! arithmetic can create or remove a tie.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// Largest supported number of decimal places.
pub const MAX_DECIMAL_PLACES: u32 = 10;

/// Round `value` to `decimal_places` using round-half-to-even on its exact
/// binary value.
///
/// Non-finite inputs, and magnitudes too large for a `Decimal` (those are
/// whole numbers already), are returned unchanged. `decimal_places` above
/// [`MAX_DECIMAL_PLACES`] is clamped.
pub fn round_half_even(value: f64, decimal_places: u32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let Some(exact) = Decimal::from_f64_retain(value) else {
        return value;
    };

    let rounded = exact
        .round_dp_with_strategy(
            decimal_places.min(MAX_DECIMAL_PLACES),
            RoundingStrategy::MidpointNearestEven,
        )
        .to_f64()
        .unwrap_or(value);

    // Avoid reporting "-0.00".
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}
