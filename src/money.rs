//! Currency rounding and comparison helpers.
//!
//! Amounts are plain `f64` dollars. Every amount that leaves the
//! application is rounded to two decimal places, and equality checks go
//! through whole cents so floating point noise cannot break them.

/// Round an amount to two decimal places.
pub fn round_to_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// Convert an amount to whole cents.
///
/// Amount equality checks must compare cents, never raw `f64` values.
pub fn to_cents(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}
