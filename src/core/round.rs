//! Decimal rounding used for display values.

/// Round to `decimals` places, halves away from zero.
pub fn round_to(x: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (x * scale).round() / scale
}

pub fn round2(x: f64) -> f64 {
    round_to(x, 2)
}

pub fn round3(x: f64) -> f64 {
    round_to(x, 3)
}
