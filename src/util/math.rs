//! Numeric helpers shared by geometry code.

/// Rounds half up, matching index rounding of physical points.
pub(crate) fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}
