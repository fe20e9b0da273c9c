//! Scalar reference row kernels.

use crate::kernel::RowMoments;

/// Accumulates NCC moments of `img` against the zero-mean block row `tpl`.
///
/// Both slices must have the same length.
pub fn row_moments(tpl: &[f32], img: &[f32]) -> RowMoments {
    debug_assert_eq!(tpl.len(), img.len());
    let mut acc = RowMoments::default();
    for (&t, &value) in tpl.iter().zip(img.iter()) {
        acc.dot += t * value;
        acc.sum_i += value;
        acc.sum_i2 += value * value;
    }
    acc
}

/// Sum of squared differences between a block row and a moving row.
pub fn row_sq_diff(tpl: &[f32], img: &[f32]) -> f32 {
    debug_assert_eq!(tpl.len(), img.len());
    tpl.iter()
        .zip(img.iter())
        .map(|(&t, &value)| {
            let diff = value - t;
            diff * diff
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::{row_moments, row_sq_diff};

    #[test]
    fn row_moments_matches_hand_computation() {
        let tpl = [-1.0f32, 0.0, 1.0];
        let img = [2.0f32, 4.0, 8.0];
        let m = row_moments(&tpl, &img);
        assert!((m.dot - 6.0).abs() < 1e-6);
        assert!((m.sum_i - 14.0).abs() < 1e-6);
        assert!((m.sum_i2 - 84.0).abs() < 1e-6);
    }

    #[test]
    fn row_sq_diff_is_zero_for_identical_rows() {
        let row = [3.0f32, 1.0, 4.0, 1.0, 5.0];
        assert_eq!(row_sq_diff(&row, &row), 0.0);
        assert!((row_sq_diff(&[0.0, 0.0], &[3.0, 4.0]) - 25.0).abs() < 1e-6);
    }
}
