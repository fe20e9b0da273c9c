//! SIMD row kernels using the `wide` crate.
//!
//! Rows are consumed eight lanes at a time with `f32x8`; the tail falls back
//! to scalar accumulation. Summation order differs from the scalar kernels,
//! so results agree only up to rounding.

use crate::kernel::RowMoments;
use wide::f32x8;

const LANES: usize = 8;

#[inline]
fn load_f32x8(slice: &[f32]) -> f32x8 {
    f32x8::from([
        slice[0], slice[1], slice[2], slice[3], slice[4], slice[5], slice[6], slice[7],
    ])
}

#[inline]
fn hsum(v: f32x8) -> f32 {
    v.to_array().iter().sum()
}

/// Accumulates NCC moments of `img` against the zero-mean block row `tpl`.
pub fn row_moments(tpl: &[f32], img: &[f32]) -> RowMoments {
    debug_assert_eq!(tpl.len(), img.len());
    let len = tpl.len().min(img.len());
    let simd_end = len / LANES * LANES;

    let mut dot_vec = f32x8::ZERO;
    let mut sum_vec = f32x8::ZERO;
    let mut sum2_vec = f32x8::ZERO;
    let mut i = 0;
    while i < simd_end {
        let t = load_f32x8(&tpl[i..]);
        let v = load_f32x8(&img[i..]);
        dot_vec += t * v;
        sum_vec += v;
        sum2_vec += v * v;
        i += LANES;
    }

    let mut acc = RowMoments {
        dot: hsum(dot_vec),
        sum_i: hsum(sum_vec),
        sum_i2: hsum(sum2_vec),
    };
    while i < len {
        let value = img[i];
        acc.dot += tpl[i] * value;
        acc.sum_i += value;
        acc.sum_i2 += value * value;
        i += 1;
    }
    acc
}

/// Sum of squared differences between a block row and a moving row.
pub fn row_sq_diff(tpl: &[f32], img: &[f32]) -> f32 {
    debug_assert_eq!(tpl.len(), img.len());
    let len = tpl.len().min(img.len());
    let simd_end = len / LANES * LANES;

    let mut acc_vec = f32x8::ZERO;
    let mut i = 0;
    while i < simd_end {
        let diff = load_f32x8(&img[i..]) - load_f32x8(&tpl[i..]);
        acc_vec += diff * diff;
        i += LANES;
    }

    let mut acc = hsum(acc_vec);
    while i < len {
        let diff = img[i] - tpl[i];
        acc += diff * diff;
        i += 1;
    }
    acc
}

#[cfg(test)]
mod tests {
    use super::{row_moments, row_sq_diff};
    use crate::kernel::scalar;

    #[test]
    fn simd_matches_scalar_on_long_rows() {
        let tpl: Vec<f32> = (0..19).map(|i| (i as f32 * 0.7).sin()).collect();
        let img: Vec<f32> = (0..19).map(|i| ((i * 37) % 11) as f32).collect();

        let fast = row_moments(&tpl, &img);
        let reference = scalar::row_moments(&tpl, &img);
        assert!((fast.dot - reference.dot).abs() < 1e-3);
        assert!((fast.sum_i - reference.sum_i).abs() < 1e-3);
        assert!((fast.sum_i2 - reference.sum_i2).abs() < 1e-2);

        let fast = row_sq_diff(&tpl, &img);
        let reference = scalar::row_sq_diff(&tpl, &img);
        assert!((fast - reference).abs() < 1e-2);
    }
}
