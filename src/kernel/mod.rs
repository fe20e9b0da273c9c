//! Row kernels used by the metric strategies.
//!
//! Blocks are evaluated one axis-0 run at a time: the block row and the
//! matching moving-image row are both contiguous slices. The scalar kernels
//! are the reference; the `simd` feature swaps in `wide`-based versions with
//! the same signatures.

use std::ops::AddAssign;

pub mod scalar;

#[cfg(feature = "simd")]
pub mod simd;

#[cfg(not(feature = "simd"))]
pub use scalar::{row_moments, row_sq_diff};
#[cfg(feature = "simd")]
pub use simd::{row_moments, row_sq_diff};

/// Partial sums for zero-mean normalized cross correlation.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RowMoments {
    /// Sum of `block' * moving` where `block'` is zero-mean.
    pub dot: f32,
    /// Sum of moving intensities.
    pub sum_i: f32,
    /// Sum of squared moving intensities.
    pub sum_i2: f32,
}

impl AddAssign for RowMoments {
    fn add_assign(&mut self, rhs: Self) {
        self.dot += rhs.dot;
        self.sum_i += rhs.sum_i;
        self.sum_i2 += rhs.sum_i2;
    }
}
