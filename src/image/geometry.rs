//! Physical-space geometry of an image grid.

use nalgebra::{SMatrix, SVector};

use crate::image::region::ImageRegion;
use crate::util::math::round_half_up;
use crate::util::{BlockMatchError, BlockMatchResult};

/// Origin, spacing, direction and largest possible region of an image.
///
/// A continuous index `i` maps to the physical point
/// `origin + direction * (spacing ⊙ i)`. Column `k` of the direction matrix
/// is the physical orientation of index axis `k`.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageGeometry<const D: usize> {
    origin: SVector<f64, D>,
    spacing: SVector<f64, D>,
    direction: SMatrix<f64, D, D>,
    largest_region: ImageRegion<D>,
}

impl<const D: usize> ImageGeometry<D> {
    /// Unit spacing, zero origin and identity direction over `largest_region`.
    pub fn new(largest_region: ImageRegion<D>) -> Self {
        Self {
            origin: SVector::zeros(),
            spacing: SVector::repeat(1.0),
            direction: SMatrix::identity(),
            largest_region,
        }
    }

    /// Sets the physical position of index zero.
    pub fn with_origin(mut self, origin: [f64; D]) -> Self {
        self.origin = SVector::from(origin);
        self
    }

    /// Sets the physical pixel spacing.
    pub fn with_spacing(mut self, spacing: [f64; D]) -> Self {
        self.spacing = SVector::from(spacing);
        self
    }

    /// Sets the direction cosine matrix.
    pub fn with_direction(mut self, direction: SMatrix<f64, D, D>) -> Self {
        self.direction = direction;
        self
    }

    /// Replaces the largest possible region.
    pub fn with_largest_region(mut self, region: ImageRegion<D>) -> Self {
        self.largest_region = region;
        self
    }

    pub fn origin(&self) -> [f64; D] {
        self.origin.into()
    }

    pub fn spacing(&self) -> [f64; D] {
        self.spacing.into()
    }

    pub fn direction(&self) -> &SMatrix<f64, D, D> {
        &self.direction
    }

    pub fn largest_region(&self) -> ImageRegion<D> {
        self.largest_region
    }

    /// Checks that spacing is positive and the direction is invertible.
    pub fn validate(&self) -> BlockMatchResult<()> {
        if self.spacing.iter().any(|s| !s.is_finite() || *s <= 0.0) {
            return Err(BlockMatchError::InvalidGeometry {
                reason: "spacing must be finite and positive",
            });
        }
        if self.origin.iter().any(|o| !o.is_finite()) {
            return Err(BlockMatchError::InvalidGeometry {
                reason: "origin must be finite",
            });
        }
        self.inverse_direction().map(|_| ())
    }

    fn inverse_direction(&self) -> BlockMatchResult<SMatrix<f64, D, D>> {
        let singular = BlockMatchError::InvalidGeometry {
            reason: "direction matrix is singular",
        };
        if self.direction.iter().any(|v| !v.is_finite()) {
            return Err(singular);
        }
        self.direction.try_inverse().ok_or(singular)
    }

    /// Maps a continuous index to a physical point.
    pub fn continuous_index_to_physical(&self, index: &[f64; D]) -> [f64; D] {
        let scaled = self.spacing.component_mul(&SVector::from(*index));
        (self.origin + self.direction * scaled).into()
    }

    /// Maps an integer index to a physical point.
    pub fn index_to_physical(&self, index: &[i64; D]) -> [f64; D] {
        self.continuous_index_to_physical(&index.map(|i| i as f64))
    }

    /// Maps a physical point to a continuous index.
    pub fn physical_to_continuous_index(&self, point: &[f64; D]) -> BlockMatchResult<[f64; D]> {
        let inverse = self.inverse_direction()?;
        let delta = SVector::from(*point) - self.origin;
        Ok((inverse * delta).component_div(&self.spacing).into())
    }

    /// Maps a physical point to the nearest integer index (halves round up).
    pub fn physical_to_index(&self, point: &[f64; D]) -> BlockMatchResult<[i64; D]> {
        let continuous = self.physical_to_continuous_index(point)?;
        Ok(continuous.map(round_half_up))
    }
}
