//! N-dimensional images with physical geometry.
//!
//! An `Image` owns the pixels of its *buffered region*, which must lie inside
//! the largest possible region of its geometry. The buffered region is what a
//! consumer can actually read; cropping shrinks it without touching the
//! geometry. Pixels are stored with axis 0 varying fastest, so runs along
//! axis 0 are contiguous slices.

use crate::util::{BlockMatchError, BlockMatchResult};

pub mod geometry;
pub mod region;

#[cfg(feature = "image-io")]
pub mod io;

pub use geometry::ImageGeometry;
pub use region::{ImageRegion, RegionIter};

/// Owned N-dimensional image.
#[derive(Clone, Debug, PartialEq)]
pub struct Image<T, const D: usize> {
    geometry: ImageGeometry<D>,
    buffered_region: ImageRegion<D>,
    data: Vec<T>,
}

impl<T, const D: usize> Image<T, D> {
    /// Wraps a buffer covering `buffered_region`.
    pub fn from_vec(
        geometry: ImageGeometry<D>,
        buffered_region: ImageRegion<D>,
        data: Vec<T>,
    ) -> BlockMatchResult<Self> {
        if buffered_region.is_empty() {
            return Err(BlockMatchError::InvalidDimensions {
                size: buffered_region.size().to_vec(),
            });
        }
        let largest = geometry.largest_region();
        if !largest.contains_region(&buffered_region) {
            return Err(BlockMatchError::RegionOutOfBounds {
                region: buffered_region.to_string(),
                bounds: largest.to_string(),
            });
        }
        let needed = buffered_region.num_pixels();
        if data.len() != needed {
            return Err(BlockMatchError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        Ok(Self {
            geometry,
            buffered_region,
            data,
        })
    }

    /// Builds an image over the largest region by evaluating `f` at every index.
    pub fn from_fn<F>(geometry: ImageGeometry<D>, mut f: F) -> BlockMatchResult<Self>
    where
        F: FnMut([i64; D]) -> T,
    {
        let region = geometry.largest_region();
        let data = region.iter().map(&mut f).collect();
        Self::from_vec(geometry, region, data)
    }

    pub fn geometry(&self) -> &ImageGeometry<D> {
        &self.geometry
    }

    /// Returns the largest possible region.
    pub fn largest_region(&self) -> ImageRegion<D> {
        self.geometry.largest_region()
    }

    /// Returns the region backed by pixel data.
    pub fn buffered_region(&self) -> ImageRegion<D> {
        self.buffered_region
    }

    /// Returns the pixel buffer in storage order.
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Returns the pixel at `index` if it is buffered.
    pub fn get(&self, index: &[i64; D]) -> Option<&T> {
        let offset = self.buffered_region.offset_of(index)?;
        self.data.get(offset)
    }

    /// Returns a mutable pixel at `index` if it is buffered.
    pub fn get_mut(&mut self, index: &[i64; D]) -> Option<&mut T> {
        let offset = self.buffered_region.offset_of(index)?;
        self.data.get_mut(offset)
    }

    /// Writes the pixel at `index`.
    pub fn set(&mut self, index: &[i64; D], value: T) -> BlockMatchResult<()> {
        let bounds = self.buffered_region;
        let pixel = self
            .get_mut(index)
            .ok_or_else(|| BlockMatchError::RegionOutOfBounds {
                region: ImageRegion::new(*index, [1; D]).to_string(),
                bounds: bounds.to_string(),
            })?;
        *pixel = value;
        Ok(())
    }

    /// Returns `len` contiguous pixels along axis 0 starting at `start`.
    pub fn row(&self, start: &[i64; D], len: usize) -> Option<&[T]> {
        if len == 0 {
            return Some(&[]);
        }
        let first = self.buffered_region.offset_of(start)?;
        let mut last_index = *start;
        if D > 0 {
            last_index[0] += len as i64 - 1;
        }
        self.buffered_region.offset_of(&last_index)?;
        self.data.get(first..first + len)
    }
}

impl<T: Clone, const D: usize> Image<T, D> {
    /// Allocates an image over the largest region filled with `value`.
    pub fn filled(geometry: ImageGeometry<D>, value: T) -> BlockMatchResult<Self> {
        let region = geometry.largest_region();
        let data = vec![value; region.num_pixels()];
        Self::from_vec(geometry, region, data)
    }

    /// Copies `region` into a new image with the same geometry.
    ///
    /// The copy's buffered region is `region`, which must be buffered here.
    pub fn crop(&self, region: &ImageRegion<D>) -> BlockMatchResult<Self> {
        if !self.buffered_region.contains_region(region) || region.is_empty() {
            return Err(BlockMatchError::RegionOutOfBounds {
                region: region.to_string(),
                bounds: self.buffered_region.to_string(),
            });
        }
        let mut data = Vec::with_capacity(region.num_pixels());
        let row_len = if D > 0 { region.size()[0] } else { 1 };
        let mut row_region = *region;
        if D > 0 {
            let mut size = region.size();
            size[0] = 1;
            row_region = ImageRegion::new(region.index(), size);
        }
        for start in row_region.iter() {
            let row = self
                .row(&start, row_len)
                .ok_or_else(|| BlockMatchError::RegionOutOfBounds {
                    region: region.to_string(),
                    bounds: self.buffered_region.to_string(),
                })?;
            data.extend_from_slice(row);
        }
        Self::from_vec(self.geometry.clone(), *region, data)
    }
}
