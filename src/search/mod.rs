//! Search-region image construction.
//!
//! Lays a regular grid of block centers over the fixed image and attaches to
//! every site a window of candidate centers in the moving image. The grid
//! geometry becomes the geometry of the displacement image.

use crate::image::{Image, ImageGeometry, ImageRegion};
use crate::registration::propagate::footprint_radius;
use crate::registration::{BlockRadius, SearchRegionImage};
use crate::util::{BlockMatchError, BlockMatchResult};

/// Builds search-region images on a block grid.
#[derive(Clone, Debug, PartialEq)]
pub struct SearchRegionInitializer<const D: usize> {
    block_radius: BlockRadius<D>,
    search_radius: [usize; D],
    overlap: f64,
}

impl<const D: usize> SearchRegionInitializer<D> {
    /// Creates an initializer with non-overlapping blocks.
    pub fn new(block_radius: BlockRadius<D>, search_radius: [usize; D]) -> Self {
        Self {
            block_radius,
            search_radius,
            overlap: 0.0,
        }
    }

    /// Fraction of a block shared with its grid neighbour, in `[0, 1)`.
    pub fn with_overlap(mut self, overlap: f64) -> Self {
        self.overlap = overlap;
        self
    }

    pub fn block_radius(&self) -> BlockRadius<D> {
        self.block_radius
    }

    pub fn search_radius(&self) -> [usize; D] {
        self.search_radius
    }

    pub fn overlap(&self) -> f64 {
        self.overlap
    }

    /// Grid step per axis in fixed index units.
    pub fn step(&self) -> BlockMatchResult<[usize; D]> {
        if !(0.0..1.0).contains(&self.overlap) {
            return Err(BlockMatchError::Configuration(
                "block overlap must lie in [0, 1)",
            ));
        }
        Ok(self
            .block_radius
            .extent()
            .map(|extent| ((extent as f64 * (1.0 - self.overlap)).round() as usize).max(1)))
    }

    /// Builds the search-region image for the given fixed and moving grids.
    ///
    /// Search regions are clipped so every candidate block stays inside the
    /// moving image; a site whose window is clipped away gets an empty region.
    pub fn build(
        &self,
        fixed: &ImageGeometry<D>,
        moving: &ImageGeometry<D>,
    ) -> BlockMatchResult<SearchRegionImage<D>> {
        fixed.validate()?;
        moving.validate()?;
        let step = self.step()?;
        let radius = self.block_radius.as_array();
        let extent = self.block_radius.extent();
        let fixed_region = fixed.largest_region();
        let fixed_size = fixed_region.size();

        let mut sites = [0usize; D];
        let mut first = fixed_region.index();
        let mut spacing = fixed.spacing();
        for axis in 0..D {
            if fixed_size[axis] < extent[axis] {
                return Err(BlockMatchError::Configuration(
                    "fixed image is smaller than one block",
                ));
            }
            sites[axis] = (fixed_size[axis] - extent[axis]) / step[axis] + 1;
            first[axis] += radius[axis] as i64;
            spacing[axis] *= step[axis] as f64;
        }

        let grid = ImageGeometry::new(ImageRegion::from_size(sites))
            .with_origin(fixed.index_to_physical(&first))
            .with_spacing(spacing)
            .with_direction(*fixed.direction());

        let valid = moving
            .largest_region()
            .erode(footprint_radius(&self.block_radius, fixed, moving));
        let mut regions = Vec::with_capacity(grid.largest_region().num_pixels());
        for site in grid.largest_region().iter() {
            let center = moving.physical_to_index(&grid.index_to_physical(&site))?;
            regions.push(ImageRegion::centered(center, self.search_radius).intersect(&valid));
        }
        let largest = grid.largest_region();
        Image::from_vec(grid, largest, regions)
    }
}
