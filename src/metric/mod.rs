//! Metric computation strategies.
//!
//! A metric strategy compares one fixed-image block against every candidate
//! block-center position of a search region in the moving image and returns
//! a metric image of scores (larger is better). The metric image's largest
//! region is the search region itself and its origin, spacing and direction
//! are the moving image's, so a metric index is the moving index of the
//! candidate center.

use crate::image::{Image, ImageRegion};
use crate::util::{BlockMatchError, BlockMatchResult};

mod mean_squares;
mod ncc;
mod plan;

pub use mean_squares::MeanSquares;
pub use ncc::NormalizedCrossCorrelation;
pub use plan::BlockPlan;

/// Scalar field of similarity scores over candidate centers.
pub type MetricImage<const D: usize> = Image<f32, D>;

/// Fixed-image pixels of one block and the index of its center.
///
/// Blocks at the image border are clipped, so the pixel region need not be
/// centered on `center`.
#[derive(Clone, Debug)]
pub struct FixedBlock<const D: usize> {
    pixels: Image<f32, D>,
    center: [i64; D],
}

impl<const D: usize> FixedBlock<D> {
    pub fn new(pixels: Image<f32, D>, center: [i64; D]) -> Self {
        Self { pixels, center }
    }

    /// Returns the block pixels; their buffered region is the block region.
    pub fn pixels(&self) -> &Image<f32, D> {
        &self.pixels
    }

    /// Returns the fixed-image index of the block center.
    pub fn center(&self) -> [i64; D] {
        self.center
    }

    /// Returns the fixed-image region covered by the block.
    pub fn region(&self) -> ImageRegion<D> {
        self.pixels.buffered_region()
    }
}

/// Computes a metric image for one block and one search region.
///
/// Implementations must be deterministic. The orchestrator gives every worker
/// its own clone, so `compute` may mutate scratch state freely.
pub trait MetricImageFilter<const D: usize>: Clone + Send + Sync {
    /// Scores every candidate center in `search_region`.
    fn compute(
        &mut self,
        block: &FixedBlock<D>,
        search_region: &ImageRegion<D>,
        moving: &Image<f32, D>,
    ) -> BlockMatchResult<MetricImage<D>>;
}

/// Rejects search regions whose footprint is not buffered in `moving`.
pub(crate) fn check_footprint<const D: usize>(
    plan: &BlockPlan<D>,
    search_region: &ImageRegion<D>,
    moving: &Image<f32, D>,
) -> BlockMatchResult<()> {
    if search_region.is_empty() {
        return Err(BlockMatchError::strategy("search region is empty"));
    }
    let footprint = plan.footprint(search_region);
    if !moving.buffered_region().contains_region(&footprint) {
        return Err(BlockMatchError::strategy(format!(
            "search footprint {footprint} is not buffered in the moving image {}",
            moving.buffered_region()
        )));
    }
    Ok(())
}

/// Wraps scores laid out over `search_region` into a metric image.
pub(crate) fn metric_image<const D: usize>(
    moving: &Image<f32, D>,
    search_region: &ImageRegion<D>,
    scores: Vec<f32>,
) -> BlockMatchResult<MetricImage<D>> {
    let geometry = moving
        .geometry()
        .clone()
        .with_largest_region(*search_region);
    Image::from_vec(geometry, *search_region, scores)
}

/// Returns `candidate + offset`.
#[inline]
pub(crate) fn shifted<const D: usize>(candidate: &[i64; D], offset: &[i64; D]) -> [i64; D] {
    let mut out = *candidate;
    for (value, delta) in out.iter_mut().zip(offset.iter()) {
        *value += delta;
    }
    out
}
