//! Zero-mean normalized cross correlation.

use crate::image::{Image, ImageRegion};
use crate::kernel::{row_moments, RowMoments};
use crate::metric::{check_footprint, metric_image, shifted, BlockPlan, FixedBlock};
use crate::metric::{MetricImage, MetricImageFilter};
use crate::util::{BlockMatchError, BlockMatchResult};

/// Normalized cross correlation in `[-1, 1]`.
///
/// Positions where either the block or the moving window has (near) zero
/// variance are scored `0`, i.e. treated as uncorrelated.
#[derive(Clone, Debug)]
pub struct NormalizedCrossCorrelation<const D: usize> {
    min_variance: f32,
    plan: BlockPlan<D>,
}

impl<const D: usize> Default for NormalizedCrossCorrelation<D> {
    fn default() -> Self {
        Self {
            min_variance: 1e-8,
            plan: BlockPlan::default(),
        }
    }
}

impl<const D: usize> NormalizedCrossCorrelation<D> {
    /// NCC with a flatness threshold of `1e-8`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the variance below which a window counts as flat.
    pub fn with_min_variance(mut self, min_variance: f32) -> Self {
        self.min_variance = min_variance;
        self
    }
}

impl<const D: usize> MetricImageFilter<D> for NormalizedCrossCorrelation<D> {
    fn compute(
        &mut self,
        block: &FixedBlock<D>,
        search_region: &ImageRegion<D>,
        moving: &Image<f32, D>,
    ) -> BlockMatchResult<MetricImage<D>> {
        self.plan.load(block)?;
        let plan = &self.plan;
        check_footprint(plan, search_region, moving)?;

        let n = plan.len() as f32;
        let var_t = plan.var_t();
        let row_len = plan.row_len();
        let mut scores = Vec::with_capacity(search_region.num_pixels());

        for candidate in search_region.iter() {
            if var_t <= self.min_variance {
                scores.push(0.0);
                continue;
            }
            let mut acc = RowMoments::default();
            for (row, offset) in plan.row_offsets().iter().enumerate() {
                let start = shifted(&candidate, offset);
                let img_row = moving
                    .row(&start, row_len)
                    .ok_or_else(|| BlockMatchError::strategy("moving row is not buffered"))?;
                acc += row_moments(plan.zero_mean_row(row), img_row);
            }

            let var_i = acc.sum_i2 - (acc.sum_i * acc.sum_i) / n;
            if var_i <= self.min_variance {
                scores.push(0.0);
                continue;
            }
            let score = acc.dot / (var_t * var_i).sqrt();
            scores.push(if score.is_finite() { score } else { 0.0 });
        }

        metric_image(moving, search_region, scores)
    }
}
