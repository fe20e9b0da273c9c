//! Negated mean squared difference.

use crate::image::{Image, ImageRegion};
use crate::kernel::row_sq_diff;
use crate::metric::{check_footprint, metric_image, shifted, BlockPlan, FixedBlock};
use crate::metric::{MetricImage, MetricImageFilter};
use crate::util::{BlockMatchError, BlockMatchResult};

/// Scores `-mean((moving - block)^2)`, so an exact match scores `0` and is
/// the maximum.
#[derive(Clone, Debug)]
pub struct MeanSquares<const D: usize> {
    plan: BlockPlan<D>,
}

impl<const D: usize> Default for MeanSquares<D> {
    fn default() -> Self {
        Self {
            plan: BlockPlan::default(),
        }
    }
}

impl<const D: usize> MeanSquares<D> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<const D: usize> MetricImageFilter<D> for MeanSquares<D> {
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
        let row_len = plan.row_len();
        let mut scores = Vec::with_capacity(search_region.num_pixels());
        for candidate in search_region.iter() {
            let mut sse = 0.0f32;
            for (row, offset) in plan.row_offsets().iter().enumerate() {
                let start = shifted(&candidate, offset);
                let img_row = moving
                    .row(&start, row_len)
                    .ok_or_else(|| BlockMatchError::strategy("moving row is not buffered"))?;
                sse += row_sq_diff(plan.row(row), img_row);
            }
            scores.push(-sse / n);
        }

        metric_image(moving, search_region, scores)
    }
}
