//! Per-block precomputation shared by the metric strategies.

use crate::image::ImageRegion;
use crate::metric::FixedBlock;
use crate::util::{BlockMatchError, BlockMatchResult};

/// Block pixels split into axis-0 rows, plus zero-mean statistics.
///
/// Row starts are stored relative to the block center so a candidate center
/// in the moving image can be added directly. A plan is reloaded for every
/// block and keeps its buffers between loads.
#[derive(Clone, Debug)]
pub struct BlockPlan<const D: usize> {
    region: ImageRegion<D>,
    row_len: usize,
    row_offsets: Vec<[i64; D]>,
    start_offset: [i64; D],
    values: Vec<f32>,
    zero_mean: Vec<f32>,
    mean: f32,
    var_t: f32,
}

impl<const D: usize> Default for BlockPlan<D> {
    fn default() -> Self {
        Self {
            region: ImageRegion::default(),
            row_len: 0,
            row_offsets: Vec::new(),
            start_offset: [0; D],
            values: Vec::new(),
            zero_mean: Vec::new(),
            mean: 0.0,
            var_t: 0.0,
        }
    }
}

impl<const D: usize> BlockPlan<D> {
    /// Builds a fresh plan for `block`.
    pub fn from_block(block: &FixedBlock<D>) -> BlockMatchResult<Self> {
        let mut plan = Self::default();
        plan.load(block)?;
        Ok(plan)
    }

    /// Reloads the plan for `block`, reusing allocations.
    pub fn load(&mut self, block: &FixedBlock<D>) -> BlockMatchResult<()> {
        let region = block.region();
        if region.is_empty() || D == 0 {
            return Err(BlockMatchError::strategy("fixed block is empty"));
        }
        let center = block.center();
        self.region = region;
        self.row_len = region.size()[0];
        for axis in 0..D {
            self.start_offset[axis] = region.index()[axis] - center[axis];
        }

        let mut row_size = region.size();
        row_size[0] = 1;
        self.row_offsets.clear();
        for start in ImageRegion::new(region.index(), row_size).iter() {
            let mut rel = start;
            for axis in 0..D {
                rel[axis] -= center[axis];
            }
            self.row_offsets.push(rel);
        }

        self.values.clear();
        self.values.extend_from_slice(block.pixels().as_slice());

        let n = self.values.len() as f64;
        let mut sum = 0.0f64;
        let mut sum_sq = 0.0f64;
        for &v in &self.values {
            let v = f64::from(v);
            sum += v;
            sum_sq += v * v;
        }
        let mean = sum / n;
        self.mean = mean as f32;

        self.zero_mean.clear();
        self.zero_mean
            .extend(self.values.iter().map(|&v| (f64::from(v) - mean) as f32));
        self.var_t = (sum_sq - sum * sum / n).max(0.0) as f32;
        Ok(())
    }

    /// Returns the fixed-image region covered by the block.
    pub fn region(&self) -> ImageRegion<D> {
        self.region
    }

    /// Returns the length of every block row.
    pub fn row_len(&self) -> usize {
        self.row_len
    }

    /// Returns row start offsets relative to the block center.
    pub fn row_offsets(&self) -> &[[i64; D]] {
        &self.row_offsets
    }

    /// Returns the raw intensities of row `row`.
    pub fn row(&self, row: usize) -> &[f32] {
        let start = row * self.row_len;
        &self.values[start..start + self.row_len]
    }

    /// Returns the zero-mean intensities of row `row`.
    pub fn zero_mean_row(&self, row: usize) -> &[f32] {
        let start = row * self.row_len;
        &self.zero_mean[start..start + self.row_len]
    }

    /// Returns the number of block pixels.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true when no block is loaded.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn mean(&self) -> f32 {
        self.mean
    }

    /// Sum of squared deviations from the mean.
    pub fn var_t(&self) -> f32 {
        self.var_t
    }

    /// Moving-image region read when the block center visits every index of
    /// `search_region`.
    pub fn footprint(&self, search_region: &ImageRegion<D>) -> ImageRegion<D> {
        let mut index = search_region.index();
        let mut size = search_region.size();
        let block_size = self.region.size();
        for axis in 0..D {
            index[axis] += self.start_offset[axis];
            size[axis] += block_size[axis] - 1;
        }
        ImageRegion::new(index, size)
    }
}
