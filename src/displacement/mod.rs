//! Displacement extraction strategies.
//!
//! A displacement calculator turns a metric image into the physical-space
//! vector from the fixed block center to the best-matching moving position.
//! Calculators work either per site or on a whole tile of metric images at
//! once (batch mode); the orchestrator picks the call based on `mode`.

use crate::metric::MetricImage;
use crate::util::{BlockMatchError, BlockMatchResult};

mod maximum;
mod parabolic;

pub use maximum::MaximumPixelDisplacementCalculator;
pub use parabolic::{parabolic_vertex, ParabolicInterpolationDisplacementCalculator};

/// How a calculator wants to receive metric images.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CalculatorMode {
    /// One `extract` call per site, right after its metric image is computed.
    PerSite,
    /// One `extract_all` call per tile, after every metric image of the tile exists.
    Batch,
}

/// Where a metric image came from.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SiteContext<const D: usize> {
    /// Index of the grid site in the displacement image.
    pub site: [i64; D],
    /// Physical point of the fixed block center.
    pub center: [f64; D],
}

/// Extracts displacement vectors from metric images.
pub trait DisplacementCalculator<const D: usize>: Clone + Send + Sync {
    /// Delivery mode; per-site unless overridden.
    fn mode(&self) -> CalculatorMode {
        CalculatorMode::PerSite
    }

    /// Displacement for a single site.
    fn extract(
        &mut self,
        metric: &MetricImage<D>,
        site: &SiteContext<D>,
    ) -> BlockMatchResult<[f64; D]>;

    /// Displacements for every metric image of a tile, in input order.
    ///
    /// Errors should name the failing site; unattributed errors are charged
    /// to the first site of the batch.
    fn extract_all(
        &mut self,
        metrics: &[(SiteContext<D>, MetricImage<D>)],
    ) -> BlockMatchResult<Vec<[f64; D]>> {
        metrics
            .iter()
            .map(|(site, metric)| {
                self.extract(metric, site)
                    .map_err(|err| err.at_site(&site.site))
            })
            .collect()
    }
}

/// Index of the largest finite score; ties keep the first in traversal order.
pub(crate) fn arg_max<const D: usize>(metric: &MetricImage<D>) -> BlockMatchResult<[i64; D]> {
    let region = metric.buffered_region();
    let mut best: Option<(usize, f32)> = None;
    for (offset, &score) in metric.as_slice().iter().enumerate() {
        if !score.is_finite() {
            continue;
        }
        match best {
            Some((_, best_score)) if score <= best_score => {}
            _ => best = Some((offset, score)),
        }
    }
    let (offset, _) =
        best.ok_or_else(|| BlockMatchError::strategy("metric image has no finite score"))?;
    region
        .index_at(offset)
        .ok_or_else(|| BlockMatchError::strategy("metric peak outside metric image"))
}

/// Returns `point - center`.
pub(crate) fn displacement_from<const D: usize>(point: &[f64; D], center: &[f64; D]) -> [f64; D] {
    let mut out = [0.0f64; D];
    for axis in 0..D {
        out[axis] = point[axis] - center[axis];
    }
    out
}
