//! Sub-pixel displacement from separable parabola fits.

use crate::displacement::{arg_max, displacement_from, DisplacementCalculator, SiteContext};
use crate::metric::MetricImage;
use crate::util::BlockMatchResult;

/// Vertex offset of the parabola through samples at `-1, 0, +1`.
///
/// Returns `None` unless the parabola is concave, well conditioned and its
/// vertex lies within one sample of the center.
pub fn parabolic_vertex(prev: f64, peak: f64, next: f64) -> Option<f64> {
    if !prev.is_finite() || !peak.is_finite() || !next.is_finite() {
        return None;
    }
    let curvature = prev - 2.0 * peak + next;
    if curvature > -1e-9 {
        return None;
    }
    let offset = 0.5 * (prev - next) / curvature;
    (offset.is_finite() && offset.abs() <= 1.0).then_some(offset)
}

/// Arg-max refined by one three-point parabola per axis.
///
/// Axes where the peak touches the metric image border, or where the fit is
/// not concave, keep the integer peak position.
#[derive(Clone, Copy, Debug, Default)]
pub struct ParabolicInterpolationDisplacementCalculator;

impl<const D: usize> DisplacementCalculator<D> for ParabolicInterpolationDisplacementCalculator {
    fn extract(
        &mut self,
        metric: &MetricImage<D>,
        site: &SiteContext<D>,
    ) -> BlockMatchResult<[f64; D]> {
        let peak = arg_max(metric)?;
        let peak_score = metric.get(&peak).copied().unwrap_or(f32::NAN);

        let mut continuous = [0.0f64; D];
        for axis in 0..D {
            continuous[axis] = peak[axis] as f64;
            let mut before = peak;
            let mut after = peak;
            before[axis] -= 1;
            after[axis] += 1;
            let (Some(&prev), Some(&next)) = (metric.get(&before), metric.get(&after)) else {
                continue;
            };
            if let Some(offset) =
                parabolic_vertex(f64::from(prev), f64::from(peak_score), f64::from(next))
            {
                continuous[axis] += offset;
            }
        }

        let point = metric.geometry().continuous_index_to_physical(&continuous);
        Ok(displacement_from(&point, &site.center))
    }
}
