//! Integer arg-max displacement.

use crate::displacement::{arg_max, displacement_from, DisplacementCalculator, SiteContext};
use crate::metric::MetricImage;
use crate::util::BlockMatchResult;

/// Picks the metric position with the largest score.
///
/// Non-finite scores are ignored and ties resolve to the first maximum in
/// traversal order (axis 0 fastest). This is the default calculator.
#[derive(Clone, Copy, Debug, Default)]
pub struct MaximumPixelDisplacementCalculator;

impl<const D: usize> DisplacementCalculator<D> for MaximumPixelDisplacementCalculator {
    fn extract(
        &mut self,
        metric: &MetricImage<D>,
        site: &SiteContext<D>,
    ) -> BlockMatchResult<[f64; D]> {
        let peak = arg_max(metric)?;
        let point = metric.geometry().index_to_physical(&peak);
        Ok(displacement_from(&point, &site.center))
    }
}

#[cfg(test)]
mod tests {
    use super::MaximumPixelDisplacementCalculator;
    use crate::displacement::{DisplacementCalculator, SiteContext};
    use crate::image::{Image, ImageGeometry, ImageRegion};

    #[test]
    fn displacement_uses_metric_geometry() {
        let region = ImageRegion::new([10, 20], [3, 3]);
        let geometry = ImageGeometry::new(region)
            .with_origin([1.0, 2.0])
            .with_spacing([0.5, 0.25]);
        let mut scores = vec![0.0f32; 9];
        scores[5] = 1.0; // index [12, 21]
        let metric = Image::from_vec(geometry, region, scores).unwrap();

        let site = SiteContext {
            site: [0, 0],
            center: [6.0, 7.0],
        };
        let d = MaximumPixelDisplacementCalculator
            .extract(&metric, &site)
            .unwrap();
        // physical point of [12, 21] is (1 + 6, 2 + 5.25)
        assert!((d[0] - 1.0).abs() < 1e-12);
        assert!((d[1] - 0.25).abs() < 1e-12);
    }
}
