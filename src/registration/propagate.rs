//! Geometry propagation between the search-region, output and moving grids.
//!
//! The output displacement image is a copy of the search-region image's grid,
//! so requests map one-to-one between them. The moving image requirement is
//! derived per tile from the search regions themselves.

use crate::image::{ImageGeometry, ImageRegion};
use crate::registration::BlockRadius;
use crate::util::{BlockMatchError, BlockMatchResult};

/// Geometry of the displacement image: an exact copy of the search-region grid.
pub fn output_geometry<const D: usize>(search_geometry: &ImageGeometry<D>) -> ImageGeometry<D> {
    search_geometry.clone()
}

/// Search-region image request for a requested output region.
///
/// Indices correspond one-to-one, so the request is passed through after
/// checking it against the output's largest region.
pub fn input_requested_region<const D: usize>(
    output_largest: &ImageRegion<D>,
    requested: &ImageRegion<D>,
) -> BlockMatchResult<ImageRegion<D>> {
    if requested.is_empty() {
        return Err(BlockMatchError::Configuration("requested output region is empty"));
    }
    if !output_largest.contains_region(requested) {
        return Err(BlockMatchError::Configuration(
            "requested output region lies outside the search-region image",
        ));
    }
    Ok(*requested)
}

/// Block radius expressed in moving-image index units (rounded up).
pub fn moving_radius<const D: usize>(
    radius: &BlockRadius<D>,
    fixed: &ImageGeometry<D>,
    moving: &ImageGeometry<D>,
) -> [usize; D] {
    let fixed_spacing = fixed.spacing();
    let moving_spacing = moving.spacing();
    let mut out = [0usize; D];
    for axis in 0..D {
        let extent = radius.as_array()[axis] as f64 * fixed_spacing[axis] / moving_spacing[axis];
        // Tolerate round-off so equal spacings keep the radius unchanged.
        out[axis] = (extent - 1e-9).ceil().max(0.0) as usize;
    }
    out
}

/// Per-axis radius by which search regions are grown into moving-image input.
///
/// Metric strategies step through the moving grid with the fixed block's
/// index offsets, so the footprint must cover the block radius as well as
/// its converted length.
pub fn footprint_radius<const D: usize>(
    radius: &BlockRadius<D>,
    fixed: &ImageGeometry<D>,
    moving: &ImageGeometry<D>,
) -> [usize; D] {
    let mut out = moving_radius(radius, fixed, moving);
    for (dst, r) in out.iter_mut().zip(radius.as_array()) {
        *dst = (*dst).max(r);
    }
    out
}

/// Moving-image region needed to evaluate every given search region.
///
/// This is the bounding box of the non-empty regions dilated by the block
/// radius; `None` when every region is empty.
pub fn contributing_region<'r, const D: usize, I>(
    search_regions: I,
    moving_radius: [usize; D],
) -> Option<ImageRegion<D>>
where
    I: IntoIterator<Item = &'r ImageRegion<D>>,
{
    let union = search_regions
        .into_iter()
        .filter(|region| !region.is_empty())
        .fold(None, |acc: Option<ImageRegion<D>>, region| match acc {
            Some(acc) => Some(acc.union(region)),
            None => Some(*region),
        })?;
    Some(union.dilate(moving_radius))
}
