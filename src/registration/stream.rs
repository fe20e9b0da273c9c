//! Streaming: splitting the output region into tiles.
//!
//! Tiles are processed one after another, so only one tile's metric images
//! and bookkeeping are resident at a time. Results do not depend on the
//! split; only peak memory and per-tile overhead do.

use crate::image::ImageRegion;
use crate::trace::trace_event;
use crate::util::{BlockMatchError, BlockMatchResult};

/// Limit on the size of one streamed tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TileBudget {
    /// Split the output into this many tiles (clamped to the number of sites).
    Tiles(usize),
    /// Keep the estimated footprint of every tile at or below this many bytes.
    MaxBytes(usize),
}

impl Default for TileBudget {
    fn default() -> Self {
        Self::MaxBytes(64 << 20)
    }
}

/// Splits `region` into about `pieces` disjoint tiles.
///
/// `pieces` is factored into primes, largest first. Each factor is assigned
/// to the axis whose current piece is longest and can still be divided by it;
/// ties go to the highest axis. Factors no axis can take are dropped, so the
/// result may have fewer tiles than requested. Tiles are emitted with axis 0
/// varying fastest and always cover `region` exactly.
pub fn split_region<const D: usize>(region: &ImageRegion<D>, pieces: usize) -> Vec<ImageRegion<D>> {
    if region.is_empty() {
        return Vec::new();
    }
    let size = region.size();
    let mut splits = [1usize; D];
    for factor in prime_factors_desc(pieces.clamp(1, region.num_pixels())) {
        let mut chosen: Option<usize> = None;
        for axis in 0..D {
            if splits[axis] * factor > size[axis] {
                continue;
            }
            let piece_len = size[axis].div_ceil(splits[axis]);
            let better = match chosen {
                None => true,
                Some(best) => piece_len >= size[best].div_ceil(splits[best]),
            };
            if better {
                chosen = Some(axis);
            }
        }
        if let Some(axis) = chosen {
            splits[axis] *= factor;
        }
    }

    let grid = ImageRegion::from_size(splits);
    let index = region.index();
    grid.iter()
        .map(|cell| {
            let mut tile_index = [0i64; D];
            let mut tile_size = [0usize; D];
            for axis in 0..D {
                let k = cell[axis] as usize;
                let start = k * size[axis] / splits[axis];
                let end = (k + 1) * size[axis] / splits[axis];
                tile_index[axis] = index[axis] + start as i64;
                tile_size[axis] = end - start;
            }
            ImageRegion::new(tile_index, tile_size)
        })
        .collect()
}

/// Plans the tiles for one execution.
///
/// `cost` estimates the resident bytes of processing a tile. The plan is made
/// before any site is processed, so an infeasible budget fails up front.
pub(crate) fn plan_tiles<const D: usize, F>(
    region: &ImageRegion<D>,
    budget: TileBudget,
    cost: F,
) -> BlockMatchResult<Vec<ImageRegion<D>>>
where
    F: Fn(&ImageRegion<D>) -> usize,
{
    let sites = region.num_pixels();
    let tiles = match budget {
        TileBudget::Tiles(0) => {
            return Err(BlockMatchError::StreamingConfiguration {
                reason: "tile count must be positive".to_string(),
            })
        }
        TileBudget::Tiles(count) => split_region(region, count),
        TileBudget::MaxBytes(0) => {
            return Err(BlockMatchError::StreamingConfiguration {
                reason: "tile byte budget must be positive".to_string(),
            })
        }
        TileBudget::MaxBytes(max_bytes) => {
            for site in region.iter() {
                let single = cost(&ImageRegion::new(site, [1; D]));
                if single > max_bytes {
                    return Err(BlockMatchError::StreamingConfiguration {
                        reason: format!(
                            "site {site:?} needs {single} bytes, above the {max_bytes} byte budget"
                        ),
                    });
                }
            }
            plan_by_bytes(region, max_bytes, &cost)
        }
    };
    trace_event!("streaming_plan", sites = sites, tiles = tiles.len());
    Ok(tiles)
}

fn plan_by_bytes<const D: usize, F>(
    region: &ImageRegion<D>,
    max_bytes: usize,
    cost: &F,
) -> Vec<ImageRegion<D>>
where
    F: Fn(&ImageRegion<D>) -> usize,
{
    let sites = region.num_pixels();
    let mut pieces = 1usize;
    loop {
        let tiles = split_region(region, pieces);
        if tiles.iter().all(|tile| cost(tile) <= max_bytes) {
            return tiles;
        }
        if pieces >= sites {
            break;
        }
        pieces = (pieces * 2).min(sites);
    }
    // One site per tile always fits once every single site was checked.
    region
        .iter()
        .map(|site| ImageRegion::new(site, [1; D]))
        .collect()
}

fn prime_factors_desc(mut n: usize) -> Vec<usize> {
    let mut factors = Vec::new();
    let mut p = 2;
    while p * p <= n {
        while n % p == 0 {
            factors.push(p);
            n /= p;
        }
        p += 1;
    }
    if n > 1 {
        factors.push(n);
    }
    factors.reverse();
    factors
}
