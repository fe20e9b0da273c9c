mod common;

use blockmatch::registration::split_region;
use blockmatch::{
    BlockMatchError, BlockMatcher, BlockRadius, ImageRegion, NormalizedCrossCorrelation,
    ParabolicInterpolationDisplacementCalculator, TileBudget,
};
use common::{assert_same_field, grid_search_regions, shifted_pair};

fn run(budget: Option<TileBudget>) -> Result<blockmatch::DisplacementImage<2>, BlockMatchError> {
    let (fixed, moving) = shifted_pair(13);
    let mut search = grid_search_regions();
    // An empty window keeps the sentinel path inside one of the tiles.
    search.set(&[6, 1], ImageRegion::new([0, 0], [0, 3])).unwrap();

    let mut matcher = BlockMatcher::new(NormalizedCrossCorrelation::new())
        .with_calculator(ParabolicInterpolationDisplacementCalculator)
        .with_fixed_image(&fixed)
        .with_moving_image(&moving)
        .with_radius(BlockRadius::uniform(2));
    if let Some(budget) = budget {
        matcher.set_use_streaming(true);
        matcher.set_tile_budget(budget);
    }
    matcher.execute(&search)
}

#[test]
fn tile_count_does_not_change_results() {
    let direct = run(None).unwrap();
    for tiles in [1, 2, 4, 7, 64, 1000] {
        let streamed = run(Some(TileBudget::Tiles(tiles))).unwrap();
        assert_same_field(&direct, &streamed);
    }
}

#[test]
fn byte_budget_does_not_change_results() {
    let direct = run(None).unwrap();
    // One site needs its 16x16 window plus a 20x20 input footprint.
    for bytes in [4 * (256 + 400), 16 * 1024, 1 << 20] {
        let streamed = run(Some(TileBudget::MaxBytes(bytes))).unwrap();
        assert_same_field(&direct, &streamed);
    }
}

#[test]
fn infeasible_budget_fails_before_matching() {
    for budget in [TileBudget::MaxBytes(1), TileBudget::MaxBytes(0), TileBudget::Tiles(0)] {
        let err = run(Some(budget)).unwrap_err();
        assert!(
            matches!(err, BlockMatchError::StreamingConfiguration { .. }),
            "{budget:?}: {err:?}"
        );
    }
}

#[test]
fn four_tiles_of_the_grid_are_quadrants() {
    let tiles = split_region(&ImageRegion::from_size([8, 8]), 4);
    assert_eq!(tiles.len(), 4);
    assert_eq!(tiles[0], ImageRegion::new([0, 0], [4, 4]));
    assert_eq!(tiles[3], ImageRegion::new([4, 4], [4, 4]));
}

#[test]
fn split_covers_three_dimensional_regions() {
    let region = ImageRegion::new([1, -2, 0], [5, 3, 4]);
    let tiles = split_region(&region, 6);
    let total: usize = tiles.iter().map(ImageRegion::num_pixels).sum();
    assert_eq!(total, region.num_pixels());
    assert!(tiles.iter().all(|t| region.contains_region(t)));
    for (i, a) in tiles.iter().enumerate() {
        for b in &tiles[i + 1..] {
            assert!(a.intersect(b).is_empty());
        }
    }
}
