use blockmatch::{
    BlockMatcher, BlockRadius, Image, ImageGeometry, ImageRegion, MeanSquares,
    NormalizedCrossCorrelation, ParabolicInterpolationDisplacementCalculator,
    SearchRegionInitializer, TileBudget,
};
use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

fn make_image(size: usize, shift: [i64; 2]) -> Image<f32, 2> {
    let geometry = ImageGeometry::new(ImageRegion::from_size([size, size]));
    Image::from_fn(geometry, |[x, y]| {
        let (x, y) = ((x - shift[0] + 16) as u64, (y - shift[1] + 16) as u64);
        (((x * 13) ^ (y * 7) ^ (x * y)) & 0xFF) as f32
    })
    .unwrap()
}

fn bench_matcher(c: &mut Criterion) {
    let size = 256;
    let fixed = make_image(size, [0, 0]);
    let moving = make_image(size, [3, -2]);
    let radius = BlockRadius::uniform(7);
    let search = SearchRegionInitializer::new(radius, [8, 8])
        .with_overlap(0.5)
        .build(fixed.geometry(), moving.geometry())
        .unwrap();

    let ncc = BlockMatcher::new(NormalizedCrossCorrelation::new())
        .with_fixed_image(&fixed)
        .with_moving_image(&moving)
        .with_radius(radius);
    c.bench_function("ncc_max_256", |b| {
        b.iter(|| black_box(ncc.execute(&search).unwrap()));
    });

    let ssd = BlockMatcher::new(MeanSquares::new())
        .with_calculator(ParabolicInterpolationDisplacementCalculator)
        .with_fixed_image(&fixed)
        .with_moving_image(&moving)
        .with_radius(radius);
    c.bench_function("mean_squares_parabolic_256", |b| {
        b.iter(|| black_box(ssd.execute(&search).unwrap()));
    });

    let mut streamed = ncc.clone();
    streamed.set_use_streaming(true);
    streamed.set_tile_budget(TileBudget::MaxBytes(256 * 1024));
    c.bench_function("ncc_max_256_streamed", |b| {
        b.iter(|| black_box(streamed.execute(&search).unwrap()));
    });

    if cfg!(feature = "rayon") {
        let mut parallel = ncc.clone();
        parallel.set_parallel(true);
        c.bench_function("ncc_max_256_parallel", |b| {
            b.iter(|| black_box(parallel.execute(&search).unwrap()));
        });
    }
}

criterion_group!(benches, bench_matcher);
criterion_main!(benches);
