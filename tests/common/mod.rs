#![allow(dead_code)]

use blockmatch::{DisplacementImage, Image, ImageGeometry, ImageRegion, SearchRegionImage};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Side length of the synthetic fixed and moving images.
pub const SIZE: usize = 64;

/// Shift applied to the moving image: `moving(p) = fixed(p - SHIFT)`.
pub const SHIFT: [i64; 2] = [2, -1];

const PAD: i64 = 8;

/// Uncorrelated noise defined a little beyond the image borders.
pub struct NoiseField {
    width: usize,
    values: Vec<f32>,
}

impl NoiseField {
    pub fn new(seed: u64) -> Self {
        let width = SIZE + 2 * PAD as usize;
        let mut rng = StdRng::seed_from_u64(seed);
        let values = (0..width * width)
            .map(|_| rng.random_range(0.0f32..255.0))
            .collect();
        Self { width, values }
    }

    pub fn at(&self, x: i64, y: i64) -> f32 {
        let ix = (x + PAD) as usize;
        let iy = (y + PAD) as usize;
        self.values[iy * self.width + ix]
    }
}

/// Fixed image and the same content shifted by [`SHIFT`].
pub fn shifted_pair(seed: u64) -> (Image<f32, 2>, Image<f32, 2>) {
    let field = NoiseField::new(seed);
    let geometry = ImageGeometry::new(ImageRegion::from_size([SIZE, SIZE]));
    let fixed = Image::from_fn(geometry.clone(), |[x, y]| field.at(x, y)).unwrap();
    let moving =
        Image::from_fn(geometry, |[x, y]| field.at(x - SHIFT[0], y - SHIFT[1])).unwrap();
    (fixed, moving)
}

/// 8x8 grid of sites at fixed indices 6, 13, .., 55 with 16x16 search windows.
///
/// Windows are clipped so a 5x5 block around every candidate stays inside
/// the moving image.
pub fn grid_search_regions() -> SearchRegionImage<2> {
    let geometry = ImageGeometry::new(ImageRegion::from_size([8, 8]))
        .with_origin([6.0, 6.0])
        .with_spacing([7.0, 7.0]);
    let valid = ImageRegion::from_size([SIZE, SIZE]).erode([2, 2]);
    Image::from_fn(geometry, |[i, j]| {
        let center = [6 + 7 * i, 6 + 7 * j];
        ImageRegion::new([center[0] - 8, center[1] - 8], [16, 16]).intersect(&valid)
    })
    .unwrap()
}

/// True when both vectors have identical bits, so NaN sentinels compare equal.
pub fn same_vector(a: &[f64; 2], b: &[f64; 2]) -> bool {
    a.iter().zip(b.iter()).all(|(x, y)| x.to_bits() == y.to_bits())
}

pub fn assert_same_field(a: &DisplacementImage<2>, b: &DisplacementImage<2>) {
    assert_eq!(a.geometry(), b.geometry());
    assert_eq!(a.buffered_region(), b.buffered_region());
    for (index, (x, y)) in a.as_slice().iter().zip(b.as_slice()).enumerate() {
        assert!(same_vector(x, y), "pixel {index}: {x:?} != {y:?}");
    }
}

pub fn is_sentinel(v: &[f64; 2]) -> bool {
    v.iter().all(|c| c.is_nan())
}
