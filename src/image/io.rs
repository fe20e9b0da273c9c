//! Loading 2D grayscale images via the `image` crate.
//!
//! Available when the `image-io` feature is enabled. Loaded images get unit
//! spacing, zero origin and identity direction; index `[x, y]` addresses
//! column `x` of row `y`.

use crate::image::{Image, ImageGeometry, ImageRegion};
use crate::util::{BlockMatchError, BlockMatchResult};
use std::path::Path;

/// Converts an 8-bit grayscale buffer into a floating-point image.
pub fn image_from_gray(img: &image::GrayImage) -> BlockMatchResult<Image<f32, 2>> {
    let width = img.width() as usize;
    let height = img.height() as usize;
    let geometry = ImageGeometry::new(ImageRegion::from_size([width, height]));
    let data = img.as_raw().iter().map(|&v| f32::from(v)).collect();
    Image::from_vec(geometry, ImageRegion::from_size([width, height]), data)
}

/// Converts any decoded image to grayscale and then to a floating-point image.
pub fn image_from_dynamic(img: &image::DynamicImage) -> BlockMatchResult<Image<f32, 2>> {
    image_from_gray(&img.to_luma8())
}

/// Loads an image from disk as grayscale.
pub fn load_gray_image<P: AsRef<Path>>(path: P) -> BlockMatchResult<Image<f32, 2>> {
    let img = image::open(path).map_err(|err| BlockMatchError::ImageIo {
        reason: err.to_string(),
    })?;
    image_from_dynamic(&img)
}
