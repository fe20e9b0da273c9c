//! Blockmatch estimates dense displacement fields by block matching.
//!
//! A grid of blocks is laid over a fixed image; each block is compared with
//! every candidate position of its search region in a moving image, and the
//! best match becomes a physical-space displacement vector. The crate provides
//! the orchestration (geometry propagation, tiling for bounded memory and
//! optional parallelism via the `rayon` feature) plus pluggable metric and
//! displacement strategies. Row kernels use SIMD with the `simd` feature.

pub mod displacement;
pub mod image;
pub mod kernel;
pub mod metric;
pub mod registration;
pub mod search;
mod trace;
pub mod util;

pub use displacement::{
    CalculatorMode, DisplacementCalculator, MaximumPixelDisplacementCalculator,
    ParabolicInterpolationDisplacementCalculator, SiteContext,
};
pub use image::{Image, ImageGeometry, ImageRegion};
pub use metric::{
    FixedBlock, MeanSquares, MetricImage, MetricImageFilter, NormalizedCrossCorrelation,
};
pub use registration::{
    BlockMatcher, BlockRadius, CancelFlag, DisplacementImage, RegistrationConfig,
    SearchRegionImage, TileBudget,
};
pub use search::SearchRegionInitializer;
pub use util::{BlockMatchError, BlockMatchResult};
