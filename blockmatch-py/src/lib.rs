//! Python bindings for the blockmatch displacement estimation library.
//!
//! Images cross the boundary as 2D float32 numpy arrays (rows x cols); the
//! displacement field comes back as a (grid rows, grid cols, 2) float64
//! array holding (dx, dy) per site, NaN where no match was possible.

use numpy::{PyArray1, PyArray3, PyArrayMethods, PyReadonlyArray2, PyUntypedArrayMethods};
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;

use blockmatch::{
    BlockMatchError, BlockMatchResult, BlockMatcher, BlockRadius, DisplacementCalculator,
    DisplacementImage, Image, ImageGeometry, ImageRegion, MaximumPixelDisplacementCalculator,
    MeanSquares, MetricImageFilter, NormalizedCrossCorrelation,
    ParabolicInterpolationDisplacementCalculator, SearchRegionImage, SearchRegionInitializer,
    TileBudget,
};

/// Convert a BlockMatchError to a Python exception.
fn to_py_err(err: BlockMatchError) -> PyErr {
    match err {
        BlockMatchError::Configuration(_) | BlockMatchError::StreamingConfiguration { .. } => {
            PyValueError::new_err(err.to_string())
        }
        other => PyRuntimeError::new_err(other.to_string()),
    }
}

/// Copy a (rows, cols) array into an image indexed `[col, row]`.
fn image_from_array(pixels: &PyReadonlyArray2<'_, f32>) -> PyResult<Image<f32, 2>> {
    let shape = pixels.shape();
    let size = [shape[1], shape[0]];
    let data = pixels.as_slice()?.to_vec();
    let geometry = ImageGeometry::new(ImageRegion::from_size(size));
    Image::from_vec(geometry, ImageRegion::from_size(size), data).map_err(to_py_err)
}

struct Request<'a> {
    fixed: &'a Image<f32, 2>,
    moving: &'a Image<f32, 2>,
    search: &'a SearchRegionImage<2>,
    radius: BlockRadius<2>,
    parallel: bool,
    tiles: Option<usize>,
}

fn run<M, C>(request: &Request<'_>, metric: M, calculator: C) -> BlockMatchResult<DisplacementImage<2>>
where
    M: MetricImageFilter<2>,
    C: DisplacementCalculator<2>,
{
    let mut matcher = BlockMatcher::new(metric)
        .with_calculator(calculator)
        .with_fixed_image(request.fixed)
        .with_moving_image(request.moving)
        .with_radius(request.radius);
    matcher.set_parallel(request.parallel);
    if let Some(tiles) = request.tiles {
        matcher.set_use_streaming(true);
        matcher.set_tile_budget(TileBudget::Tiles(tiles));
    }
    matcher.execute(request.search)
}

/// Estimate a displacement field between two images by block matching.
///
/// Args:
///     fixed: 2D float32 numpy array (rows x cols)
///     moving: 2D float32 numpy array with the same pixel grid
///     block_radius: Block half-size (x, y) in pixels (default: (4, 4))
///     search_radius: Search window half-size (x, y) in pixels (default: (8, 8))
///     overlap: Fraction of a block shared with its neighbour, in [0, 1) (default: 0.0)
///     metric: "ncc" or "mean_squares" (default: "ncc")
///     displacement: "maximum" or "parabolic" (default: "maximum")
///     parallel: Enable parallel execution (default: False)
///     tiles: Process the grid in this many tiles (default: None)
///
/// Returns:
///     float64 array of shape (grid rows, grid cols, 2) holding (dx, dy)
#[pyfunction]
#[pyo3(signature = (
    fixed,
    moving,
    block_radius = (4, 4),
    search_radius = (8, 8),
    overlap = 0.0,
    metric = "ncc",
    displacement = "maximum",
    parallel = false,
    tiles = None
))]
#[allow(clippy::too_many_arguments)]
fn register<'py>(
    py: Python<'py>,
    fixed: PyReadonlyArray2<'py, f32>,
    moving: PyReadonlyArray2<'py, f32>,
    block_radius: (i64, i64),
    search_radius: (usize, usize),
    overlap: f64,
    metric: &str,
    displacement: &str,
    parallel: bool,
    tiles: Option<usize>,
) -> PyResult<Bound<'py, PyArray3<f64>>> {
    let fixed = image_from_array(&fixed)?;
    let moving = image_from_array(&moving)?;
    let radius =
        BlockRadius::try_from([block_radius.0, block_radius.1]).map_err(to_py_err)?;
    let search = SearchRegionInitializer::new(radius, [search_radius.0, search_radius.1])
        .with_overlap(overlap)
        .build(fixed.geometry(), moving.geometry())
        .map_err(to_py_err)?;

    let request = Request {
        fixed: &fixed,
        moving: &moving,
        search: &search,
        radius,
        parallel,
        tiles,
    };
    let field = match (
        metric.to_lowercase().as_str(),
        displacement.to_lowercase().as_str(),
    ) {
        ("ncc", "maximum") => run(
            &request,
            NormalizedCrossCorrelation::new(),
            MaximumPixelDisplacementCalculator,
        ),
        ("ncc", "parabolic") => run(
            &request,
            NormalizedCrossCorrelation::new(),
            ParabolicInterpolationDisplacementCalculator,
        ),
        ("mean_squares", "maximum") => run(
            &request,
            MeanSquares::new(),
            MaximumPixelDisplacementCalculator,
        ),
        ("mean_squares", "parabolic") => run(
            &request,
            MeanSquares::new(),
            ParabolicInterpolationDisplacementCalculator,
        ),
        ("ncc" | "mean_squares", _) => {
            return Err(PyValueError::new_err(
                "displacement must be 'maximum' or 'parabolic'",
            ))
        }
        _ => {
            return Err(PyValueError::new_err(
                "metric must be 'ncc' or 'mean_squares'",
            ))
        }
    }
    .map_err(to_py_err)?;

    let [cols, rows] = field.largest_region().size();
    let flat: Vec<f64> = field.as_slice().iter().flatten().copied().collect();
    PyArray1::from_vec(py, flat).reshape([rows, cols, 2])
}

/// Python module for blockmatch displacement estimation.
#[pymodule]
fn _blockmatch(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(register, m)?)?;
    m.add("__version__", env!("CARGO_PKG_VERSION"))?;
    Ok(())
}
