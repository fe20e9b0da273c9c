//! Block-matching orchestration.
//!
//! [`BlockMatcher`] lays the fixed-image blocks over the grid of the
//! search-region image, runs the metric strategy for every block against its
//! search region in the moving image, turns each metric image into a vector
//! with the displacement strategy and assembles a displacement image on the
//! search-region grid. The output region can be processed in tiles to bound
//! peak memory; tiling never changes the result.

use crate::displacement::{
    CalculatorMode, DisplacementCalculator, MaximumPixelDisplacementCalculator, SiteContext,
};
use crate::image::{Image, ImageGeometry, ImageRegion};
use crate::metric::{FixedBlock, MetricImage, MetricImageFilter};
use crate::trace::{trace_debug, trace_span};
use crate::util::{BlockMatchError, BlockMatchResult};

mod config;
pub mod propagate;
pub mod stream;

pub use config::{BlockRadius, CancelFlag, RegistrationConfig};
pub use stream::{split_region, TileBudget};

/// Image of search regions in moving-image index space, one per grid site.
pub type SearchRegionImage<const D: usize> = Image<ImageRegion<D>, D>;

/// Physical displacement vectors on the search-region grid.
pub type DisplacementImage<const D: usize> = Image<[f64; D], D>;

const SCORE_BYTES: usize = std::mem::size_of::<f32>();

/// Block-matching registration filter.
///
/// Fixed and moving images are borrowed for the lifetime of the matcher. The
/// metric strategy is required; the displacement strategy defaults to the
/// integer arg-max.
///
/// ```no_run
/// use blockmatch::{BlockMatcher, BlockRadius, NormalizedCrossCorrelation};
/// # fn run(
/// #     fixed: &blockmatch::Image<f32, 2>,
/// #     moving: &blockmatch::Image<f32, 2>,
/// #     search: &blockmatch::SearchRegionImage<2>,
/// # ) -> blockmatch::BlockMatchResult<()> {
/// let matcher = BlockMatcher::new(NormalizedCrossCorrelation::new())
///     .with_fixed_image(fixed)
///     .with_moving_image(moving)
///     .with_radius(BlockRadius::uniform(3));
/// let field = matcher.execute(search)?;
/// # let _ = field;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct BlockMatcher<'a, const D: usize, M, C = MaximumPixelDisplacementCalculator> {
    fixed: Option<&'a Image<f32, D>>,
    moving: Option<&'a Image<f32, D>>,
    metric: M,
    calculator: C,
    config: RegistrationConfig<D>,
    cancel: CancelFlag,
}

impl<'a, const D: usize, M> BlockMatcher<'a, D, M> {
    /// Creates a matcher with the default displacement strategy and config.
    pub fn new(metric: M) -> Self {
        Self {
            fixed: None,
            moving: None,
            metric,
            calculator: MaximumPixelDisplacementCalculator,
            config: RegistrationConfig::default(),
            cancel: CancelFlag::new(),
        }
    }
}

impl<'a, const D: usize, M, C> BlockMatcher<'a, D, M, C> {
    /// Replaces the displacement strategy.
    pub fn with_calculator<C2>(self, calculator: C2) -> BlockMatcher<'a, D, M, C2> {
        BlockMatcher {
            fixed: self.fixed,
            moving: self.moving,
            metric: self.metric,
            calculator,
            config: self.config,
            cancel: self.cancel,
        }
    }

    /// Replaces radius, streaming, parallelism and sentinel in one call.
    pub fn with_config(mut self, config: RegistrationConfig<D>) -> Self {
        self.config = config;
        self
    }

    /// Image the blocks are cut from.
    pub fn with_fixed_image(mut self, fixed: &'a Image<f32, D>) -> Self {
        self.fixed = Some(fixed);
        self
    }

    /// Image the blocks are searched in.
    pub fn with_moving_image(mut self, moving: &'a Image<f32, D>) -> Self {
        self.moving = Some(moving);
        self
    }

    /// Block half-size in fixed-image pixels.
    pub fn with_radius(mut self, radius: BlockRadius<D>) -> Self {
        self.config.radius = radius;
        self
    }

    /// Shares an existing cancellation flag with this matcher.
    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Replaces the fixed image.
    pub fn set_fixed_image(&mut self, fixed: &'a Image<f32, D>) {
        self.fixed = Some(fixed);
    }

    /// Replaces the moving image.
    pub fn set_moving_image(&mut self, moving: &'a Image<f32, D>) {
        self.moving = Some(moving);
    }

    /// Replaces the block half-size.
    pub fn set_radius(&mut self, radius: BlockRadius<D>) {
        self.config.radius = radius;
    }

    /// Splits the requested output region into tiles sized by the tile budget.
    pub fn set_use_streaming(&mut self, use_streaming: bool) {
        self.config.use_streaming = use_streaming;
    }

    /// Tile count or per-tile byte limit used when streaming.
    pub fn set_tile_budget(&mut self, budget: TileBudget) {
        self.config.tile_budget = budget;
    }

    /// Evaluates the sites of a tile on the rayon pool (`rayon` feature).
    pub fn set_parallel(&mut self, parallel: bool) {
        self.config.parallel = parallel;
    }

    /// Vector written for sites that produce no match.
    pub fn set_sentinel(&mut self, sentinel: [f64; D]) {
        self.config.sentinel = sentinel;
    }

    /// Current run parameters.
    pub fn config(&self) -> &RegistrationConfig<D> {
        &self.config
    }

    /// Handle that cancels a running or future execution of this matcher.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }
}

/// Inputs shared by every site of one execution.
struct RunContext<'r, const D: usize> {
    fixed: &'r Image<f32, D>,
    moving: &'r Image<f32, D>,
    output_geometry: &'r ImageGeometry<D>,
    radius: [usize; D],
    batch: bool,
    cancel: &'r CancelFlag,
}

enum SiteOutcome<const D: usize> {
    Skipped,
    Displacement([f64; D]),
    Deferred(SiteContext<D>, MetricImage<D>),
}

impl<'a, const D: usize, M, C> BlockMatcher<'a, D, M, C>
where
    M: MetricImageFilter<D>,
    C: DisplacementCalculator<D>,
{
    /// Computes displacements for every site of the search-region image.
    pub fn execute(
        &self,
        search_regions: &SearchRegionImage<D>,
    ) -> BlockMatchResult<DisplacementImage<D>> {
        self.execute_region(search_regions, &search_regions.largest_region())
    }

    /// Computes displacements for the sites in `requested` only.
    ///
    /// The returned image still spans the full output grid; sites outside
    /// the request hold the sentinel.
    pub fn execute_region(
        &self,
        search_regions: &SearchRegionImage<D>,
        requested: &ImageRegion<D>,
    ) -> BlockMatchResult<DisplacementImage<D>> {
        let fixed = self
            .fixed
            .ok_or(BlockMatchError::Configuration("fixed image is not set"))?;
        let moving = self
            .moving
            .ok_or(BlockMatchError::Configuration("moving image is not set"))?;
        fixed.geometry().validate()?;
        moving.geometry().validate()?;
        search_regions.geometry().validate()?;

        let output_geometry = propagate::output_geometry(search_regions.geometry());
        let request =
            propagate::input_requested_region(&output_geometry.largest_region(), requested)?;
        if !search_regions.buffered_region().contains_region(&request) {
            return Err(BlockMatchError::InputRegionUnavailable {
                input: "search region image",
                required: request.to_string(),
                available: search_regions.buffered_region().to_string(),
            });
        }
        if self.cancel.is_cancelled() {
            return Err(BlockMatchError::Cancelled);
        }

        let _span = trace_span!("block_matching", sites = request.num_pixels()).entered();

        let radius = self.config.radius.as_array();
        let dilation =
            propagate::footprint_radius(&self.config.radius, fixed.geometry(), moving.geometry());

        let tiles = if self.config.use_streaming {
            stream::plan_tiles(&request, self.config.tile_budget, |tile| {
                tile_cost(search_regions, tile, dilation)
            })?
        } else {
            vec![request]
        };

        let mut output = Image::filled(output_geometry.clone(), self.config.sentinel)?;
        let ctx = RunContext {
            fixed,
            moving,
            output_geometry: &output_geometry,
            radius,
            batch: self.calculator.mode() == CalculatorMode::Batch,
            cancel: &self.cancel,
        };

        for (tile_index, tile) in tiles.iter().enumerate() {
            if self.cancel.is_cancelled() {
                return Err(BlockMatchError::Cancelled);
            }
            let _tile_span = trace_span!("tile", index = tile_index).entered();

            let sites = read_search_regions(search_regions, tile)?;
            let Some(contributing) =
                propagate::contributing_region(sites.iter().map(|(_, region)| region), dilation)
            else {
                trace_debug!("tile_skipped", index = tile_index, sites = sites.len());
                continue;
            };
            if !moving.buffered_region().contains_region(&contributing) {
                return Err(BlockMatchError::InputRegionUnavailable {
                    input: "moving image",
                    required: contributing.to_string(),
                    available: moving.buffered_region().to_string(),
                });
            }

            let outcomes = self.run_sites(&ctx, &sites)?;
            // Each tile starts from the configured calculator state.
            let mut calculator = self.calculator.clone();
            let written = self.scatter(&mut output, outcomes, &mut calculator)?;
            trace_debug!(
                "tile_done",
                index = tile_index,
                sites = sites.len(),
                written = written
            );
        }
        Ok(output)
    }

    fn run_sites(
        &self,
        ctx: &RunContext<'_, D>,
        sites: &[([i64; D], ImageRegion<D>)],
    ) -> BlockMatchResult<Vec<([i64; D], SiteOutcome<D>)>> {
        #[cfg(feature = "rayon")]
        if self.config.parallel {
            use rayon::prelude::*;
            return sites
                .par_iter()
                .map_init(
                    || (self.metric.clone(), self.calculator.clone()),
                    |(metric, calculator), (site, region)| {
                        evaluate_site(ctx, site, region, metric, calculator)
                            .map(|outcome| (*site, outcome))
                    },
                )
                .collect();
        }

        let mut metric = self.metric.clone();
        let mut calculator = self.calculator.clone();
        sites
            .iter()
            .map(|(site, region)| {
                evaluate_site(ctx, site, region, &mut metric, &mut calculator)
                    .map(|outcome| (*site, outcome))
            })
            .collect()
    }

    /// Writes a tile's vectors into the output, running the batch call first
    /// when the calculator asked for deferred extraction.
    fn scatter(
        &self,
        output: &mut DisplacementImage<D>,
        outcomes: Vec<([i64; D], SiteOutcome<D>)>,
        calculator: &mut C,
    ) -> BlockMatchResult<usize> {
        let mut written = 0usize;
        let mut deferred_sites = Vec::new();
        let mut deferred = Vec::new();
        for (site, outcome) in outcomes {
            match outcome {
                SiteOutcome::Skipped => {}
                SiteOutcome::Displacement(vector) => {
                    output.set(&site, vector)?;
                    written += 1;
                }
                SiteOutcome::Deferred(context, metric) => {
                    deferred_sites.push(site);
                    deferred.push((context, metric));
                }
            }
        }
        if deferred.is_empty() {
            return Ok(written);
        }

        let first = deferred_sites[0];
        let vectors = calculator
            .extract_all(&deferred)
            .map_err(|err| err.or_at_site(&first))?;
        if vectors.len() != deferred.len() {
            return Err(BlockMatchError::strategy(format!(
                "batch extraction returned {} vectors for {} sites",
                vectors.len(),
                deferred.len()
            ))
            .at_site(&first));
        }
        for (site, vector) in deferred_sites.iter().zip(vectors) {
            output.set(site, vector)?;
            written += 1;
        }
        Ok(written)
    }
}

fn evaluate_site<const D: usize, M, C>(
    ctx: &RunContext<'_, D>,
    site: &[i64; D],
    search_region: &ImageRegion<D>,
    metric: &mut M,
    calculator: &mut C,
) -> BlockMatchResult<SiteOutcome<D>>
where
    M: MetricImageFilter<D>,
    C: DisplacementCalculator<D>,
{
    if ctx.cancel.is_cancelled() {
        return Err(BlockMatchError::Cancelled);
    }
    if search_region.is_empty() {
        return Ok(SiteOutcome::Skipped);
    }

    let point = ctx.output_geometry.index_to_physical(site);
    let center = ctx.fixed.geometry().physical_to_index(&point)?;
    let block_region =
        ImageRegion::centered(center, ctx.radius).intersect(&ctx.fixed.buffered_region());
    if block_region.is_empty() {
        return Ok(SiteOutcome::Skipped);
    }
    let block = FixedBlock::new(ctx.fixed.crop(&block_region)?, center);

    let scores = metric
        .compute(&block, search_region, ctx.moving)
        .map_err(|err| err.at_site(site))?;
    let context = SiteContext {
        site: *site,
        center: ctx.fixed.geometry().index_to_physical(&center),
    };
    if ctx.batch {
        return Ok(SiteOutcome::Deferred(context, scores));
    }
    let vector = calculator
        .extract(&scores, &context)
        .map_err(|err| err.at_site(site))?;
    Ok(SiteOutcome::Displacement(vector))
}

fn read_search_regions<const D: usize>(
    search_regions: &SearchRegionImage<D>,
    tile: &ImageRegion<D>,
) -> BlockMatchResult<Vec<([i64; D], ImageRegion<D>)>> {
    tile.iter()
        .map(|site| {
            search_regions
                .get(&site)
                .map(|region| (site, *region))
                .ok_or_else(|| BlockMatchError::InputRegionUnavailable {
                    input: "search region image",
                    required: tile.to_string(),
                    available: search_regions.buffered_region().to_string(),
                })
        })
        .collect()
}

/// Estimated resident bytes of one tile: its moving-image input plus every
/// metric image it produces.
fn tile_cost<const D: usize>(
    search_regions: &SearchRegionImage<D>,
    tile: &ImageRegion<D>,
    dilation: [usize; D],
) -> usize {
    let regions: Vec<ImageRegion<D>> = tile
        .iter()
        .filter_map(|site| search_regions.get(&site).copied())
        .collect();
    let metrics: usize = regions.iter().map(ImageRegion::num_pixels).sum();
    let input = propagate::contributing_region(&regions, dilation)
        .map_or(0, |region| region.num_pixels());
    (input + metrics) * SCORE_BYTES
}
