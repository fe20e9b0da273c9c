use blockmatch::image::io::load_gray_image;
use blockmatch::{
    BlockMatcher, BlockRadius, DisplacementCalculator, DisplacementImage, Image,
    MaximumPixelDisplacementCalculator, MeanSquares, MetricImageFilter,
    NormalizedCrossCorrelation, ParabolicInterpolationDisplacementCalculator, SearchRegionImage,
    SearchRegionInitializer, TileBudget,
};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const EXAMPLE_JSON: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.example.json"));

#[derive(Parser, Debug)]
#[command(author, version, about = "Blockmatch CLI (JSON config driven)")]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "config.json")]
    config: PathBuf,
    /// Print an example config and exit.
    #[arg(long)]
    print_example: bool,
    /// Enable tracing output for performance profiling.
    #[arg(long)]
    trace: bool,
}

#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum MetricConfig {
    Ncc,
    MeanSquares,
}

#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum DisplacementConfig {
    Maximum,
    Parabolic,
}

#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum StreamingConfig {
    Tiles(usize),
    MaxBytes(usize),
}

impl From<StreamingConfig> for TileBudget {
    fn from(value: StreamingConfig) -> Self {
        match value {
            StreamingConfig::Tiles(n) => TileBudget::Tiles(n),
            StreamingConfig::MaxBytes(b) => TileBudget::MaxBytes(b),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct Config {
    fixed_path: String,
    moving_path: String,
    output_path: Option<String>,
    block_radius: [i64; 2],
    search_radius: [usize; 2],
    overlap: f64,
    metric: MetricConfig,
    displacement: DisplacementConfig,
    parallel: bool,
    streaming: Option<StreamingConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fixed_path: String::new(),
            moving_path: String::new(),
            output_path: None,
            block_radius: [4, 4],
            search_radius: [8, 8],
            overlap: 0.0,
            metric: MetricConfig::Ncc,
            displacement: DisplacementConfig::Maximum,
            parallel: false,
            streaming: None,
        }
    }
}

#[derive(Debug, Serialize)]
struct GridRecord {
    size: [usize; 2],
    origin: [f64; 2],
    spacing: [f64; 2],
}

#[derive(Debug, Serialize)]
struct Output {
    grid: GridRecord,
    /// One entry per site, axis 0 fastest; `null` where no match was possible.
    displacements: Vec<Option<[f64; 2]>>,
}

impl From<&DisplacementImage<2>> for Output {
    fn from(field: &DisplacementImage<2>) -> Self {
        let geometry = field.geometry();
        let displacements = field
            .as_slice()
            .iter()
            .map(|v| v.iter().all(|c| c.is_finite()).then_some(*v))
            .collect();
        Self {
            grid: GridRecord {
                size: geometry.largest_region().size(),
                origin: geometry.origin(),
                spacing: geometry.spacing(),
            },
            displacements,
        }
    }
}

struct Inputs<'a> {
    fixed: &'a Image<f32, 2>,
    moving: &'a Image<f32, 2>,
    search: &'a SearchRegionImage<2>,
    radius: BlockRadius<2>,
}

fn run<M, C>(
    inputs: &Inputs<'_>,
    config: &Config,
    metric: M,
    calculator: C,
) -> blockmatch::BlockMatchResult<DisplacementImage<2>>
where
    M: MetricImageFilter<2>,
    C: DisplacementCalculator<2>,
{
    let mut matcher = BlockMatcher::new(metric)
        .with_calculator(calculator)
        .with_fixed_image(inputs.fixed)
        .with_moving_image(inputs.moving)
        .with_radius(inputs.radius);
    matcher.set_parallel(config.parallel);
    if let Some(streaming) = config.streaming {
        matcher.set_use_streaming(true);
        matcher.set_tile_budget(streaming.into());
    }
    matcher.execute(inputs.search)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.trace {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive("blockmatch=info".parse()?),
            )
            .with_target(false)
            .init();
    }

    if cli.print_example {
        println!("{EXAMPLE_JSON}");
        return Ok(());
    }

    let config_text = fs::read_to_string(&cli.config)?;
    let config: Config = serde_json::from_str(&config_text)?;
    if config.fixed_path.is_empty() || config.moving_path.is_empty() {
        return Err("fixed_path and moving_path must be set in the config".into());
    }

    let fixed = load_gray_image(&config.fixed_path)?;
    let moving = load_gray_image(&config.moving_path)?;
    let radius = BlockRadius::try_from(config.block_radius)?;
    let search = SearchRegionInitializer::new(radius, config.search_radius)
        .with_overlap(config.overlap)
        .build(fixed.geometry(), moving.geometry())?;
    tracing::info!(
        sites = search.largest_region().num_pixels(),
        "search regions initialized"
    );

    let inputs = Inputs {
        fixed: &fixed,
        moving: &moving,
        search: &search,
        radius,
    };
    let field = match (config.metric, config.displacement) {
        (MetricConfig::Ncc, DisplacementConfig::Maximum) => run(
            &inputs,
            &config,
            NormalizedCrossCorrelation::new(),
            MaximumPixelDisplacementCalculator,
        )?,
        (MetricConfig::Ncc, DisplacementConfig::Parabolic) => run(
            &inputs,
            &config,
            NormalizedCrossCorrelation::new(),
            ParabolicInterpolationDisplacementCalculator,
        )?,
        (MetricConfig::MeanSquares, DisplacementConfig::Maximum) => run(
            &inputs,
            &config,
            MeanSquares::new(),
            MaximumPixelDisplacementCalculator,
        )?,
        (MetricConfig::MeanSquares, DisplacementConfig::Parabolic) => run(
            &inputs,
            &config,
            MeanSquares::new(),
            ParabolicInterpolationDisplacementCalculator,
        )?,
    };

    let output = Output::from(&field);
    let json = serde_json::to_string_pretty(&output)?;
    match &config.output_path {
        Some(path) => fs::write(path, json)?,
        None => println!("{json}"),
    }

    Ok(())
}
