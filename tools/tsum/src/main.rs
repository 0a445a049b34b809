/// TSum batch tool: for every climate/soil reference, accumulates thermal
/// time inside the sowing to harvest window, counts frost days and flags wet
/// harvests per year, then writes the per-year table and summary rasters.
///
/// Inputs:  crop document, reference → weather mapping, optional sowing and
///          harvest DOY overrides, one weather CSV per weather code.
/// Outputs: cal_res_ref_<start>-<end>.csv.gz and four <Layer>_<start>-<end>.asc.gz grids.
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use phenomap_core::io::results::write_results;
use phenomap_core::io::GridLookup;
use phenomap_core::{
    run_batch, CancelToken, Crop, FileWeatherSource, ParsePolicy, ReferenceMap, RunConfig, TimeWindows, WindowBound,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// ── CLI ──────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "tsum",
    about = "Compute TSum, frost and wet-harvest risk per climate reference"
)]
struct Args {
    /// Crop document (YAML, or JSON with a .json extension)
    #[arg(long, default_value = "soybean.yml")]
    crop: PathBuf,

    /// Write the default soybean crop to --crop and exit
    #[arg(long)]
    create_crop: bool,

    /// Sowing date overrides (refId,DOY,date; .gz allowed)
    #[arg(long)]
    sowing: Option<PathBuf>,

    /// Sowing DOY where no override exists
    #[arg(long, default_value_t = 150)]
    sowing_default: u32,

    /// Harvest date overrides (refId,DOY,date; .gz allowed)
    #[arg(long)]
    harvest: Option<PathBuf>,

    /// Harvest DOY where no override exists
    #[arg(long, default_value_t = 300)]
    harvest_default: u32,

    #[arg(long, default_value_t = 1980)]
    start_year: i32,

    #[arg(long, default_value_t = 2010)]
    end_year: i32,

    /// Weather file template; `{}` or `%s` is replaced by the weather code
    #[arg(long, default_value = "weather/%s.csv")]
    weather: String,

    /// refId → weather code mapping
    #[arg(long, default_value = "stu_eu_layer_ref.csv")]
    reference: PathBuf,

    /// Raster cell → refId lookup (Column_, Row, soil_ref)
    #[arg(long, default_value = "stu_eu_layer_grid.csv")]
    grid_to_ref: PathBuf,

    /// Output folder (created if absent)
    #[arg(short, long, default_value = "./output")]
    output: PathBuf,

    /// Worker threads for weather files (0 = one per core)
    #[arg(long, default_value_t = 0)]
    workers: usize,

    /// Drop malformed weather rows with a warning instead of failing
    #[arg(long)]
    skip_bad_records: bool,
}

impl Args {
    fn run_config(&self) -> RunConfig {
        RunConfig {
            start_year: self.start_year,
            end_year: self.end_year,
            sowing_default_doy: self.sowing_default,
            harvest_default_doy: self.harvest_default,
            parse_policy: if self.skip_bad_records { ParsePolicy::SkipRecord } else { ParsePolicy::Abort },
            workers: self.workers,
        }
    }
}

fn load_windows(args: &Args, config: &RunConfig, n_refs: usize) -> Result<TimeWindows> {
    let mut windows = TimeWindows::with_defaults(
        n_refs,
        config.start_year,
        config.end_year,
        config.sowing_default_doy,
        config.harvest_default_doy,
    );
    let overrides: [(&Option<PathBuf>, WindowBound); 2] =
        [(&args.sowing, WindowBound::Sowing), (&args.harvest, WindowBound::Harvest)];
    for (path, bound) in overrides {
        if let Some(path) = path {
            let applied = windows
                .apply_file(path, bound)
                .with_context(|| format!("Cannot apply {bound:?} dates from {}", path.display()))?;
            info!(path = %path.display(), applied, "window overrides");
        }
    }
    Ok(windows)
}

fn run(args: &Args) -> Result<Vec<PathBuf>> {
    if args.create_crop {
        Crop::soybean_default()
            .save(&args.crop)
            .with_context(|| format!("Cannot write {}", args.crop.display()))?;
        info!(path = %args.crop.display(), "crop file written");
        return Ok(vec![args.crop.clone()]);
    }

    let crop = Crop::load(&args.crop).with_context(|| format!("Cannot load crop {}", args.crop.display()))?;
    let config = args.run_config();
    config.validate()?;

    let refs = ReferenceMap::read(&args.reference)
        .with_context(|| format!("Cannot read references {}", args.reference.display()))?;
    let windows = load_windows(args, &config, refs.len())?;
    let source = FileWeatherSource::new(args.weather.as_str());

    let outcomes = run_batch(&crop, &config, &refs, &windows, &source, &CancelToken::new())
        .context("TSum calculation failed")?;

    let lookup = GridLookup::read(&args.grid_to_ref)
        .with_context(|| format!("Cannot read grid lookup {}", args.grid_to_ref.display()))?;
    let written = write_results(&outcomes, &lookup, config.start_year, config.end_year, &args.output)
        .with_context(|| format!("Cannot write results to {}", args.output.display()))?;
    for path in &written {
        info!(path = %path.display(), "wrote");
    }
    Ok(written)
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    run(&args).map(|_| ())
}
