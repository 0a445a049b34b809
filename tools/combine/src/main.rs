/// Scenario raster combiner: merges per-model grids of the historical,
/// RCP 4.5 and RCP 8.5 scenarios into one composite each, then writes the
/// composites with `.meta` legends sharing one value range.
///
/// The config document maps a name to grid path templates, an output
/// template and the combination mode; entries run in name order.
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use phenomap_core::config::expand_template;
use phenomap_core::io::meta_file::{write_meta_file, PlotMeta};
use phenomap_core::io::{read_ascii_grid, write_ascii_grid};
use phenomap_core::raster::{combine, combine_scenario_meta};
use phenomap_core::{CombineConfig, Grid};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// ── CLI ──────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "combine", about = "Combine scenario ASCII grids into composite maps")]
struct Args {
    /// Combination config document (YAML)
    #[arg(long, default_value = "config.yml")]
    config: PathBuf,

    /// Write an example config to --config and exit
    #[arg(long)]
    write_config: bool,

    /// Crop name used in output file names
    #[arg(long, default_value = "chickpea")]
    crop: String,

    /// Substituted into the grid path templates
    #[arg(long, default_value = "crop")]
    crop_path: String,
}

// ── Scenarios ────────────────────────────────────────────────────────────────

/// Output name and legend title of each composite.
const HISTORICAL: (&str, &str) = ("historical", "(a)");
const RCP45: (&str, &str) = ("45", "(b)");
const RCP85: (&str, &str) = ("85", "(c)");

fn read_grids(templates: &[String], crop_path: &str) -> Result<Vec<Grid>> {
    templates
        .iter()
        .map(|templ| {
            let path = PathBuf::from(expand_template(templ, &[crop_path]));
            read_ascii_grid(&path).with_context(|| format!("Cannot read grid {}", path.display()))
        })
        .collect()
}

fn combine_scenario(name: &str, templates: &[String], cfg: &CombineConfig, crop_path: &str) -> Result<Grid> {
    let grids = read_grids(templates, crop_path)?;
    combine(&grids, cfg.combine_mode, cfg.threshold, cfg.default_min)
        .with_context(|| format!("Cannot combine {name} grids"))
}

/// Combine and write one config entry; returns the written grid paths.
fn process(name: &str, cfg: &CombineConfig, crop: &str, crop_path: &str) -> Result<Vec<PathBuf>> {
    let historical = combine_scenario(HISTORICAL.0, &cfg.ascii_grid_historical, cfg, crop_path)?;
    let rcp45 = combine_scenario(RCP45.0, &cfg.ascii_grids_45, cfg, crop_path)?;
    let rcp85 = combine_scenario(RCP85.0, &cfg.ascii_grids_85, cfg, crop_path)?;
    let shared = combine_scenario_meta(&historical.meta, &rcp45.meta, &rcp85.meta);
    info!(config = name, min = shared.min, max = shared.max, "combined");

    let mut written = Vec::with_capacity(3);
    for ((scenario, title), grid) in [(RCP45, &rcp45), (RCP85, &rcp85), (HISTORICAL, &historical)] {
        let out_name = Path::new(&cfg.out_path).join(expand_template(&cfg.output_grid_templ, &[crop, scenario]));
        let grid_path = write_ascii_grid(grid, &out_name)
            .with_context(|| format!("Cannot write {}", out_name.display()))?;
        write_meta_file(&out_name, &PlotMeta::for_grid(title, &shared))
            .with_context(|| format!("Cannot write legend for {}", out_name.display()))?;
        written.push(grid_path);
    }
    Ok(written)
}

fn run(args: &Args) -> Result<Vec<PathBuf>> {
    if args.write_config {
        CombineConfig::save_set(&CombineConfig::example_set(), &args.config)
            .with_context(|| format!("Cannot write {}", args.config.display()))?;
        info!(path = %args.config.display(), "example config written");
        return Ok(vec![args.config.clone()]);
    }
    let configs: BTreeMap<String, CombineConfig> = CombineConfig::load_set(&args.config)
        .with_context(|| format!("Cannot load config {}", args.config.display()))?;
    let mut written = Vec::new();
    for (name, cfg) in &configs {
        written.extend(process(name, cfg, &args.crop, &args.crop_path).with_context(|| format!("Config `{name}` failed"))?);
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

#[cfg(test)]
mod tests {
    use super::*;
    use phenomap_core::raster::GridMeta;
    use phenomap_core::CombineMode;
    use std::fs;

    fn grid(values: &[f64]) -> Grid {
        Grid::from_rows(GridMeta::new(1, values.len(), -9999.0), values.to_vec())
    }

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["combine"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn write_config_round_trips_example() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yml");
        run(&args(&["--write-config", "--config", path.to_str().unwrap()])).unwrap();
        assert_eq!(CombineConfig::load_set(&path).unwrap(), CombineConfig::example_set());
    }

    #[test]
    fn composites_share_one_legend_range() {
        let dir = tempfile::tempdir().unwrap();
        let grids = dir.path().join("soy");
        for (name, values) in [
            ("h1", [1.0, 2.0, -9999.0]),
            ("h2", [3.0, 4.0, 5.0]),
            ("a1", [0.0, 10.0, 2.0]),
            ("b1", [6.0, 6.0, 6.0]),
        ] {
            write_ascii_grid(&grid(&values), &grids.join(format!("{name}.asc"))).unwrap();
        }
        let templ = |name: &str| dir.path().join(format!("%s/{name}.asc.gz")).to_string_lossy().into_owned();
        let cfg = CombineConfig {
            ascii_grids_45: vec![templ("a1")],
            ascii_grids_85: vec![templ("b1")],
            ascii_grid_historical: vec![templ("h1"), templ("h2")],
            out_path: dir.path().join("out").to_string_lossy().into_owned(),
            output_grid_templ: "%s_%s.asc".into(),
            combine_mode: CombineMode::Average,
            threshold: 0.0,
            default_min: 0.0,
        };
        let written = process("c", &cfg, "soy", "soy").unwrap();
        let names: Vec<_> = written.iter().map(|p| p.file_name().unwrap().to_string_lossy().into_owned()).collect();
        assert_eq!(names, vec!["soy_45.asc.gz", "soy_85.asc.gz", "soy_historical.asc.gz"]);

        let hist = read_ascii_grid(&written[2]).unwrap();
        assert_eq!(hist.data, vec![2.0, 3.0, -9999.0]);

        let legend = fs::read_to_string(dir.path().join("out/soy_historical.asc.meta")).unwrap();
        assert!(legend.starts_with("title: '(a)'\n"));
        assert!(legend.contains("maxValue: 10.00\n"));
        assert!(legend.contains("minValue: 0.00\n"));
        let legend45 = fs::read_to_string(dir.path().join("out/soy_45.asc.meta")).unwrap();
        assert!(legend45.starts_with("title: '(b)'\n"));
        assert!(legend45.contains("maxValue: 10.00\n"));
    }

    #[test]
    fn missing_grid_names_the_file() {
        let cfg = CombineConfig {
            ascii_grid_historical: vec!["/no/such/%s.asc.gz".into()],
            ..CombineConfig::example_set()["config1"].clone()
        };
        let err = process("c", &cfg, "soy", "x").unwrap_err();
        assert!(format!("{err:#}").contains("/no/such/x.asc.gz"));
    }
}
