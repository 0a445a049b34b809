//! Batch output: the per-year result table and the four summary rasters.
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::aggregate::SummaryResult;
use crate::batch::ReferenceOutcome;
use crate::error::{PhenoError, Result};
use crate::io::ascii_grid::write_header;
use crate::io::compress::GzTextWriter;
use crate::io::lookup::GridLookup;
use crate::raster::GridMeta;

/// Sentinel written for cells without a reference.
pub const NO_DATA: i64 = -9999;

const TABLE_HEADER: &str = "refId,climate,year,Tsum,frost_days,Tsum_reached,Wet_Harvest";

/// One of the summary rasters written per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryLayer {
    TsumAvg,
    TsumReached,
    FrostOccurrence,
    WetHarvest,
}

impl SummaryLayer {
    pub const ALL: [SummaryLayer; 4] = [
        SummaryLayer::TsumAvg,
        SummaryLayer::TsumReached,
        SummaryLayer::FrostOccurrence,
        SummaryLayer::WetHarvest,
    ];

    pub fn file_prefix(self) -> &'static str {
        match self {
            SummaryLayer::TsumAvg => "TsumAvg",
            SummaryLayer::TsumReached => "TsumReached",
            SummaryLayer::FrostOccurrence => "FrostOccurrence",
            SummaryLayer::WetHarvest => "WetHarvest",
        }
    }

    /// Cell value for one reference. The average is rounded half away from zero.
    pub fn value(self, summary: &SummaryResult) -> i64 {
        match self {
            SummaryLayer::TsumAvg => summary.tsum_avg.round() as i64,
            SummaryLayer::TsumReached => i64::from(summary.tsum_reached_count),
            SummaryLayer::FrostOccurrence => i64::from(summary.frost_occurrence_count),
            SummaryLayer::WetHarvest => i64::from(summary.wet_harvest_count),
        }
    }
}

/// Per-year rows for every reference, ordered by refId then year.
pub fn encode_year_table<W: Write>(out: &mut W, outcomes: &[ReferenceOutcome], start_year: i32) -> std::io::Result<()> {
    writeln!(out, "{TABLE_HEADER}")?;
    for outcome in outcomes {
        for (i, year) in outcome.years.iter().enumerate() {
            writeln!(
                out,
                "{},{},{},{:.6},{:.6},{},{}",
                outcome.ref_id,
                outcome.code,
                start_year + i as i32,
                year.tsum,
                f64::from(year.frost_days),
                year.tsum_reached,
                year.wet_harvest
            )?;
        }
    }
    Ok(())
}

/// Raster rows of `layer`. `outcomes` is indexed by `refId - 1`; lookup
/// entries outside `1..=outcomes.len()` become [`NO_DATA`].
pub fn encode_summary_grid<W: Write>(
    out: &mut W,
    layer: SummaryLayer,
    outcomes: &[ReferenceOutcome],
    lookup: &GridLookup,
) -> std::io::Result<()> {
    let meta = GridMeta::new(lookup.n_rows, lookup.n_cols, NO_DATA as f64);
    write_header(out, &meta, true)?;
    for r in 0..lookup.n_rows {
        for &ref_id in lookup.row(r) {
            let value = usize::try_from(ref_id)
                .ok()
                .filter(|&id| id >= 1)
                .and_then(|id| outcomes.get(id - 1))
                .map_or(NO_DATA, |o| layer.value(&o.summary));
            write!(out, "{value} ")?;
        }
        writeln!(out)?;
    }
    Ok(())
}

fn period_name(prefix: &str, start_year: i32, end_year: i32, ext: &str) -> String {
    format!("{prefix}_{start_year}-{end_year}.{ext}")
}

fn write_gz(name: PathBuf, body: impl FnOnce(&mut GzTextWriter) -> std::io::Result<()>) -> Result<PathBuf> {
    let mut out = GzTextWriter::create(&name)?;
    body(&mut out).map_err(|e| PhenoError::io(out.path(), e))?;
    out.finish()
}

/// Write `cal_res_ref_<start>-<end>.csv.gz` into `out_dir`.
pub fn write_year_table(outcomes: &[ReferenceOutcome], start_year: i32, end_year: i32, out_dir: &Path) -> Result<PathBuf> {
    let name = out_dir.join(period_name("cal_res_ref", start_year, end_year, "csv"));
    write_gz(name, |out| encode_year_table(out, outcomes, start_year))
}

/// Write `<Layer>_<start>-<end>.asc.gz` into `out_dir`.
pub fn write_summary_grid(
    layer: SummaryLayer,
    outcomes: &[ReferenceOutcome],
    lookup: &GridLookup,
    start_year: i32,
    end_year: i32,
    out_dir: &Path,
) -> Result<PathBuf> {
    let name = out_dir.join(period_name(layer.file_prefix(), start_year, end_year, "asc"));
    write_gz(name, |out| encode_summary_grid(out, layer, outcomes, lookup))
}

/// The year table followed by every [`SummaryLayer`]; returns the written paths.
pub fn write_results(
    outcomes: &[ReferenceOutcome],
    lookup: &GridLookup,
    start_year: i32,
    end_year: i32,
    out_dir: &Path,
) -> Result<Vec<PathBuf>> {
    let mut written = vec![write_year_table(outcomes, start_year, end_year, out_dir)?];
    for layer in SummaryLayer::ALL {
        written.push(write_summary_grid(layer, outcomes, lookup, start_year, end_year, out_dir)?);
    }
    Ok(written)
}
