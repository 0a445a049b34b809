//! Scenario raster combination.
//!
//! Three policies over an ordered list of equally-shaped grids:
//!
//! * `Average`: per-cell mean; any NoData input poisons the cell, and the
//!   divisor is always the grid count, never the count of valid inputs.
//! * `AverageWithThreshold`: the same mean, then values below `threshold`
//!   are clamped to 0.
//! * `PairedThreshold`: grids come in (base, indicator) pairs; each pair
//!   selects `base` where `indicator < threshold` and `default_min`
//!   elsewhere; several pairs are then averaged.
//!
//! Output geometry and NoData sentinel come from the first grid.
use serde::{Deserialize, Serialize};

use super::{for_each_row_mut, Grid};
use crate::error::{PhenoError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "CombineModeRepr")]
pub enum CombineMode {
    Average,
    AverageWithThreshold,
    PairedThreshold,
}

/// Documents may name the mode or use the legacy integer code 0/1/2.
#[derive(Deserialize)]
#[serde(untagged)]
enum CombineModeRepr {
    Code(u8),
    Name(String),
}

impl TryFrom<CombineModeRepr> for CombineMode {
    type Error = String;

    fn try_from(repr: CombineModeRepr) -> std::result::Result<Self, Self::Error> {
        match repr {
            CombineModeRepr::Code(0) => Ok(Self::Average),
            CombineModeRepr::Code(1) => Ok(Self::AverageWithThreshold),
            CombineModeRepr::Code(2) => Ok(Self::PairedThreshold),
            CombineModeRepr::Code(n) => Err(format!("unknown combine mode code {n}")),
            CombineModeRepr::Name(name) => match name.to_ascii_lowercase().as_str() {
                "average" | "avg" => Ok(Self::Average),
                "average_with_threshold" | "avg_threshold" => Ok(Self::AverageWithThreshold),
                "paired_threshold" | "pairs_with_threshold" => Ok(Self::PairedThreshold),
                other => Err(format!("unknown combine mode `{other}`")),
            },
        }
    }
}

/// Combine `grids` under `mode`. `threshold` is used by the threshold modes,
/// `default_min` only by `PairedThreshold`.
pub fn combine(grids: &[Grid], mode: CombineMode, threshold: f64, default_min: f64) -> Result<Grid> {
    if grids.is_empty() {
        return Err(PhenoError::Config("no grids to combine".into()));
    }
    match mode {
        CombineMode::Average => average(grids),
        CombineMode::AverageWithThreshold => average_with_threshold(grids, threshold),
        CombineMode::PairedThreshold => {
            if grids.len() % 2 != 0 {
                return Err(PhenoError::OddPairCount(grids.len()));
            }
            check_geometry(grids)?;
            let mut selected: Vec<Grid> = grids
                .chunks_exact(2)
                .map(|pair| paired_select(&pair[0], &pair[1], threshold, default_min))
                .collect();
            if selected.len() == 1 {
                return Ok(selected.remove(0));
            }
            average(&selected)
        }
    }
}

/// Per-cell mean across `grids`.
pub fn average(grids: &[Grid]) -> Result<Grid> {
    let mut out = accumulate(grids)?;
    let n = grids.len() as f64;
    let no_data = out.meta.no_data;
    for_each_row_mut(&mut out.data, out.meta.n_cols, |_, row| {
        for v in row.iter_mut().filter(|v| **v != no_data) {
            *v /= n;
        }
    });
    out.recompute_min_max();
    Ok(out)
}

/// Per-cell mean, with results below `threshold` set to 0 (not NoData).
pub fn average_with_threshold(grids: &[Grid], threshold: f64) -> Result<Grid> {
    let mut out = accumulate(grids)?;
    let n = grids.len() as f64;
    let no_data = out.meta.no_data;
    for_each_row_mut(&mut out.data, out.meta.n_cols, |_, row| {
        for v in row.iter_mut().filter(|v| **v != no_data) {
            *v /= n;
            if *v < threshold {
                *v = 0.0;
            }
        }
    });
    out.recompute_min_max();
    Ok(out)
}

/// Select `base` where `indicator < threshold`, else `default_min`.
/// NoData in `base` stays NoData; the indicator's sentinel is not consulted.
/// Both grids must share the same shape.
pub fn paired_select(base: &Grid, indicator: &Grid, threshold: f64, default_min: f64) -> Grid {
    let mut out = Grid::filled(&base.meta, 0.0);
    let no_data = out.meta.no_data;
    let base_no_data = base.meta.no_data;
    for_each_row_mut(&mut out.data, out.meta.n_cols, |r, row| {
        let values = base.row(r);
        let flags = indicator.row(r);
        for ((o, &v), &flag) in row.iter_mut().zip(values).zip(flags) {
            *o = if v == base_no_data {
                no_data
            } else if flag < threshold {
                v
            } else {
                default_min
            };
        }
    });
    out.recompute_min_max();
    out
}

/// Every grid must have the first grid's row and column counts.
pub fn check_geometry(grids: &[Grid]) -> Result<()> {
    let Some(first) = grids.first() else {
        return Err(PhenoError::Config("no grids to combine".into()));
    };
    let expected = first.meta.dims();
    for (index, grid) in grids.iter().enumerate().skip(1) {
        let found = grid.meta.dims();
        if found != expected || grid.data.len() != first.data.len() {
            return Err(PhenoError::DimensionMismatch { index, expected, found });
        }
    }
    Ok(())
}

/// Sum all grids cell-wise; a cell becomes NoData for good once any input
/// (judged by that input's own sentinel) is NoData there.
fn accumulate(grids: &[Grid]) -> Result<Grid> {
    check_geometry(grids)?;
    let mut out = Grid::filled(&grids[0].meta, 0.0);
    let no_data = out.meta.no_data;
    for_each_row_mut(&mut out.data, out.meta.n_cols, |r, row| {
        for grid in grids {
            let src_no_data = grid.meta.no_data;
            for (o, &v) in row.iter_mut().zip(grid.row(r)) {
                if v == src_no_data || *o == no_data {
                    *o = no_data;
                } else {
                    *o += v;
                }
            }
        }
    });
    Ok(out)
}
