//! Georeferenced float rasters and the scenario combination engine.
pub mod combine;
pub mod meta;

pub use combine::{average, average_with_threshold, combine, paired_select, CombineMode};
pub use meta::combine_scenario_meta;

use serde::{Deserialize, Serialize};

/// Header of an ESRI ASCII grid plus the running value range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridMeta {
    pub n_cols: usize,
    pub n_rows: usize,
    pub xll_corner: f64,
    pub yll_corner: f64,
    pub cell_size: f64,
    pub no_data: f64,
    /// Smallest non-NoData value; equals `no_data` while no valid cell exists.
    pub min: f64,
    /// Largest non-NoData value; equals `no_data` while no valid cell exists.
    pub max: f64,
}

impl GridMeta {
    pub fn new(n_rows: usize, n_cols: usize, no_data: f64) -> Self {
        Self {
            n_cols,
            n_rows,
            xll_corner: 0.0,
            yll_corner: 0.0,
            cell_size: 1.0,
            no_data,
            min: no_data,
            max: no_data,
        }
    }

    pub fn dims(&self) -> (usize, usize) {
        (self.n_rows, self.n_cols)
    }

    /// Widen min/max with `value` unless it is the NoData sentinel.
    pub fn observe(&mut self, value: f64) {
        if value == self.no_data {
            return;
        }
        if self.min == self.no_data || value < self.min {
            self.min = value;
        }
        if self.max == self.no_data || value > self.max {
            self.max = value;
        }
    }

    pub fn has_range(&self) -> bool {
        self.min != self.no_data && self.max != self.no_data
    }
}

/// Row-major raster of `n_rows × n_cols` f64 cells.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    pub data: Vec<f64>,
    pub meta: GridMeta,
}

impl Grid {
    /// Grid with `meta`'s geometry, every cell set to `fill`. Min/max are reset.
    pub fn filled(meta: &GridMeta, fill: f64) -> Self {
        let mut meta = meta.clone();
        meta.min = meta.no_data;
        meta.max = meta.no_data;
        Self { data: vec![fill; meta.n_rows * meta.n_cols], meta }
    }

    /// Wrap row-major `data`; min/max are computed from it.
    pub fn from_rows(meta: GridMeta, data: Vec<f64>) -> Self {
        debug_assert_eq!(data.len(), meta.n_rows * meta.n_cols);
        let mut grid = Self { data, meta };
        grid.recompute_min_max();
        grid
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.meta.n_cols + col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, val: f64) {
        self.data[row * self.meta.n_cols + col] = val;
    }

    pub fn row(&self, row: usize) -> &[f64] {
        let start = row * self.meta.n_cols;
        &self.data[start..start + self.meta.n_cols]
    }

    pub fn is_no_data(&self, value: f64) -> bool {
        value == self.meta.no_data
    }

    pub fn recompute_min_max(&mut self) {
        self.meta.min = self.meta.no_data;
        self.meta.max = self.meta.no_data;
        for &v in &self.data {
            self.meta.observe(v);
        }
    }
}

/// Apply `f(row_index, row)` to every row of a row-major buffer.
/// Rows are visited in parallel with the `threading` feature.
pub(crate) fn for_each_row_mut<F>(data: &mut [f64], n_cols: usize, f: F)
where
    F: Fn(usize, &mut [f64]) + Send + Sync,
{
    if n_cols == 0 {
        return;
    }
    #[cfg(feature = "threading")]
    {
        use rayon::prelude::*;
        data.par_chunks_mut(n_cols).enumerate().for_each(|(r, row)| f(r, row));
    }
    #[cfg(not(feature = "threading"))]
    {
        data.chunks_mut(n_cols).enumerate().for_each(|(r, row)| f(r, row));
    }
}
