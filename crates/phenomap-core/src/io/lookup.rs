//! Raster cell → reference lookup.
//!
//! Source CSV has a header naming `Column_`, `Row` and `soil_ref`; row and
//! column are 1-based. The extent is the largest row/column seen.
use std::io::BufRead;
use std::path::Path;

use crate::error::{PhenoError, Result};
use crate::io::compress::open_text;

/// Cell value for positions no reference maps to.
pub const NO_REF: i64 = -1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridLookup {
    pub n_rows: usize,
    pub n_cols: usize,
    /// Row-major refIds, [`NO_REF`] where absent.
    pub cells: Vec<i64>,
}

impl GridLookup {
    pub fn read(path: &Path) -> Result<Self> {
        Self::parse(open_text(path)?, path)
    }

    pub fn parse<R: BufRead>(reader: R, path: &Path) -> Result<Self> {
        let mut lines = reader.lines();
        let header = match lines.next() {
            Some(line) => line.map_err(|e| PhenoError::io(path, e))?,
            None => String::new(),
        };
        let find = |column: &'static str| {
            header
                .split(',')
                .position(|h| h.trim() == column)
                .ok_or_else(|| PhenoError::MissingColumn { path: path.to_path_buf(), column })
        };
        let (col_idx, row_idx, ref_idx) = (find("Column_")?, find("Row")?, find("soil_ref")?);

        let mut entries = Vec::new();
        let (mut n_rows, mut n_cols) = (0usize, 0usize);
        for (i, line) in lines.enumerate() {
            let line = line.map_err(|e| PhenoError::io(path, e))?;
            let line_no = i + 2;
            if line.trim().is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split(',').collect();
            let get = |idx: usize, name: &str| -> Result<i64> {
                let raw = fields
                    .get(idx)
                    .map(|f| f.trim())
                    .ok_or_else(|| PhenoError::parse(path, line_no, format!("missing `{name}` field")))?;
                raw.parse()
                    .map_err(|e| PhenoError::parse(path, line_no, format!("bad {name} `{raw}`: {e}")))
            };
            let (col, row, ref_id) = (get(col_idx, "Column_")?, get(row_idx, "Row")?, get(ref_idx, "soil_ref")?);
            if row < 1 || col < 1 {
                return Err(PhenoError::parse(path, line_no, format!("row/column must be 1-based, got {row}/{col}")));
            }
            let (row, col) = (row as usize, col as usize);
            n_rows = n_rows.max(row);
            n_cols = n_cols.max(col);
            entries.push((row - 1, col - 1, ref_id));
        }

        let mut cells = vec![NO_REF; n_rows * n_cols];
        for (row, col, ref_id) in entries {
            cells[row * n_cols + col] = ref_id;
        }
        Ok(Self { n_rows, n_cols, cells })
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> i64 {
        self.cells[row * self.n_cols + col]
    }

    pub fn row(&self, row: usize) -> &[i64] {
        let start = row * self.n_cols;
        &self.cells[start..start + self.n_cols]
    }
}
