//! ESRI ASCII grid codec.
//!
//! Six header lines (`ncols`, `nrows`, `xllcorner`, `yllcorner`, `cellsize`,
//! `NODATA_value`) followed by `nrows` lines of `ncols` space-separated
//! numbers, first line = northernmost row.
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use crate::error::{PhenoError, Result};
use crate::io::compress::{open_text, GzTextWriter};
use crate::raster::{Grid, GridMeta};

const HEADER_LINES: usize = 6;

/// Read a grid from a plain or `.gz` file.
pub fn read_ascii_grid(path: &Path) -> Result<Grid> {
    parse_ascii_grid(open_text(path)?, path)
}

/// Parse a grid from any buffered reader; `path` is used in error messages.
pub fn parse_ascii_grid<R: BufRead>(reader: R, path: &Path) -> Result<Grid> {
    let mut lines = reader.lines();
    let mut meta = GridMeta::new(0, 0, 0.0);
    let mut line_no = 0;

    for _ in 0..HEADER_LINES {
        let line = lines
            .next()
            .ok_or_else(|| PhenoError::parse(path, line_no, "truncated header"))?
            .map_err(|e| PhenoError::io(path, e))?;
        line_no += 1;
        let mut parts = line.split_whitespace();
        let (Some(key), Some(value)) = (parts.next(), parts.next()) else {
            return Err(PhenoError::parse(path, line_no, format!("bad header line `{line}`")));
        };
        let bad = |e: &dyn std::fmt::Display| PhenoError::parse(path, line_no, format!("bad {key} `{value}`: {e}"));
        match key.to_ascii_lowercase().as_str() {
            "ncols" => meta.n_cols = value.parse().map_err(|e| bad(&e))?,
            "nrows" => meta.n_rows = value.parse().map_err(|e| bad(&e))?,
            "xllcorner" => meta.xll_corner = value.parse().map_err(|e| bad(&e))?,
            "yllcorner" => meta.yll_corner = value.parse().map_err(|e| bad(&e))?,
            "cellsize" => meta.cell_size = value.parse().map_err(|e| bad(&e))?,
            "nodata_value" => meta.no_data = value.parse().map_err(|e| bad(&e))?,
            other => {
                return Err(PhenoError::parse(path, line_no, format!("unknown header key `{other}`")));
            }
        }
    }
    meta.min = meta.no_data;
    meta.max = meta.no_data;

    let mut data = Vec::with_capacity(meta.n_rows * meta.n_cols);
    for line in lines {
        let line = line.map_err(|e| PhenoError::io(path, e))?;
        line_no += 1;
        if line.trim().is_empty() {
            continue;
        }
        if data.len() >= meta.n_rows * meta.n_cols {
            return Err(PhenoError::parse(path, line_no, format!("more than {} data rows", meta.n_rows)));
        }
        let start = data.len();
        for token in line.split_whitespace() {
            let value: f64 = token
                .parse()
                .map_err(|e| PhenoError::parse(path, line_no, format!("bad cell `{token}`: {e}")))?;
            meta.observe(value);
            data.push(value);
        }
        if data.len() - start != meta.n_cols {
            return Err(PhenoError::parse(
                path,
                line_no,
                format!("expected {} values, found {}", meta.n_cols, data.len() - start),
            ));
        }
    }
    if data.len() != meta.n_rows * meta.n_cols {
        return Err(PhenoError::parse(
            path,
            line_no,
            format!("expected {} data rows, found {}", meta.n_rows, data.len() / meta.n_cols.max(1)),
        ));
    }
    Ok(Grid { data, meta })
}

/// Write the six header lines. `integer_no_data` prints the sentinel without decimals.
pub fn write_header<W: Write>(out: &mut W, meta: &GridMeta, integer_no_data: bool) -> std::io::Result<()> {
    writeln!(out, "ncols {}", meta.n_cols)?;
    writeln!(out, "nrows {}", meta.n_rows)?;
    writeln!(out, "xllcorner     {:.6}", meta.xll_corner)?;
    writeln!(out, "yllcorner     {:.6}", meta.yll_corner)?;
    writeln!(out, "cellsize      {:.6}", meta.cell_size)?;
    if integer_no_data {
        writeln!(out, "NODATA_value  {}", meta.no_data.round() as i64)
    } else {
        writeln!(out, "NODATA_value  {:.6}", meta.no_data)
    }
}

/// Write header and rows of `grid`.
pub fn encode_ascii_grid<W: Write>(out: &mut W, grid: &Grid) -> std::io::Result<()> {
    write_header(out, &grid.meta, false)?;
    for r in 0..grid.meta.n_rows {
        for v in grid.row(r) {
            write!(out, "{v:.6} ")?;
        }
        writeln!(out)?;
    }
    Ok(())
}

/// Write `grid` gzip-compressed to `<name>.gz`; returns the written path.
pub fn write_ascii_grid(grid: &Grid, name: &Path) -> Result<PathBuf> {
    let mut out = GzTextWriter::create(name)?;
    let path = out.path().to_path_buf();
    encode_ascii_grid(&mut out, grid).map_err(|e| PhenoError::io(&path, e))?;
    out.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const TEXT: &str = "ncols 3\nnrows 2\nxllcorner 10.5\nyllcorner -2\ncellsize 0.25\nNODATA_value -9999\n\
                        1 2 -9999\n4.5  -1 6\n";

    #[test]
    fn parses_header_and_range() {
        let grid = parse_ascii_grid(Cursor::new(TEXT), Path::new("t.asc")).unwrap();
        assert_eq!(grid.meta.dims(), (2, 3));
        assert_eq!(grid.meta.xll_corner, 10.5);
        assert_eq!(grid.meta.cell_size, 0.25);
        assert_eq!(grid.meta.no_data, -9999.0);
        assert_eq!(grid.meta.min, -1.0);
        assert_eq!(grid.meta.max, 6.0);
        assert_eq!(grid.get(1, 0), 4.5);
    }

    #[test]
    fn short_row_is_rejected() {
        let text = "ncols 3\nnrows 1\nxllcorner 0\nyllcorner 0\ncellsize 1\nNODATA_value -1\n1 2\n";
        let err = parse_ascii_grid(Cursor::new(text), Path::new("t.asc")).unwrap_err();
        assert!(matches!(err, PhenoError::Parse { line: 7, .. }));
    }

    #[test]
    fn missing_rows_are_rejected() {
        let text = "ncols 1\nnrows 2\nxllcorner 0\nyllcorner 0\ncellsize 1\nNODATA_value -1\n1\n";
        assert!(parse_ascii_grid(Cursor::new(text), Path::new("t.asc")).is_err());
    }

    #[test]
    fn written_grid_reads_back() {
        let grid = parse_ascii_grid(Cursor::new(TEXT), Path::new("t.asc")).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let written = write_ascii_grid(&grid, &dir.path().join("out.asc")).unwrap();
        assert!(written.to_string_lossy().ends_with("out.asc.gz"));
        let back = read_ascii_grid(&written).unwrap();
        assert_eq!(back, grid);
    }

    #[test]
    fn header_layout() {
        let mut buf = Vec::new();
        write_header(&mut buf, &GridMeta::new(2, 4, -9999.0), true).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(
            text,
            "ncols 4\nnrows 2\nxllcorner     0.000000\nyllcorner     0.000000\ncellsize      1.000000\nNODATA_value  -9999\n"
        );
    }
}
