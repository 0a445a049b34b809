//! Per (year, refId) growing windows: sowing and harvest DOY bounds.
use std::io::BufRead;
use std::path::Path;

use crate::error::{PhenoError, Result};
use crate::io::compress::open_text;

/// Inclusive DOY range in which TSum and frost are accumulated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start_doy: u32,
    pub end_doy: u32,
}

impl TimeWindow {
    pub fn contains(&self, doy: u32) -> bool {
        self.start_doy <= doy && doy <= self.end_doy
    }
}

/// Which bound an override file sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowBound {
    Sowing,
    Harvest,
}

/// Windows for every reference and every year of a run, year-major.
#[derive(Debug, Clone)]
pub struct TimeWindows {
    start_year: i32,
    n_years: usize,
    n_refs: usize,
    windows: Vec<TimeWindow>,
}

impl TimeWindows {
    pub fn with_defaults(n_refs: usize, start_year: i32, end_year: i32, sowing_doy: u32, harvest_doy: u32) -> Self {
        let n_years = (end_year - start_year + 1).max(0) as usize;
        let default = TimeWindow { start_doy: sowing_doy, end_doy: harvest_doy };
        Self { start_year, n_years, n_refs, windows: vec![default; n_years * n_refs] }
    }

    pub fn n_refs(&self) -> usize {
        self.n_refs
    }

    fn slot(&self, year: i32, ref_id: u32) -> Option<usize> {
        let year_idx = usize::try_from(year - self.start_year).ok().filter(|&y| y < self.n_years)?;
        let ref_idx = (ref_id as usize).checked_sub(1).filter(|&r| r < self.n_refs)?;
        Some(year_idx * self.n_refs + ref_idx)
    }

    /// Window of `ref_id` (1-based) in `year`; None outside the run.
    pub fn get(&self, year: i32, ref_id: u32) -> Option<TimeWindow> {
        self.slot(year, ref_id).map(|i| self.windows[i])
    }

    /// Set one bound. Years outside the run are ignored; returns whether a
    /// slot was written. A refId outside `1..=n_refs` is an error.
    pub fn set(&mut self, year: i32, ref_id: u32, bound: WindowBound, doy: u32) -> Result<bool> {
        if ref_id == 0 || ref_id as usize > self.n_refs {
            return Err(PhenoError::DataIntegrity(format!(
                "window override for refId {ref_id}, expected 1..={}",
                self.n_refs
            )));
        }
        let Some(i) = self.slot(year, ref_id) else {
            return Ok(false);
        };
        match bound {
            WindowBound::Sowing => self.windows[i].start_doy = doy,
            WindowBound::Harvest => self.windows[i].end_doy = doy,
        }
        Ok(true)
    }

    /// Apply an override file (`refId,DOY,date`, optional `refId...` header,
    /// plain or `.gz`). Returns the number of rows applied.
    pub fn apply_file(&mut self, path: &Path, bound: WindowBound) -> Result<usize> {
        let applied = self.apply_reader(open_text(path)?, path, bound)?;
        tracing::debug!(path = %path.display(), ?bound, applied, "window overrides loaded");
        Ok(applied)
    }

    pub fn apply_reader<R: BufRead>(&mut self, reader: R, path: &Path, bound: WindowBound) -> Result<usize> {
        let mut applied = 0;
        for (i, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| PhenoError::io(path, e))?;
            let line_no = i + 1;
            if line.starts_with("refId") || line.trim().is_empty() {
                continue;
            }
            let mut fields = line.split(',').map(str::trim);
            let (Some(ref_id), Some(doy), Some(date)) = (fields.next(), fields.next(), fields.next()) else {
                return Err(PhenoError::parse(path, line_no, "expected refId,DOY,date"));
            };
            let ref_id: u32 = ref_id
                .parse()
                .map_err(|e| PhenoError::parse(path, line_no, format!("bad refId `{ref_id}`: {e}")))?;
            let doy: u32 = doy
                .parse()
                .map_err(|e| PhenoError::parse(path, line_no, format!("bad DOY `{doy}`: {e}")))?;
            let year: i32 = date
                .get(..4)
                .and_then(|y| y.parse().ok())
                .ok_or_else(|| PhenoError::parse(path, line_no, format!("bad date `{date}`")))?;
            if self.set(year, ref_id, bound, doy)? {
                applied += 1;
            }
        }
        Ok(applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn defaults_cover_every_slot() {
        let w = TimeWindows::with_defaults(3, 2000, 2002, 150, 300);
        assert_eq!(w.get(2001, 3), Some(TimeWindow { start_doy: 150, end_doy: 300 }));
        assert_eq!(w.get(1999, 1), None);
        assert_eq!(w.get(2003, 1), None);
        assert_eq!(w.get(2000, 0), None);
        assert_eq!(w.get(2000, 4), None);
    }

    #[test]
    fn window_bounds_are_inclusive() {
        let w = TimeWindow { start_doy: 10, end_doy: 20 };
        assert!(w.contains(10) && w.contains(20));
        assert!(!w.contains(9) && !w.contains(21));
    }

    #[test]
    fn override_file_sets_one_bound() {
        let text = "refId,DOY,date\n2,120,2001-04-30\n1,99,1970-04-09\n\n";
        let mut w = TimeWindows::with_defaults(2, 2000, 2002, 150, 300);
        let applied = w.apply_reader(Cursor::new(text), Path::new("sow.csv"), WindowBound::Sowing).unwrap();
        assert_eq!(applied, 1, "out-of-range year is ignored");
        assert_eq!(w.get(2001, 2), Some(TimeWindow { start_doy: 120, end_doy: 300 }));
        assert_eq!(w.get(2001, 1), Some(TimeWindow { start_doy: 150, end_doy: 300 }));

        w.apply_reader(Cursor::new("2,280,2001-10-07\n"), Path::new("h.csv"), WindowBound::Harvest)
            .unwrap();
        assert_eq!(w.get(2001, 2), Some(TimeWindow { start_doy: 120, end_doy: 280 }));
    }

    #[test]
    fn unknown_reference_is_integrity_error() {
        let mut w = TimeWindows::with_defaults(2, 2000, 2000, 150, 300);
        let err = w
            .apply_reader(Cursor::new("3,100,2000-04-09\n"), Path::new("s.csv"), WindowBound::Sowing)
            .unwrap_err();
        assert!(matches!(err, PhenoError::DataIntegrity(_)));
    }

    #[test]
    fn malformed_row_reports_line() {
        let mut w = TimeWindows::with_defaults(2, 2000, 2000, 150, 300);
        let err = w
            .apply_reader(Cursor::new("refId,DOY,date\n1,abc,2000-01-01\n"), Path::new("s.csv"), WindowBound::Sowing)
            .unwrap_err();
        assert!(matches!(err, PhenoError::Parse { line: 2, .. }));
    }

    #[test]
    fn gzip_override_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut out = crate::io::GzTextWriter::create(&dir.path().join("sow.csv")).unwrap();
        out.write_str("refId,DOY,date\n1,101,2000-04-10\n").unwrap();
        let path = out.finish().unwrap();
        let mut w = TimeWindows::with_defaults(1, 2000, 2000, 150, 300);
        assert_eq!(w.apply_file(&path, WindowBound::Sowing).unwrap(), 1);
        assert_eq!(w.get(2000, 1).map(|w| w.start_doy), Some(101));
    }
}
