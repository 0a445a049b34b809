//! Daily weather series: record type and a streaming CSV reader.
//!
//! File layout: two header lines (column names are looked up in both; the
//! second usually carries units), then one comma-separated row per day in
//! ascending date order. Recognised columns are `date`/`iso-date`
//! (`YYYY-MM-DD`), `tavg`, `tmin` and `precip`.
use std::io::BufRead;
use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate};

use crate::error::{PhenoError, Result};
use crate::io::compress::open_text;

const HEADER_LINES: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeatherRecord {
    pub date: NaiveDate,
    /// Daily mean temperature, °C.
    pub tavg: f64,
    /// Daily minimum temperature, °C.
    pub tmin: f64,
    /// Daily precipitation, mm.
    pub precip: f64,
}

impl WeatherRecord {
    pub fn new(date: NaiveDate, tavg: f64, tmin: f64, precip: f64) -> Self {
        Self { date, tavg, tmin, precip }
    }

    pub fn year(&self) -> i32 {
        self.date.year()
    }

    /// Day of year, 1-based.
    pub fn doy(&self) -> u32 {
        self.date.ordinal()
    }
}

#[derive(Debug, Clone, Copy)]
struct Columns {
    date: usize,
    tavg: usize,
    tmin: usize,
    precip: usize,
}

/// Iterator over the rows of one weather series. Each malformed row yields
/// its own `Err`; the caller decides whether to stop.
pub struct WeatherReader<R: BufRead> {
    lines: std::io::Lines<R>,
    path: PathBuf,
    line_no: usize,
    columns: Columns,
}

impl<R: BufRead> std::fmt::Debug for WeatherReader<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeatherReader")
            .field("path", &self.path)
            .field("line_no", &self.line_no)
            .field("columns", &self.columns)
            .finish()
    }
}

impl<R: BufRead> WeatherReader<R> {
    /// Consume the header lines and locate the required columns.
    /// `path` is only used in error messages.
    pub fn new(reader: R, path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut lines = reader.lines();
        let (mut date, mut tavg, mut tmin, mut precip) = (None, None, None, None);
        let mut line_no = 0;
        for _ in 0..HEADER_LINES {
            let Some(line) = lines.next() else { break };
            let line = line.map_err(|e| PhenoError::io(&path, e))?;
            line_no += 1;
            for (idx, field) in line.split(',').enumerate() {
                match field.trim() {
                    "date" | "iso-date" => date = Some(idx),
                    "tavg" => tavg = Some(idx),
                    "tmin" => tmin = Some(idx),
                    "precip" => precip = Some(idx),
                    _ => {}
                }
            }
        }
        let require = |col: Option<usize>, column: &'static str| {
            col.ok_or_else(|| PhenoError::MissingColumn { path: path.clone(), column })
        };
        let columns = Columns {
            date: require(date, "date")?,
            tavg: require(tavg, "tavg")?,
            tmin: require(tmin, "tmin")?,
            precip: require(precip, "precip")?,
        };
        Ok(Self { lines, path, line_no, columns })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn parse_row(&self, line: &str) -> Result<WeatherRecord> {
        let fields: Vec<&str> = line.split(',').collect();
        let field = |idx: usize, name: &'static str| {
            fields
                .get(idx)
                .map(|f| f.trim())
                .ok_or_else(|| PhenoError::parse(&self.path, self.line_no, format!("missing `{name}` field")))
        };
        let number = |idx: usize, name: &'static str| -> Result<f64> {
            let raw = field(idx, name)?;
            raw.parse::<f64>()
                .map_err(|e| PhenoError::parse(&self.path, self.line_no, format!("bad {name} `{raw}`: {e}")))
        };
        let raw_date = field(self.columns.date, "date")?;
        let date = NaiveDate::parse_from_str(raw_date, "%Y-%m-%d")
            .map_err(|e| PhenoError::parse(&self.path, self.line_no, format!("bad date `{raw_date}`: {e}")))?;
        Ok(WeatherRecord {
            date,
            tavg: number(self.columns.tavg, "tavg")?,
            tmin: number(self.columns.tmin, "tmin")?,
            precip: number(self.columns.precip, "precip")?,
        })
    }
}

impl<R: BufRead> Iterator for WeatherReader<R> {
    type Item = Result<WeatherRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(PhenoError::io(&self.path, e))),
            };
            self.line_no += 1;
            if line.trim().is_empty() {
                continue;
            }
            return Some(self.parse_row(&line));
        }
    }
}

/// Open a weather file (plain or `.gz`) for streaming.
pub fn open_weather(path: &Path) -> Result<WeatherReader<Box<dyn BufRead + Send>>> {
    WeatherReader::new(open_text(path)?, path)
}
