//! Run-time configuration passed explicitly into engine construction.
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PhenoError, Result};
use crate::raster::CombineMode;

/// What to do with a weather row whose numeric or date fields do not parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ParsePolicy {
    /// Fail the whole weather series.
    #[default]
    Abort,
    /// Log a warning and drop the row.
    SkipRecord,
}

/// Parameters of one TSum batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// First calendar year processed (inclusive).
    pub start_year: i32,
    /// Last calendar year processed (inclusive).
    pub end_year: i32,
    /// Sowing DOY used when no sowing override exists for a (year, refId).
    pub sowing_default_doy: u32,
    /// Harvest DOY used when no harvest override exists for a (year, refId).
    pub harvest_default_doy: u32,
    pub parse_policy: ParsePolicy,
    /// Worker threads for weather groups; 0 lets rayon decide.
    /// Ignored without the `threading` feature.
    pub workers: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            start_year: 1980,
            end_year: 2010,
            sowing_default_doy: 150,
            harvest_default_doy: 300,
            parse_policy: ParsePolicy::Abort,
            workers: 0,
        }
    }
}

impl RunConfig {
    pub fn num_years(&self) -> usize {
        (self.end_year - self.start_year + 1).max(0) as usize
    }

    /// Zero-based slot of `year`, or None outside the configured range.
    pub fn year_index(&self, year: i32) -> Option<usize> {
        if year < self.start_year || year > self.end_year {
            None
        } else {
            Some((year - self.start_year) as usize)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.end_year < self.start_year {
            return Err(PhenoError::Config(format!(
                "end year {} precedes start year {}",
                self.end_year, self.start_year
            )));
        }
        for (label, doy) in [("sowing", self.sowing_default_doy), ("harvest", self.harvest_default_doy)] {
            if !(1..=366).contains(&doy) {
                return Err(PhenoError::Config(format!("default {label} DOY {doy} outside 1..=366")));
            }
        }
        Ok(())
    }
}

/// One named entry of a raster combination document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombineConfig {
    /// Grid path templates for the RCP 4.5 scenario.
    #[serde(alias = "asciigrids45")]
    pub ascii_grids_45: Vec<String>,
    /// Grid path templates for the RCP 8.5 scenario.
    #[serde(alias = "asciigrids85")]
    pub ascii_grids_85: Vec<String>,
    #[serde(alias = "asciigridhistorical")]
    pub ascii_grid_historical: Vec<String>,
    #[serde(alias = "outpath")]
    pub out_path: String,
    /// Output file name with two placeholders: crop, scenario.
    #[serde(alias = "outputgridtempl")]
    pub output_grid_templ: String,
    #[serde(alias = "combinemode")]
    pub combine_mode: CombineMode,
    pub threshold: f64,
    #[serde(alias = "defaultmin")]
    pub default_min: f64,
}

impl CombineConfig {
    /// Placeholder document written by `combine --write-config`.
    pub fn example_set() -> BTreeMap<String, CombineConfig> {
        let entry = |name: &str| CombineConfig {
            ascii_grids_45: vec!["path/to/ascii/%s/grid1".into(), "path/to/ascii/%s/grid2".into()],
            ascii_grids_85: vec!["path/to/ascii/%s/grid1".into(), "path/to/ascii/%s/grid2".into()],
            ascii_grid_historical: vec!["path/to/ascii/%s/grid_historical".into()],
            out_path: "path/to/output".into(),
            output_grid_templ: format!("{name}_%s_%s.asc"),
            combine_mode: CombineMode::Average,
            threshold: -1.0,
            default_min: 0.0,
        };
        ["config1", "config2"]
            .into_iter()
            .map(|name| (name.to_string(), entry(name)))
            .collect()
    }

    pub fn load_set<P: AsRef<Path>>(path: P) -> Result<BTreeMap<String, CombineConfig>> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| PhenoError::io(path, e))?;
        serde_yaml::from_str(&text).map_err(|e| {
            let line = e.location().map(|l| l.line()).unwrap_or(0);
            PhenoError::parse(path, line, e.to_string())
        })
    }

    pub fn save_set<P: AsRef<Path>>(set: &BTreeMap<String, CombineConfig>, path: P) -> Result<()> {
        let path = path.as_ref();
        let text = serde_yaml::to_string(set).map_err(|e| PhenoError::Config(e.to_string()))?;
        fs::write(path, text).map_err(|e| PhenoError::io(path, e))
    }
}

/// Substitute `args` into `template` in order. Accepts both `{}` and the
/// printf-style `%s`/`%d` placeholders used by existing path templates.
/// Surplus placeholders are left untouched.
pub fn expand_template(template: &str, args: &[&str]) -> String {
    let mut out = String::with_capacity(template.len() + 16);
    let mut args = args.iter();
    let mut rest = template;
    loop {
        let next = ["{}", "%s", "%d"]
            .iter()
            .filter_map(|p| rest.find(p).map(|i| (i, *p)))
            .min_by_key(|(i, _)| *i);
        match next {
            Some((i, token)) => {
                out.push_str(&rest[..i]);
                match args.next() {
                    Some(a) => out.push_str(a),
                    None => out.push_str(token),
                }
                rest = &rest[i + token.len()..];
            }
            None => {
                out.push_str(rest);
                return out;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_run_config_spans_31_years() {
        let cfg = RunConfig::default();
        assert_eq!(cfg.num_years(), 31);
        assert_eq!(cfg.year_index(1980), Some(0));
        assert_eq!(cfg.year_index(2010), Some(30));
        assert_eq!(cfg.year_index(2011), None);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn inverted_year_range_is_rejected() {
        let cfg = RunConfig { start_year: 2000, end_year: 1999, ..RunConfig::default() };
        assert!(matches!(cfg.validate(), Err(PhenoError::Config(_))));
    }

    #[test]
    fn out_of_range_default_doy_is_rejected() {
        let cfg = RunConfig { harvest_default_doy: 400, ..RunConfig::default() };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn expand_template_handles_both_styles() {
        assert_eq!(expand_template("weather/{}.csv", &["0815"]), "weather/0815.csv");
        assert_eq!(expand_template("weather/%s.csv", &["0815"]), "weather/0815.csv");
        assert_eq!(expand_template("c_%s_%s.asc", &["soy", "45"]), "c_soy_45.asc");
        assert_eq!(expand_template("plain.csv", &["x"]), "plain.csv");
        assert_eq!(expand_template("a_%s_%s", &["x"]), "a_x_%s");
    }

    #[test]
    fn combine_set_roundtrip_through_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yml");
        let set = CombineConfig::example_set();
        CombineConfig::save_set(&set, &path).unwrap();
        let loaded = CombineConfig::load_set(&path).unwrap();
        assert_eq!(loaded, set);
        assert_eq!(loaded["config2"].output_grid_templ, "config2_%s_%s.asc");
    }

    #[test]
    fn legacy_combine_document_with_integer_mode() {
        let doc = "maturity:\n  asciigrids45: [a45]\n  asciigrids85: [a85]\n  \
                   asciigridhistorical: [h]\n  outpath: out\n  outputgridtempl: m_%s_%s.asc\n  \
                   combinemode: 2\n  threshold: 10\n  defaultmin: 0\n";
        let set: BTreeMap<String, CombineConfig> = serde_yaml::from_str(doc).unwrap();
        let cfg = &set["maturity"];
        assert_eq!(cfg.combine_mode, CombineMode::PairedThreshold);
        assert_eq!(cfg.threshold, 10.0);
    }
}
