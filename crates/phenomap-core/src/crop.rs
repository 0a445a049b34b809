//! Crop definition: phenological stages with per-stage base temperature
//! and TSum threshold, plus maturity and frost parameters.
//!
//! Documents are YAML by default, JSON when the file ends in `.json`.
//! Field aliases accept the lower-cased keys written by the older tooling
//! (`tsummaturity`, `basetemp`, `frosttreashold`).
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PhenoError, Result};

/// One phenological phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    #[serde(default)]
    pub name: String,
    /// TSum (°C·d) that must accumulate inside this stage before the next one starts.
    pub tsum: f64,
    /// Temperature (°C) below which the day contributes nothing.
    #[serde(alias = "basetemp")]
    pub base_temp: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Crop {
    pub name: String,
    /// Crop-level TSum (°C·d) at which the crop counts as mature.
    #[serde(alias = "tsummaturity")]
    pub tsum_maturity: f64,
    /// Ordered stages; the last stage never advances.
    pub stages: Vec<Stage>,
    /// Minimum temperature (°C) below which a day counts as a frost day.
    #[serde(alias = "frosttreashold", alias = "frostthreshold")]
    pub frost_threshold: f64,
}

impl Crop {
    /// Soybean parameters from the MONICA soybeanEU calibration.
    pub fn soybean_default() -> Self {
        Self {
            name: "soybean_0".to_string(),
            tsum_maturity: 2235.0,
            stages: vec![
                Stage { name: "germination".to_string(), tsum: 167.0, base_temp: 8.0 },
                Stage { name: "flowering".to_string(), tsum: 1048.0, base_temp: 6.0 },
                Stage { name: "maturity".to_string(), tsum: 1058.0, base_temp: 6.0 },
            ],
            frost_threshold: 5.0,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.stages.is_empty() {
            return Err(PhenoError::Config(format!("crop `{}` has no stages", self.name)));
        }
        if !(self.tsum_maturity >= 0.0) {
            return Err(PhenoError::Config(format!(
                "crop `{}`: tsum_maturity must be non-negative, got {}",
                self.name, self.tsum_maturity
            )));
        }
        for (i, stage) in self.stages.iter().enumerate() {
            if !(stage.tsum >= 0.0) {
                return Err(PhenoError::Config(format!(
                    "crop `{}`: stage {i} ({}) has negative tsum {}",
                    self.name, stage.name, stage.tsum
                )));
            }
        }
        Ok(())
    }

    /// Read and validate a crop document.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| PhenoError::io(path, e))?;
        let crop: Crop = if is_json(path) {
            serde_json::from_str(&text).map_err(|e| PhenoError::parse(path, e.line(), e.to_string()))?
        } else {
            serde_yaml::from_str(&text).map_err(|e| {
                let line = e.location().map(|l| l.line()).unwrap_or(0);
                PhenoError::parse(path, line, e.to_string())
            })?
        };
        crop.validate()?;
        Ok(crop)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let text = if is_json(path) {
            serde_json::to_string_pretty(self).map_err(|e| PhenoError::Config(e.to_string()))?
        } else {
            serde_yaml::to_string(self).map_err(|e| PhenoError::Config(e.to_string()))?
        };
        fs::write(path, text).map_err(|e| PhenoError::io(path, e))
    }
}

fn is_json(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn soybean_yaml_roundtrip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("soybean.yml");
        let crop = Crop::soybean_default();
        crop.save(&path).unwrap();
        let loaded = Crop::load(&path).unwrap();
        assert_eq!(loaded, crop);
        assert_eq!(loaded.stages[1].name, "flowering");
    }

    #[test]
    fn legacy_lowercase_keys_are_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("legacy.yml");
        let doc = "name: soybean_0\n\
                   tsummaturity: 2235\n\
                   stages:\n\
                   - name: germination\n  tsum: 167\n  basetemp: 8\n\
                   frosttreashold: 5\n";
        fs::write(&path, doc).unwrap();
        let crop = Crop::load(&path).unwrap();
        assert_eq!(crop.tsum_maturity, 2235.0);
        assert_eq!(crop.stages[0].base_temp, 8.0);
        assert_eq!(crop.frost_threshold, 5.0);
    }

    #[test]
    fn json_documents_are_detected_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crop.json");
        Crop::soybean_default().save(&path).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.trim_start().starts_with('{'));
        assert_eq!(Crop::load(&path).unwrap().name, "soybean_0");
    }

    #[test]
    fn validate_rejects_empty_and_negative() {
        let mut crop = Crop::soybean_default();
        crop.stages.clear();
        assert!(matches!(crop.validate(), Err(PhenoError::Config(_))));

        let mut crop = Crop::soybean_default();
        crop.stages[2].tsum = -1.0;
        assert!(crop.validate().is_err());

        let mut crop = Crop::soybean_default();
        crop.tsum_maturity = -5.0;
        assert!(crop.validate().is_err());
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = Crop::load("/nonexistent/crop.yml").unwrap_err();
        assert!(matches!(err, PhenoError::Io { .. }));
    }
}
