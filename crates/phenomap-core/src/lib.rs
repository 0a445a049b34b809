//! Crop phenology under climate scenarios.
//!
//! Two engines live here: a per-reference TSum/frost/wet-harvest state
//! machine driven by daily weather ([`phenology`], [`rain`], [`aggregate`],
//! orchestrated by [`batch`]), and a NoData-aware combiner for scenario
//! rasters ([`raster`]). File formats sit in [`io`].

pub mod aggregate;
pub mod batch;
pub mod config;
pub mod crop;
pub mod error;
pub mod io;
pub mod phenology;
pub mod rain;
pub mod raster;
pub mod reference;
pub mod weather;
pub mod windows;

pub use aggregate::{summarize, SummaryResult, YearResult};
pub use batch::{run_batch, CancelToken, FileWeatherSource, ReferenceOutcome, WeatherSource};
pub use config::{CombineConfig, ParsePolicy, RunConfig};
pub use crop::{Crop, Stage};
pub use error::{PhenoError, Result};
pub use phenology::PhenologyEngine;
pub use raster::{CombineMode, Grid, GridMeta};
pub use reference::ReferenceMap;
pub use weather::WeatherRecord;
pub use windows::{TimeWindow, TimeWindows, WindowBound};
