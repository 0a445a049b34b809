//! Run the phenology engine over every weather group of a reference set.
//!
//! Groups are independent: each owns its engine and writes only the slots
//! of its own refIds. With the `threading` feature they are spread over a
//! rayon pool of `RunConfig::workers` threads.
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info};

use crate::aggregate::{summarize, SummaryResult, YearResult};
use crate::config::{expand_template, RunConfig};
use crate::crop::Crop;
use crate::error::{PhenoError, Result};
use crate::phenology::PhenologyEngine;
use crate::reference::{ReferenceMap, WeatherGroup};
use crate::weather::{open_weather, WeatherRecord};
use crate::windows::TimeWindows;

/// Shared stop flag, polled between weather records.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

pub type RecordIter<'a> = Box<dyn Iterator<Item = Result<WeatherRecord>> + 'a>;

/// Provides the daily records of one weather series by its code.
pub trait WeatherSource: Sync {
    fn open(&self, code: &str) -> Result<RecordIter<'_>>;
}

/// Weather series on disk; `template` holds one `{}` or `%s` placeholder
/// for the series code. A missing file is an error.
#[derive(Debug, Clone)]
pub struct FileWeatherSource {
    pub template: String,
}

impl FileWeatherSource {
    pub fn new(template: impl Into<String>) -> Self {
        Self { template: template.into() }
    }

    pub fn path_for(&self, code: &str) -> PathBuf {
        PathBuf::from(expand_template(&self.template, &[code]))
    }
}

impl WeatherSource for FileWeatherSource {
    fn open(&self, code: &str) -> Result<RecordIter<'_>> {
        Ok(Box::new(open_weather(&self.path_for(code))?))
    }
}

/// Year series and summary of one reference.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceOutcome {
    pub ref_id: u32,
    /// Weather series code the reference was computed from.
    pub code: String,
    pub years: Vec<YearResult>,
    pub summary: SummaryResult,
}

fn run_group<S: WeatherSource>(
    crop: &Crop,
    config: &RunConfig,
    windows: &TimeWindows,
    source: &S,
    group: &WeatherGroup,
    cancel: &CancelToken,
) -> Result<Vec<ReferenceOutcome>> {
    let mut engine = PhenologyEngine::new(crop, config, &group.ref_ids, windows)?;
    let stats = engine.run(source.open(&group.code)?, cancel)?;
    debug!(code = %group.code, refs = group.ref_ids.len(), days = stats.processed, "group done");
    Ok(engine
        .finish()
        .into_iter()
        .map(|(ref_id, mut years)| {
            let summary = summarize(&mut years, crop.tsum_maturity);
            ReferenceOutcome { ref_id, code: group.code.clone(), years, summary }
        })
        .collect())
}

/// Compute every reference in `refs`; the result is ordered by refId.
///
/// refIds must be dense (`1..=refs.len()`) and `windows` must cover the
/// same set. The first failing group aborts the run.
pub fn run_batch<S: WeatherSource>(
    crop: &Crop,
    config: &RunConfig,
    refs: &ReferenceMap,
    windows: &TimeWindows,
    source: &S,
    cancel: &CancelToken,
) -> Result<Vec<ReferenceOutcome>> {
    crop.validate()?;
    config.validate()?;
    refs.validate_dense()?;
    if windows.n_refs() != refs.len() {
        return Err(PhenoError::DataIntegrity(format!(
            "{} references but windows for {}",
            refs.len(),
            windows.n_refs()
        )));
    }
    let groups = refs.groups();
    info!(
        crop = %crop.name,
        refs = refs.len(),
        groups = groups.len(),
        years = config.num_years(),
        "starting batch"
    );

    let task = |group: &WeatherGroup| run_group(crop, config, windows, source, group, cancel);

    #[cfg(feature = "threading")]
    let per_group: Vec<Vec<ReferenceOutcome>> = {
        use rayon::prelude::*;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.workers)
            .build()
            .map_err(|e| PhenoError::Config(format!("cannot start worker pool: {e}")))?;
        pool.install(|| groups.par_iter().map(task).collect::<Result<_>>())?
    };
    #[cfg(not(feature = "threading"))]
    let per_group: Vec<Vec<ReferenceOutcome>> = groups.iter().map(task).collect::<Result<_>>()?;

    let mut slots: Vec<Option<ReferenceOutcome>> = vec![None; refs.len()];
    for outcome in per_group.into_iter().flatten() {
        let idx = outcome.ref_id as usize - 1;
        slots[idx] = Some(outcome);
    }
    let outcomes = slots
        .into_iter()
        .enumerate()
        .map(|(i, slot)| slot.ok_or_else(|| PhenoError::DataIntegrity(format!("refId {} was not computed", i + 1))))
        .collect::<Result<Vec<_>>>()?;
    info!(refs = outcomes.len(), "batch finished");
    Ok(outcomes)
}
