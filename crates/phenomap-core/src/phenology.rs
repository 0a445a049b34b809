//! Daily TSum accumulation, stage advancement, harvest date and frost days.
//!
//! One [`PhenologyEngine`] processes one weather series for every reference
//! cell mapped to it. Each record is applied to each cell in this order:
//! rain detector, growing-window check, TSum and stage, harvest date, frost.
use tracing::{debug, warn};

use crate::aggregate::YearResult;
use crate::batch::CancelToken;
use crate::config::{ParsePolicy, RunConfig};
use crate::crop::Crop;
use crate::error::{PhenoError, Result};
use crate::rain::HarvestRainDetector;
use crate::weather::WeatherRecord;
use crate::windows::TimeWindows;

/// Development stage of one reference cell within the current year.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StageState {
    pub stage_index: usize,
    /// TSum gathered since entering `stage_index`.
    pub tsum_in_stage: f64,
}

impl StageState {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Thermal time of one day against the active stage's base temperature.
/// Never negative.
pub fn daily_tsum(state: &StageState, crop: &Crop, tavg: f64) -> f64 {
    let base = crop.stages[state.stage_index].base_temp;
    (tavg - base).max(0.0)
}

/// Add `daily` to the stage accumulator and move on once the stage
/// threshold is met. The last stage keeps accumulating without advancing.
pub fn advance_stage(state: &mut StageState, crop: &Crop, daily: f64) {
    state.tsum_in_stage += daily;
    if state.stage_index + 1 >= crop.stages.len() {
        return;
    }
    if state.tsum_in_stage >= crop.stages[state.stage_index].tsum {
        state.stage_index += 1;
        state.tsum_in_stage = 0.0;
    }
}

/// Everything tracked for one reference cell over a run.
#[derive(Debug, Clone)]
pub struct ReferenceCell {
    pub ref_id: u32,
    pub stage: StageState,
    pub rain: HarvestRainDetector,
    /// One slot per year of the run.
    pub years: Vec<YearResult>,
}

impl ReferenceCell {
    pub fn new(ref_id: u32, n_years: usize) -> Self {
        Self {
            ref_id,
            stage: StageState::default(),
            rain: HarvestRainDetector::new(),
            years: vec![YearResult::default(); n_years],
        }
    }

    fn reset_year(&mut self) {
        self.stage.reset();
        self.rain.reset_year();
    }

    fn process_day(&mut self, crop: &Crop, windows: &TimeWindows, year_idx: usize, rec: &WeatherRecord) {
        let doy = rec.doy();
        // Harvest evaluation may fall after the window end.
        if self.rain.observe(doy, rec.precip) == Some(true) {
            self.years[year_idx].wet_harvest = true;
        }
        let in_window = windows.get(rec.year(), self.ref_id).is_some_and(|w| w.contains(doy));
        if !in_window {
            return;
        }
        let daily = daily_tsum(&self.stage, crop, rec.tavg);
        advance_stage(&mut self.stage, crop, daily);
        let year = &mut self.years[year_idx];
        year.tsum += daily;
        if year.tsum >= crop.tsum_maturity {
            self.rain.set_harvest(doy);
        }
        if rec.tmin < crop.frost_threshold && year.tsum > 0.0 && year.tsum < crop.tsum_maturity {
            year.frost_days += 1;
        }
    }
}

/// What [`PhenologyEngine::process_record`] did with a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Processed,
    /// Before the first year of the run.
    Skipped,
    /// Past the last year; the series is complete.
    Done,
}

/// Record counts of one [`PhenologyEngine::run`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub processed: usize,
    pub skipped_years: usize,
    pub bad_records: usize,
}

/// Engine for one weather series and the reference cells that share it.
pub struct PhenologyEngine<'a> {
    crop: &'a Crop,
    config: &'a RunConfig,
    windows: &'a TimeWindows,
    cells: Vec<ReferenceCell>,
    current_year: Option<i32>,
}

impl<'a> PhenologyEngine<'a> {
    /// The crop must validate and every refId must have a window slot
    /// (`1..=windows.n_refs()`).
    pub fn new(crop: &'a Crop, config: &'a RunConfig, ref_ids: &[u32], windows: &'a TimeWindows) -> Result<Self> {
        crop.validate()?;
        let n_years = config.num_years();
        let mut cells = Vec::with_capacity(ref_ids.len());
        for &ref_id in ref_ids {
            if ref_id == 0 || ref_id as usize > windows.n_refs() {
                return Err(PhenoError::DataIntegrity(format!(
                    "refId {ref_id} outside 1..={}",
                    windows.n_refs()
                )));
            }
            cells.push(ReferenceCell::new(ref_id, n_years));
        }
        Ok(Self { crop, config, windows, cells, current_year: None })
    }

    pub fn cells(&self) -> &[ReferenceCell] {
        &self.cells
    }

    pub fn current_year(&self) -> Option<i32> {
        self.current_year
    }

    /// Apply one day to every cell. Records must arrive in date order; a
    /// year earlier than the current one is a data-integrity error.
    pub fn process_record(&mut self, rec: &WeatherRecord) -> Result<Step> {
        let year = rec.year();
        if let Some(current) = self.current_year.filter(|&c| year < c) {
            return Err(PhenoError::DataIntegrity(format!(
                "weather record {} after year {current}: input is not sorted",
                rec.date
            )));
        }
        if year > self.config.end_year {
            return Ok(Step::Done);
        }
        let Some(year_idx) = self.config.year_index(year) else {
            return Ok(Step::Skipped);
        };
        if self.current_year != Some(year) {
            self.current_year = Some(year);
            for cell in &mut self.cells {
                cell.reset_year();
            }
        }
        for cell in &mut self.cells {
            cell.process_day(self.crop, self.windows, year_idx, rec);
        }
        Ok(Step::Processed)
    }

    /// Drain `records` until the series ends or passes the last year.
    /// `cancel` is polled before each record.
    pub fn run<I>(&mut self, records: I, cancel: &CancelToken) -> Result<RunStats>
    where
        I: IntoIterator<Item = Result<WeatherRecord>>,
    {
        let mut stats = RunStats::default();
        for rec in records {
            if cancel.is_cancelled() {
                return Err(PhenoError::Cancelled);
            }
            let rec = match rec {
                Ok(rec) => rec,
                Err(err @ PhenoError::Parse { .. }) if self.config.parse_policy == ParsePolicy::SkipRecord => {
                    warn!(%err, "skipping weather record");
                    stats.bad_records += 1;
                    continue;
                }
                Err(err) => return Err(err),
            };
            match self.process_record(&rec)? {
                Step::Processed => stats.processed += 1,
                Step::Skipped => stats.skipped_years += 1,
                Step::Done => break,
            }
        }
        debug!(
            cells = self.cells.len(),
            processed = stats.processed,
            bad = stats.bad_records,
            "weather series done"
        );
        Ok(stats)
    }

    /// Per-cell year results, in construction order.
    pub fn finish(self) -> Vec<(u32, Vec<YearResult>)> {
        self.cells.into_iter().map(|c| (c.ref_id, c.years)).collect()
    }
}
