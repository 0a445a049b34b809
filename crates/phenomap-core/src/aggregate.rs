//! Collapse per-year results of one reference into summary statistics.
use serde::{Deserialize, Serialize};

/// Outcome of one reference cell in one calendar year.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct YearResult {
    /// TSum accumulated inside the growing window.
    pub tsum: f64,
    pub frost_days: u32,
    /// Set by [`summarize`]: `tsum >= tsum_maturity`.
    pub tsum_reached: bool,
    pub wet_harvest: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryResult {
    /// Mean TSum over every year of the range, matured or not.
    pub tsum_avg: f64,
    pub tsum_reached_count: u32,
    /// Years with at least one frost day.
    pub frost_occurrence_count: u32,
    pub wet_harvest_count: u32,
}

/// Mark `tsum_reached` on each year and derive the summary.
/// An empty year slice yields a zeroed summary.
pub fn summarize(years: &mut [YearResult], tsum_maturity: f64) -> SummaryResult {
    let mut summary = SummaryResult::default();
    if years.is_empty() {
        return summary;
    }
    for year in years.iter_mut() {
        year.tsum_reached = year.tsum >= tsum_maturity;
        summary.tsum_avg += year.tsum;
        if year.frost_days > 0 {
            summary.frost_occurrence_count += 1;
        }
        if year.tsum_reached {
            summary.tsum_reached_count += 1;
        }
        if year.wet_harvest {
            summary.wet_harvest_count += 1;
        }
    }
    summary.tsum_avg /= years.len() as f64;
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn year(tsum: f64, frost_days: u32, wet_harvest: bool) -> YearResult {
        YearResult { tsum, frost_days, tsum_reached: false, wet_harvest }
    }

    #[test]
    fn average_is_unconditional_over_all_years() {
        let mut years = vec![year(100.0, 0, false), year(400.0, 2, true), year(250.0, 0, false)];
        let s = summarize(&mut years, 300.0);
        assert_relative_eq!(s.tsum_avg, 250.0);
        assert_eq!(s.tsum_reached_count, 1);
        assert_eq!(s.frost_occurrence_count, 1);
        assert_eq!(s.wet_harvest_count, 1);
        assert_eq!(
            years.iter().map(|y| y.tsum_reached).collect::<Vec<_>>(),
            vec![false, true, false]
        );
    }

    #[test]
    fn reaching_maturity_exactly_counts() {
        let mut years = vec![year(300.0, 0, false)];
        assert_eq!(summarize(&mut years, 300.0).tsum_reached_count, 1);
    }

    #[test]
    fn empty_series_is_zeroed() {
        assert_eq!(summarize(&mut [], 10.0), SummaryResult::default());
    }
}
