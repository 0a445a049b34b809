//! Wet-harvest heuristic: rainfall in the days around modelled maturity.
//!
//! Each reference cell keeps the last 15 days of precipitation. Ten days
//! after the harvest date the most recent 10 of those days are inspected;
//! the harvest counts as wet when at least 5 of them had rain and no two
//! consecutive days among them were completely dry.

/// Days of precipitation history kept per reference.
pub const RAIN_WINDOW_DAYS: usize = 15;
/// Evaluation happens this many days after the harvest DOY.
pub const HARVEST_OFFSET_DAYS: u32 = 10;
/// Chronological positions before this index are ignored by the rule.
const RECENT_FROM: usize = 5;
const MIN_WET_DAYS: usize = 5;

/// Fixed-capacity ring of daily values; the oldest entry is overwritten first.
#[derive(Debug, Clone)]
pub struct DayBuffer<const N: usize> {
    values: [f64; N],
    next: usize,
    len: usize,
}

impl<const N: usize> Default for DayBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> DayBuffer<N> {
    pub fn new() -> Self {
        Self { values: [0.0; N], next: 0, len: 0 }
    }

    pub fn push(&mut self, value: f64) {
        if N == 0 {
            return;
        }
        self.values[self.next] = value;
        self.next = (self.next + 1) % N;
        self.len = (self.len + 1).min(N);
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == N
    }

    pub fn clear(&mut self) {
        self.next = 0;
        self.len = 0;
    }

    /// Stored values, oldest first.
    pub fn chronological(&self) -> impl Iterator<Item = f64> + '_ {
        let start = if self.len < N { 0 } else { self.next };
        (0..self.len).map(move |i| self.values[(start + i) % N])
    }
}

/// Apply the wet-harvest rule to a chronological precipitation window.
///
/// Only positions `5..` take part. Adjacent dry pairs are looked for inside
/// that sub-window, so positions 4 and 5 never form a pair.
pub fn is_wet_harvest(window: &[f64]) -> bool {
    let recent = window.get(RECENT_FROM..).unwrap_or(&[]);
    let wet_days = recent.iter().filter(|&&p| p > 0.0).count();
    let dry_pair = recent.windows(2).any(|w| w[0] == 0.0 && w[1] == 0.0);
    wet_days >= MIN_WET_DAYS && !dry_pair
}

/// Per-reference wet-harvest state for the current year.
#[derive(Debug, Clone, Default)]
pub struct HarvestRainDetector {
    harvest_doy: Option<u32>,
    precip: DayBuffer<RAIN_WINDOW_DAYS>,
    /// Wet days found by this year's evaluation, if it has run.
    wet_days: Option<usize>,
}

impl HarvestRainDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn harvest_doy(&self) -> Option<u32> {
        self.harvest_doy
    }

    pub fn wet_days(&self) -> Option<usize> {
        self.wet_days
    }

    /// Record the harvest date unless one is already set this year.
    /// Returns whether the date was taken.
    pub fn set_harvest(&mut self, doy: u32) -> bool {
        if self.harvest_doy.is_some() {
            return false;
        }
        self.harvest_doy = Some(doy);
        true
    }

    pub fn add_day(&mut self, precip: f64) {
        self.precip.push(precip);
    }

    /// Evaluate the rule if `doy` is exactly the evaluation day for this
    /// year's harvest date. Returns the risk flag when it fires.
    pub fn evaluate(&mut self, doy: u32) -> Option<bool> {
        let harvest = self.harvest_doy.filter(|&h| h > 0)?;
        if doy != harvest + HARVEST_OFFSET_DAYS {
            return None;
        }
        let window: Vec<f64> = self.precip.chronological().collect();
        self.wet_days = Some(window.iter().skip(RECENT_FROM).filter(|&&p| p > 0.0).count());
        Some(is_wet_harvest(&window))
    }

    /// Feed one day's precipitation and evaluate.
    pub fn observe(&mut self, doy: u32, precip: f64) -> Option<bool> {
        self.add_day(precip);
        self.evaluate(doy)
    }

    /// Forget this year's harvest date and result. Precipitation history is
    /// kept so the window stays continuous across the calendar boundary.
    pub fn reset_year(&mut self) {
        self.harvest_doy = None;
        self.wet_days = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_partial_fill_is_chronological() {
        let mut buf = DayBuffer::<4>::new();
        buf.push(1.0);
        buf.push(2.0);
        assert_eq!(buf.len(), 2);
        assert!(!buf.is_full());
        assert_eq!(buf.chronological().collect::<Vec<_>>(), vec![1.0, 2.0]);
    }

    #[test]
    fn buffer_wraps_oldest_first() {
        let mut buf = DayBuffer::<3>::new();
        for v in 1..=5 {
            buf.push(v as f64);
        }
        assert!(buf.is_full());
        assert_eq!(buf.chronological().collect::<Vec<_>>(), vec![3.0, 4.0, 5.0]);
        buf.clear();
        assert!(buf.is_empty());
    }

    #[test]
    fn rule_needs_five_wet_days_in_recent_ten() {
        // Positions 0..5 are ignored even when wet.
        let mut window = vec![9.0; 5];
        window.extend([1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0]);
        assert!(is_wet_harvest(&window));

        let mut window = vec![9.0; 5];
        window.extend([1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 0.0, 0.0]);
        assert!(!is_wet_harvest(&window), "four wet days and a dry pair");
    }

    #[test]
    fn rule_rejects_adjacent_dry_days() {
        let mut window = vec![0.0; 5];
        window.extend([1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 0.0, 0.0, 1.0, 1.0]);
        assert!(!is_wet_harvest(&window));
    }

    #[test]
    fn rule_ignores_pair_across_position_four_and_five() {
        let mut window = vec![1.0, 1.0, 1.0, 1.0, 0.0];
        window.extend([0.0, 1.0, 1.0, 1.0, 1.0, 1.0, 0.0, 1.0, 1.0, 1.0]);
        assert!(is_wet_harvest(&window));
    }

    #[test]
    fn short_window_uses_what_is_there() {
        assert!(!is_wet_harvest(&[1.0; 4]));
        assert!(is_wet_harvest(&[1.0; 10]));
    }

    #[test]
    fn detector_fires_once_at_harvest_plus_ten() {
        let mut det = HarvestRainDetector::new();
        assert!(det.set_harvest(200));
        assert!(!det.set_harvest(205), "harvest date is never overwritten");
        assert_eq!(det.harvest_doy(), Some(200));

        let mut fired = Vec::new();
        for doy in 195..=215 {
            if let Some(flag) = det.observe(doy, 2.0) {
                fired.push((doy, flag));
            }
        }
        assert_eq!(fired, vec![(210, true)]);
        assert_eq!(det.wet_days(), Some(10));
    }

    #[test]
    fn detector_without_harvest_never_fires() {
        let mut det = HarvestRainDetector::new();
        for doy in 1..=365 {
            assert!(det.observe(doy, 5.0).is_none());
        }
    }

    #[test]
    fn reset_year_clears_harvest_but_keeps_history() {
        let mut det = HarvestRainDetector::new();
        for _ in 0..RAIN_WINDOW_DAYS {
            det.add_day(1.0);
        }
        det.set_harvest(100);
        det.reset_year();
        assert_eq!(det.harvest_doy(), None);
        det.set_harvest(3);
        assert_eq!(det.evaluate(13), Some(true));
    }
}
