//! Merge grid metadata across scenario composites so companion maps share
//! one colour scale.
use super::GridMeta;

/// Historical plus the two projection scenarios, geometry from `historical`.
/// Metadata without any valid cell (min/max still at the sentinel) does not
/// contribute to the range.
pub fn combine_scenario_meta(historical: &GridMeta, scenario_a: &GridMeta, scenario_b: &GridMeta) -> GridMeta {
    merge_ranges(historical, [historical, scenario_a, scenario_b])
}

fn merge_ranges<'a>(base: &GridMeta, metas: impl IntoIterator<Item = &'a GridMeta>) -> GridMeta {
    let mut out = base.clone();
    out.min = out.no_data;
    out.max = out.no_data;
    for meta in metas.into_iter().filter(|m| m.has_range()) {
        out.observe(meta.min);
        out.observe(meta.max);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(min: f64, max: f64) -> GridMeta {
        GridMeta { min, max, ..GridMeta::new(4, 5, -9999.0) }
    }

    #[test]
    fn global_range_across_scenarios() {
        let mut hist = meta(3.0, 10.0);
        hist.cell_size = 0.5;
        let out = combine_scenario_meta(&hist, &meta(1.0, 8.0), &meta(4.0, 12.0));
        assert_eq!(out.min, 1.0);
        assert_eq!(out.max, 12.0);
        assert_eq!(out.cell_size, 0.5);
        assert_eq!(out.dims(), (4, 5));
    }

    #[test]
    fn empty_scenario_does_not_leak_sentinel() {
        let out = combine_scenario_meta(&meta(3.0, 10.0), &meta(-9999.0, -9999.0), &meta(2.0, 4.0));
        assert_eq!(out.min, 2.0);
        assert_eq!(out.max, 10.0);
    }
}
