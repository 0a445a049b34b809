//! refId → weather-series code mapping.
use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;

use crate::error::{PhenoError, Result};
use crate::io::compress::open_text;

/// References sharing one weather series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeatherGroup {
    pub code: String,
    pub ref_ids: Vec<u32>,
}

/// Rows of a `refId,weatherCode` file in file order.
#[derive(Debug, Clone, Default)]
pub struct ReferenceMap {
    entries: Vec<(u32, String)>,
}

impl ReferenceMap {
    pub fn new(entries: Vec<(u32, String)>) -> Self {
        Self { entries }
    }

    /// Read a CSV with one header line; blank lines are skipped.
    pub fn read(path: &Path) -> Result<Self> {
        Self::parse(open_text(path)?, path)
    }

    pub fn parse<R: BufRead>(reader: R, path: &Path) -> Result<Self> {
        let mut entries = Vec::new();
        for (i, line) in reader.lines().enumerate().skip(1) {
            let line = line.map_err(|e| PhenoError::io(path, e))?;
            let line_no = i + 1;
            if line.trim().is_empty() {
                continue;
            }
            let mut fields = line.split(',').map(str::trim);
            let (Some(ref_id), Some(code)) = (fields.next(), fields.next()) else {
                return Err(PhenoError::parse(path, line_no, "expected refId,weatherCode"));
            };
            let ref_id: u32 = ref_id
                .parse()
                .map_err(|e| PhenoError::parse(path, line_no, format!("bad refId `{ref_id}`: {e}")))?;
            entries.push((ref_id, code.to_string()));
        }
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Weather code of `ref_id`, assuming a dense map (see [`Self::validate_dense`]).
    pub fn code(&self, ref_id: u32) -> Option<&str> {
        let idx = (ref_id as usize).checked_sub(1)?;
        self.entries
            .get(idx)
            .filter(|(id, _)| *id == ref_id)
            .or_else(|| self.entries.iter().find(|(id, _)| *id == ref_id))
            .map(|(_, code)| code.as_str())
    }

    /// Ensure the refIds are exactly `1..=len`, each once.
    pub fn validate_dense(&self) -> Result<()> {
        let n = self.entries.len();
        let mut seen = vec![false; n];
        for &(ref_id, _) in &self.entries {
            let idx = (ref_id as usize)
                .checked_sub(1)
                .filter(|&i| i < n)
                .ok_or_else(|| PhenoError::DataIntegrity(format!("refId {ref_id} outside 1..={n}")))?;
            if std::mem::replace(&mut seen[idx], true) {
                return Err(PhenoError::DataIntegrity(format!("refId {ref_id} listed twice")));
            }
        }
        Ok(())
    }

    /// Group references by weather code, groups and members in first-seen order.
    pub fn groups(&self) -> Vec<WeatherGroup> {
        let mut index: HashMap<&str, usize> = HashMap::new();
        let mut groups: Vec<WeatherGroup> = Vec::new();
        for (ref_id, code) in &self.entries {
            let slot = *index.entry(code.as_str()).or_insert_with(|| {
                groups.push(WeatherGroup { code: code.clone(), ref_ids: Vec::new() });
                groups.len() - 1
            });
            groups[slot].ref_ids.push(*ref_id);
        }
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn map(text: &str) -> ReferenceMap {
        ReferenceMap::parse(Cursor::new(text), Path::new("ref.csv")).unwrap()
    }

    #[test]
    fn groups_keep_first_seen_order() {
        let m = map("refId,gridCode\n1,b\n2,a\n3,b\n\n4,c\n");
        assert_eq!(m.len(), 4);
        let groups = m.groups();
        assert_eq!(
            groups,
            vec![
                WeatherGroup { code: "b".into(), ref_ids: vec![1, 3] },
                WeatherGroup { code: "a".into(), ref_ids: vec![2] },
                WeatherGroup { code: "c".into(), ref_ids: vec![4] },
            ]
        );
        assert_eq!(m.code(3), Some("b"));
        assert_eq!(m.code(9), None);
        m.validate_dense().unwrap();
    }

    #[test]
    fn gaps_and_duplicates_fail_density() {
        assert!(matches!(map("h\n1,a\n3,a\n").validate_dense(), Err(PhenoError::DataIntegrity(_))));
        assert!(matches!(map("h\n1,a\n1,b\n").validate_dense(), Err(PhenoError::DataIntegrity(_))));
        assert!(matches!(map("h\n0,a\n").validate_dense(), Err(PhenoError::DataIntegrity(_))));
    }

    #[test]
    fn bad_ref_id_is_parse_error() {
        let err = ReferenceMap::parse(Cursor::new("h\nx,a\n"), Path::new("r.csv")).unwrap_err();
        assert!(matches!(err, PhenoError::Parse { line: 2, .. }));
    }
}
