use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::{bail, Context, Result};
use indexmap::IndexMap;
use serde_json::Value;

use crate::records::PairRecord;

/// Column carrying a row's source position in files written by
/// [`Dataset::write_jsonl`].
pub const INDEX_COLUMN: &str = "index";

/// Ordered collection of pair records keyed by their source row index.
///
/// Subsets produced by [`Dataset::head_tail`] keep the indices of the rows
/// they were taken from, so results merge back onto the right rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    rows: IndexMap<usize, PairRecord>,
}

impl Dataset {
    pub fn from_records(records: Vec<PairRecord>) -> Self {
        Self {
            rows: records.into_iter().enumerate().collect(),
        }
    }

    /// Loads a JSON Lines file, one record per line. Blank lines are skipped.
    /// A line with an `index` column keeps that index; otherwise the row's
    /// position among the non-blank lines is used. A non-integer `index` or
    /// two rows resolving to the same index is an error.
    pub fn load_jsonl(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed reading dataset {}", path.display()))?;
        let mut rows = IndexMap::new();
        for (position, line) in raw
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .enumerate()
        {
            let mut value: Value = serde_json::from_str(line).with_context(|| {
                format!("invalid JSON on dataset row {position} ({})", path.display())
            })?;
            let index = match value.as_object_mut().and_then(|row| row.remove(INDEX_COLUMN)) {
                None => position,
                Some(raw_index) => match raw_index.as_u64() {
                    Some(index) => index as usize,
                    None => bail!(
                        "dataset row {position} has a non-integer {INDEX_COLUMN} {raw_index} ({})",
                        path.display()
                    ),
                },
            };
            let record: PairRecord = serde_json::from_value(value).with_context(|| {
                format!("dataset row {position} is not a pair record ({})", path.display())
            })?;
            if rows.contains_key(&index) {
                bail!(
                    "dataset row {position} repeats index {index} ({})",
                    path.display()
                );
            }
            rows.insert(index, record);
        }
        Ok(Self { rows })
    }

    /// Writes one compact JSON object per row, each tagged with its index.
    pub fn write_jsonl(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = fs::File::create(path)
            .with_context(|| format!("failed creating {}", path.display()))?;
        for (index, record) in &self.rows {
            let mut row = match serde_json::to_value(record)? {
                Value::Object(row) => row,
                _ => bail!("pair record {index} did not serialize to an object"),
            };
            row.insert(INDEX_COLUMN.to_string(), Value::Number((*index).into()));
            file.write_all(serde_json::to_string(&row)?.as_bytes())?;
            file.write_all(b"\n")?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&PairRecord> {
        self.rows.get(&index)
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &PairRecord)> {
        self.rows.iter().map(|(index, record)| (*index, record))
    }

    pub fn indices(&self) -> Vec<usize> {
        self.rows.keys().copied().collect()
    }

    /// First `n` rows followed by the last `n` rows. Rows are never repeated
    /// when the two ends overlap.
    pub fn head_tail(&self, n: usize) -> Self {
        let total = self.rows.len();
        let tail_start = total.saturating_sub(n).max(n.min(total));
        let rows = self
            .rows
            .iter()
            .enumerate()
            .filter(|(position, _)| *position < n || *position >= tail_start)
            .map(|(_, (index, record))| (*index, record.clone()))
            .collect();
        Self { rows }
    }

    /// Overwrites each row named in `results` with the updated record and
    /// returns how many rows were written. Rows absent from `results` are
    /// left as they are.
    pub fn merge(&mut self, results: &BTreeMap<usize, PairRecord>) -> usize {
        for (index, record) in results {
            self.rows.insert(*index, record.clone());
        }
        results.len()
    }
}
