use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::records::PairRecord;

/// File name for one completed record: `{index}_{sample1}_{sample2}.json`.
/// Path separators inside the identifiers are replaced so the file always
/// lands directly in the output directory.
pub fn record_file_name(index: usize, record: &PairRecord) -> String {
    format!(
        "{index}_{}_{}.json",
        flatten_identifier(&record.sample1),
        flatten_identifier(&record.sample2)
    )
}

/// Writes `record` as pretty JSON into `directory`, creating it if needed.
pub fn write_record_file(directory: &Path, index: usize, record: &PairRecord) -> Result<PathBuf> {
    fs::create_dir_all(directory)
        .with_context(|| format!("failed creating {}", directory.display()))?;
    let path = directory.join(record_file_name(index, record));
    fs::write(&path, serde_json::to_string_pretty(record)?)
        .with_context(|| format!("failed writing {}", path.display()))?;
    Ok(path)
}

fn flatten_identifier(identifier: &str) -> String {
    identifier
        .chars()
        .map(|ch| if matches!(ch, '/' | '\\') { '_' } else { ch })
        .collect()
}
