use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context, Result};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::records::Decision;

/// Why a pair produced no storable decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    Indeterminate,
    Failed,
}

/// One entry of a run's event log, tagged by `type` on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunEvent {
    RunStarted {
        pairs: usize,
        mode: String,
        model: String,
        provider: String,
    },
    PairAccepted {
        index: usize,
        decision: Decision,
    },
    PairRejected {
        index: usize,
        reason: RejectReason,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        stage: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    RunFinished {
        pairs: usize,
        accepted: usize,
        indeterminate: usize,
        failed: usize,
    },
}

/// A [`RunEvent`] as written: stamped with the run id and a UTC timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventLine {
    pub run_id: String,
    pub ts: String,
    #[serde(flatten)]
    pub event: RunEvent,
}

/// Append-only `events.jsonl` for one run.
///
/// The file is opened once; clones share the handle behind a mutex so
/// workers can log their own pairs and every line lands whole.
#[derive(Debug, Clone)]
pub struct EventWriter {
    path: PathBuf,
    run_id: Arc<str>,
    file: Arc<Mutex<File>>,
}

impl EventWriter {
    pub fn create(path: impl Into<PathBuf>, run_id: impl Into<String>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed creating {}", parent.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("failed opening event log {}", path.display()))?;
        let run_id: String = run_id.into();
        Ok(Self {
            path,
            run_id: Arc::from(run_id),
            file: Arc::new(Mutex::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn emit(&self, event: RunEvent) -> Result<EventLine> {
        let line = EventLine {
            run_id: self.run_id.to_string(),
            ts: now_utc_iso(),
            event,
        };
        let mut text = serde_json::to_string(&line)?;
        text.push('\n');
        let mut file = self
            .file
            .lock()
            .map_err(|_| anyhow!("event log {} lock poisoned", self.path.display()))?;
        file.write_all(text.as_bytes())?;
        Ok(line)
    }
}

/// Reads back every line of an event log.
pub fn read_events(path: &Path) -> Result<Vec<EventLine>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed reading event log {}", path.display()))?;
    raw.lines()
        .filter(|line| !line.trim().is_empty())
        .enumerate()
        .map(|(position, line)| {
            serde_json::from_str(line).with_context(|| {
                format!("invalid event on line {position} ({})", path.display())
            })
        })
        .collect()
}

pub(crate) fn now_utc_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false)
}
