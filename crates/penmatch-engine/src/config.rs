use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::images::DEFAULT_MAX_IMAGE_DIM;
use crate::model::{DEFAULT_API_BASE, DEFAULT_MODEL};

pub const DEFAULT_PACING_MS: u64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    #[default]
    Concurrent,
    Sequential,
}

/// What to do with a pair whose decision reply is indeterminate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownPolicy {
    /// Drop the pair; its source row stays as it was.
    #[default]
    Discard,
    /// Store the explanation and clear the decision.
    KeepExplanation,
}

/// Run settings. The API credential is deliberately not part of this struct;
/// it is handed straight to the model client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub api_base: String,
    pub model: String,
    pub temperature: Option<f64>,
    pub max_image_dim: u32,
    pub pacing_ms: u64,
    /// Worker threads in concurrent mode; 0 means one per CPU.
    pub workers: usize,
    pub mode: ExecutionMode,
    pub unknown_policy: UnknownPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: None,
            max_image_dim: DEFAULT_MAX_IMAGE_DIM,
            pacing_ms: DEFAULT_PACING_MS,
            workers: 0,
            mode: ExecutionMode::default(),
            unknown_policy: UnknownPolicy::default(),
        }
    }
}

impl EngineConfig {
    /// Reads a JSON config file. Missing keys keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed reading config {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("invalid config file {}", path.display()))
    }
}
