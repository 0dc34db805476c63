use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Storable outcome of a pair comparison.
///
/// There is deliberately no `Unknown` variant: an indeterminate answer is a
/// rejection and never lands in a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Decision {
    Yes,
    No,
    Both,
}

impl Decision {
    pub fn as_str(self) -> &'static str {
        match self {
            Decision::Yes => "Yes",
            Decision::No => "No",
            Decision::Both => "Both",
        }
    }

    /// Parses a stored label. Anything outside the storable set, including
    /// `Unknown`, yields `None`.
    pub fn from_label(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "yes" => Some(Decision::Yes),
            "no" => Some(Decision::No),
            "both" => Some(Decision::Both),
            _ => None,
        }
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One dataset row: two handwriting sample identifiers plus the fields the
/// evaluation fills in. Columns this crate does not know about are kept in
/// `extra` and written back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairRecord {
    pub sample1: String,
    pub sample2: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(
        default,
        deserialize_with = "decision_from_label",
        skip_serializing_if = "Option::is_none"
    )]
    pub decision: Option<Decision>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PairRecord {
    pub fn new(sample1: impl Into<String>, sample2: impl Into<String>) -> Self {
        Self {
            sample1: sample1.into(),
            sample2: sample2.into(),
            explanation: None,
            decision: None,
            extra: Map::new(),
        }
    }
}

fn decision_from_label<'de, D>(deserializer: D) -> Result<Option<Decision>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(Decision::from_label))
}
