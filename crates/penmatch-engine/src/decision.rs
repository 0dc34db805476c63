use std::sync::LazyLock;

use penmatch_contracts::Decision;
use regex::Regex;

static UNKNOWN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bunknown\b").expect("valid unknown pattern"));
static YES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\byes\b").expect("valid yes pattern"));
static NO_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bno\b").expect("valid no pattern"));

/// Label read out of a model's decision reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecisionLabel {
    Yes,
    No,
    Both,
    Unknown,
}

impl DecisionLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            DecisionLabel::Yes => "Yes",
            DecisionLabel::No => "No",
            DecisionLabel::Both => "Both",
            DecisionLabel::Unknown => "Unknown",
        }
    }

    /// The storable decision, or `None` for `Unknown`.
    pub fn into_decision(self) -> Option<Decision> {
        match self {
            DecisionLabel::Yes => Some(Decision::Yes),
            DecisionLabel::No => Some(Decision::No),
            DecisionLabel::Both => Some(Decision::Both),
            DecisionLabel::Unknown => None,
        }
    }
}

impl std::fmt::Display for DecisionLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifies free text by whole-word, case-insensitive matches.
///
/// `unknown` anywhere wins outright. Otherwise a lone `yes` or `no` gives that
/// label, both give `Both`, and neither gives `Unknown`.
pub fn extract_decision(text: &str) -> DecisionLabel {
    if UNKNOWN_RE.is_match(text) {
        return DecisionLabel::Unknown;
    }
    match (YES_RE.is_match(text), NO_RE.is_match(text)) {
        (true, false) => DecisionLabel::Yes,
        (false, true) => DecisionLabel::No,
        (true, true) => DecisionLabel::Both,
        (false, false) => DecisionLabel::Unknown,
    }
}
