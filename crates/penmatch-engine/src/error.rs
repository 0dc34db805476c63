use std::fmt;

/// Which of the two model calls a pair was on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Explanation,
    Decision,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Explanation => "explanation",
            Stage::Decision => "decision",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a pair was abandoned before reaching a decision.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EvaluationError {
    #[error("sample image {identifier} could not be encoded: {message}")]
    Image { identifier: String, message: String },

    #[error("{stage} call returned status {status}: {body}")]
    Endpoint {
        stage: Stage,
        status: u16,
        body: String,
    },

    #[error("{stage} call failed: {message}")]
    Transport { stage: Stage, message: String },
}

impl EvaluationError {
    pub fn stage(&self) -> Option<Stage> {
        match self {
            EvaluationError::Image { .. } => None,
            EvaluationError::Endpoint { stage, .. } | EvaluationError::Transport { stage, .. } => {
                Some(*stage)
            }
        }
    }
}

/// Flattens an error and its causes into one line, skipping blank causes and
/// a context that only repeats the message below it.
pub(crate) fn error_chain_text(err: &anyhow::Error, max_chars: usize) -> String {
    let mut causes: Vec<String> = err
        .chain()
        .map(|cause| cause.to_string().trim().to_string())
        .filter(|text| !text.is_empty())
        .collect();
    causes.dedup();
    let text = if causes.is_empty() {
        err.to_string()
    } else {
        causes.join(" | caused by: ")
    };
    truncate_text(&text, max_chars)
}

pub(crate) fn truncate_text(value: &str, max_chars: usize) -> String {
    match value.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}…", &value[..cut]),
        None => value.to_string(),
    }
}
