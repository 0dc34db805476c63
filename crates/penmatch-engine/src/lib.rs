//! Handwriting pair evaluation against a hosted chat model.
//!
//! A [`BatchRunner`] walks a [`penmatch_contracts::Dataset`], asks the model
//! for an explanation and then a decision for each pair, and merges accepted
//! pairs back into the dataset.

pub mod batch;
pub mod config;
pub mod conversation;
pub mod decision;
pub mod error;
pub mod evaluator;
pub mod images;
pub mod model;
pub mod pacing;

#[cfg(test)]
mod test_support;

pub use batch::{BatchReport, BatchRunner, OutcomeKind};
pub use config::{EngineConfig, ExecutionMode, UnknownPolicy};
pub use decision::{extract_decision, DecisionLabel};
pub use error::{EvaluationError, Stage};
pub use evaluator::{PairEvaluator, PairOutcome};
pub use images::{EncodedImage, ImageEncoder, ResizingImageEncoder};
pub use model::{ChatModel, ChatRequest, ModelResponse, OpenAiChatModel};
pub use pacing::{FixedPause, NoPause, Pacer};
