use penmatch_contracts::PairRecord;

use crate::config::EngineConfig;
use crate::conversation::Conversation;
use crate::decision::extract_decision;
use crate::error::{error_chain_text, truncate_text, EvaluationError, Stage};
use crate::images::{EncodedImage, ImageEncoder};
use crate::model::{ChatModel, ChatRequest, ModelResponse};
use crate::pacing::Pacer;

const ERROR_TEXT_MAX_CHARS: usize = 512;

/// Terminal state of one pair's evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum PairOutcome {
    /// Both calls succeeded and the reply named a storable decision.
    Accepted(PairRecord),
    /// Both calls succeeded but the reply was `Unknown`.
    Indeterminate { explanation: String, reply: String },
    /// A call failed or an image could not be prepared.
    Failed(EvaluationError),
}

impl PairOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, PairOutcome::Accepted(_))
    }
}

/// Runs the explanation/decision exchange for a single pair.
///
/// The explanation request carries both images. Its reply is appended to the
/// conversation and the whole history goes out again with the decision
/// request, so the decision is grounded in the model's own explanation.
/// Nothing is retried; any failed call ends the pair.
pub struct PairEvaluator<'a> {
    model: &'a dyn ChatModel,
    images: &'a dyn ImageEncoder,
    pacer: &'a dyn Pacer,
    config: &'a EngineConfig,
}

impl<'a> PairEvaluator<'a> {
    pub fn new(
        model: &'a dyn ChatModel,
        images: &'a dyn ImageEncoder,
        pacer: &'a dyn Pacer,
        config: &'a EngineConfig,
    ) -> Self {
        Self {
            model,
            images,
            pacer,
            config,
        }
    }

    pub fn evaluate(&self, index: usize, record: &PairRecord) -> PairOutcome {
        tracing::info!(
            index,
            sample1 = %record.sample1,
            sample2 = %record.sample2,
            "processing pair"
        );
        match self.exchange(index, record) {
            Ok(outcome) => outcome,
            Err(err) => PairOutcome::Failed(err),
        }
    }

    fn exchange(&self, index: usize, record: &PairRecord) -> Result<PairOutcome, EvaluationError> {
        let first = self.encode(&record.sample1)?;
        let second = self.encode(&record.sample2)?;
        let mut conversation = Conversation::for_explanation(&first, &second);

        let explanation = self.ask(Stage::Explanation, &conversation)?;
        tracing::debug!(index, explanation = %explanation, "explanation received");
        let mut updated = record.clone();
        updated.explanation = Some(explanation.clone());
        conversation.record_explanation(&explanation);

        let reply = self.ask(Stage::Decision, &conversation)?;
        self.pacer.pause();
        tracing::debug!(index, reply = %reply, "decision reply received");

        let label = extract_decision(&reply);
        match label.into_decision() {
            Some(decision) => {
                updated.decision = Some(decision);
                Ok(PairOutcome::Accepted(updated))
            }
            None => Ok(PairOutcome::Indeterminate { explanation, reply }),
        }
    }

    fn encode(&self, identifier: &str) -> Result<EncodedImage, EvaluationError> {
        self.images
            .encode(identifier)
            .map_err(|err| EvaluationError::Image {
                identifier: identifier.to_string(),
                message: error_chain_text(&err, ERROR_TEXT_MAX_CHARS),
            })
    }

    fn ask(&self, stage: Stage, conversation: &Conversation) -> Result<String, EvaluationError> {
        let request = ChatRequest::new(
            self.config.model.as_str(),
            conversation.messages(),
            self.config.temperature,
        );
        match self.model.complete(&request) {
            Ok(ModelResponse::Completed { content }) => Ok(content),
            Ok(ModelResponse::Failed { status, body }) => Err(EvaluationError::Endpoint {
                stage,
                status,
                body: truncate_text(&body, ERROR_TEXT_MAX_CHARS),
            }),
            Err(err) => Err(EvaluationError::Transport {
                stage,
                message: error_chain_text(&err, ERROR_TEXT_MAX_CHARS),
            }),
        }
    }
}
