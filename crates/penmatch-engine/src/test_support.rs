//! In-memory collaborators for evaluator and batch tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use anyhow::{anyhow, Result};

use crate::images::{EncodedImage, ImageEncoder};
use crate::model::{ChatModel, ChatRequest, ModelResponse};
use crate::pacing::Pacer;

pub(crate) fn ok(content: &str) -> ModelResponse {
    ModelResponse::Completed {
        content: content.to_string(),
    }
}

pub(crate) fn failed(status: u16, body: &str) -> ModelResponse {
    ModelResponse::Failed {
        status,
        body: body.to_string(),
    }
}

/// Answers by pair: the first sample's identifier (as embedded by
/// [`StubImages`]) selects an explanation reply and a decision reply.
/// Requests with no scripted pair fail like a dropped connection.
#[derive(Default)]
pub(crate) struct ScriptedModel {
    pairs: HashMap<String, (ModelResponse, ModelResponse)>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedModel {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_pair(
        mut self,
        sample1: &str,
        explanation: ModelResponse,
        decision: ModelResponse,
    ) -> Self {
        self.pairs
            .insert(sample1.to_string(), (explanation, decision));
        self
    }

    pub(crate) fn requests(&self) -> Vec<ChatRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }

    pub(crate) fn requests_for(&self, sample1: &str) -> Vec<ChatRequest> {
        self.requests()
            .into_iter()
            .filter(|request| opening_mentions(request, sample1))
            .collect()
    }
}

fn opening_mentions(request: &ChatRequest, sample1: &str) -> bool {
    let marker = format!("sample 1:\ndata:image/png;base64,{sample1}\n");
    request
        .messages
        .get(1)
        .is_some_and(|message| message.content.contains(&marker))
}

impl ChatModel for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    fn complete(&self, request: &ChatRequest) -> Result<ModelResponse> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        let (explanation, decision) = self
            .pairs
            .iter()
            .find(|(sample1, _)| opening_mentions(request, sample1))
            .map(|(_, replies)| replies)
            .ok_or_else(|| anyhow!("no scripted reply for request"))?;
        if request.messages.len() <= 2 {
            Ok(explanation.clone())
        } else {
            Ok(decision.clone())
        }
    }
}

/// Embeds each identifier verbatim as the "base64" payload.
#[derive(Default)]
pub(crate) struct StubImages {
    missing: HashSet<String>,
}

impl StubImages {
    pub(crate) fn missing(identifiers: &[&str]) -> Self {
        Self {
            missing: identifiers.iter().map(|id| id.to_string()).collect(),
        }
    }
}

impl ImageEncoder for StubImages {
    fn encode(&self, identifier: &str) -> Result<EncodedImage> {
        if self.missing.contains(identifier) {
            return Err(anyhow!("no such sample {identifier}"));
        }
        Ok(EncodedImage {
            mime_type: "image/png".to_string(),
            base64: identifier.to_string(),
        })
    }
}

#[derive(Default)]
pub(crate) struct CountingPacer {
    pauses: AtomicUsize,
}

impl CountingPacer {
    pub(crate) fn count(&self) -> usize {
        self.pauses.load(Ordering::SeqCst)
    }
}

impl Pacer for CountingPacer {
    fn pause(&self) {
        self.pauses.fetch_add(1, Ordering::SeqCst);
    }
}
