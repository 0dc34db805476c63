use anyhow::{anyhow, Context, Result};
use reqwest::blocking::Client as HttpClient;
use serde::Serialize;
use serde_json::Value;

use crate::conversation::Message;

pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// Body of a chat-completion request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, messages: &[Message], temperature: Option<f64>) -> Self {
        Self {
            model: model.into(),
            messages: messages.to_vec(),
            temperature,
        }
    }
}

/// What the endpoint answered. A non-success status is a value, not an
/// error: the caller decides what a failed call means for its pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelResponse {
    Completed { content: String },
    Failed { status: u16, body: String },
}

/// A hosted chat model. `Err` is reserved for transport problems and
/// success bodies that cannot be read.
pub trait ChatModel: Send + Sync {
    fn name(&self) -> &str;
    fn complete(&self, request: &ChatRequest) -> Result<ModelResponse>;
}

/// OpenAI-compatible `/chat/completions` client.
pub struct OpenAiChatModel {
    api_base: String,
    api_key: String,
    http: HttpClient,
}

impl OpenAiChatModel {
    pub fn new(api_base: &str, api_key: impl Into<String>) -> Self {
        let api_base = api_base.trim().trim_end_matches('/');
        Self {
            api_base: if api_base.is_empty() {
                DEFAULT_API_BASE.to_string()
            } else {
                api_base.to_string()
            },
            api_key: api_key.into(),
            http: HttpClient::new(),
        }
    }

    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.api_base)
    }
}

impl ChatModel for OpenAiChatModel {
    fn name(&self) -> &str {
        "openai"
    }

    fn complete(&self, request: &ChatRequest) -> Result<ModelResponse> {
        let endpoint = self.endpoint();
        let response = self
            .http
            .post(&endpoint)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .with_context(|| format!("chat completion request failed ({endpoint})"))?;
        let status = response.status();
        let body = response
            .text()
            .context("chat completion response body read failed")?;
        if status != reqwest::StatusCode::OK {
            return Ok(ModelResponse::Failed {
                status: status.as_u16(),
                body,
            });
        }
        let payload: Value = serde_json::from_str(&body)
            .context("chat completion returned invalid JSON payload")?;
        let content = completion_content(&payload)?;
        Ok(ModelResponse::Completed { content })
    }
}

/// Pulls `choices[0].message.content` out of a completion payload.
pub fn completion_content(payload: &Value) -> Result<String> {
    payload
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| anyhow!("chat completion payload has no choices[0].message.content"))
}
