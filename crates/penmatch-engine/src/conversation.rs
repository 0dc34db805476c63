use serde::{Deserialize, Serialize};

use crate::images::EncodedImage;

pub const SYSTEM_PROMPT: &str = "You are a Forensic Document Examiner.";

const DECISION_PROMPT: &str = "Based on the explanation, what is the decision?";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Message history for one pair.
///
/// Always opens with the system message and the explanation request; the only
/// way to grow it is [`Conversation::record_explanation`], which appends the
/// model's reply and the decision request, so turns stay in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn for_explanation(first: &EncodedImage, second: &EncodedImage) -> Self {
        Self {
            messages: vec![
                Message::new(Role::System, SYSTEM_PROMPT),
                Message::new(Role::User, explanation_prompt(first, second)),
            ],
        }
    }

    pub fn record_explanation(&mut self, explanation: &str) {
        self.messages
            .push(Message::new(Role::Assistant, explanation));
        self.messages
            .push(Message::new(Role::User, decision_prompt()));
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

pub fn explanation_prompt(first: &EncodedImage, second: &EncodedImage) -> String {
    format!(
        "You are a Forensic Document Examiner. You will be provided with two handwritten sample \
images. Your task is to provide an explanation comparing the two handwritten samples, stating \
whether they are written by the same writer or by different writers, as follows:\n\
\n\
- \"Explanation\" :\n\
\n\
Handwriting sample 1:\n\
{}\n\
\n\
Handwriting sample 2:\n\
{}\n",
        first.data_url(),
        second.data_url()
    )
}

pub fn decision_prompt() -> &'static str {
    DECISION_PROMPT
}
