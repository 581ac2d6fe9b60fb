//! # Schemas Module
//!
//! Data structures shared by the adapters and the HTTP relay: chat messages,
//! the provider-independent chunk model, the relay's request/response bodies
//! and the Server-Sent-Event frame payloads.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let role = match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        };
        f.write_str(role)
    }
}

/// One entry of the conversation sent to a provider.
///
/// Both providers accept this shape verbatim, so it is serialized directly
/// into their request bodies.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// Incremental text fragment.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Delta {
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Choice {
    pub delta: Delta,
}

/// # Chat Completion Chunk
///
/// Provider-independent unit of streamed output. Adapters only build chunks
/// through [`ChatCompletionChunk::from_content`], which refuses empty
/// fragments, so every chunk reaching the relay carries text.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ChatCompletionChunk {
    pub choices: Vec<Choice>,
}

impl ChatCompletionChunk {
    /// Wrap a content fragment, returning `None` when it is empty.
    pub fn from_content(content: impl Into<String>) -> Option<Self> {
        let content = content.into();
        if content.is_empty() {
            return None;
        }
        Some(Self {
            choices: vec![Choice { delta: Delta { content } }],
        })
    }

    /// Text of the first choice, if any.
    pub fn content(&self) -> Option<&str> {
        self.choices.first().map(|choice| choice.delta.content.as_str())
    }
}

/// Body of `POST /chat` and `POST /chat/stream`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatRequest {
    pub message: String,
}

/// Body returned by `POST /chat`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ChatResponse {
    pub message: String,
}

/// Body returned by `GET /health`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HealthResponse {
    pub status: String,
}

/// # Stream Frame
///
/// JSON payload of one `data:` line written by `/chat/stream`. A stream is
/// any number of `Content` frames followed by exactly one `Done` or `Error`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum StreamFrame {
    Content { content: String },
    Done { done: bool },
    Error { error: String },
}

impl StreamFrame {
    pub fn content(text: impl Into<String>) -> Self {
        StreamFrame::Content { content: text.into() }
    }

    pub fn done() -> Self {
        StreamFrame::Done { done: true }
    }

    pub fn error(message: impl Into<String>) -> Self {
        StreamFrame::Error { error: message.into() }
    }

    /// True for the frames that end a stream.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, StreamFrame::Content { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_serializes_lowercase_role() {
        let value = serde_json::to_value(Message::system("be brief")).unwrap();
        assert_eq!(value, json!({"role": "system", "content": "be brief"}));
    }

    #[test]
    fn test_unknown_role_rejected() {
        let result = serde_json::from_value::<Message>(json!({"role": "tool", "content": "x"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_chunk_rejects_empty_content() {
        assert!(ChatCompletionChunk::from_content("").is_none());

        let chunk = ChatCompletionChunk::from_content("Hel").unwrap();
        assert_eq!(chunk.choices.len(), 1);
        assert_eq!(chunk.content(), Some("Hel"));
    }

    #[test]
    fn test_stream_frame_shapes() {
        assert_eq!(
            serde_json::to_value(StreamFrame::content("Hel")).unwrap(),
            json!({"content": "Hel"})
        );
        assert_eq!(serde_json::to_value(StreamFrame::done()).unwrap(), json!({"done": true}));
        assert_eq!(
            serde_json::to_value(StreamFrame::error("boom")).unwrap(),
            json!({"error": "boom"})
        );
    }

    #[test]
    fn test_stream_frame_parses_back() {
        let frame: StreamFrame = serde_json::from_str(r#"{"done": true}"#).unwrap();
        assert_eq!(frame, StreamFrame::done());
        assert!(frame.is_terminal());
        assert!(!StreamFrame::content("x").is_terminal());
    }
}
