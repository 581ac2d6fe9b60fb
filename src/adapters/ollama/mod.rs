//! # Ollama Adapter Module
//!
//! Streams chat completions from a local Ollama server. `POST /api/chat`
//! answers with newline-delimited JSON; every line is one object, and the
//! generated text sits in `message.content`.

use crate::{
    adapters::base::{AdapterUtils, ChatClient, ChunkStream},
    error::ProxyError,
    schemas::{ChatCompletionChunk, Message},
    streaming::decoder::lines,
};
use futures_util::{future, stream, TryStreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const DEFAULT_MODEL: &str = "mistral";
pub const DEFAULT_HOST: &str = "http://localhost:11434";

/// # Ollama Adapter
#[derive(Clone, Debug)]
pub struct OllamaAdapter {
    /// Full URL of the chat endpoint, `{host}/api/chat`
    url: String,
    model_id: String,
    client: Client,
}

#[derive(Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
}

#[derive(Deserialize)]
struct OllamaLine {
    #[serde(default)]
    message: Option<OllamaMessage>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct OllamaMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OllamaAdapter {
    pub fn new(model_id: String, host: &str, client: Client) -> Self {
        Self {
            url: AdapterUtils::endpoint_url(host, "api/chat"),
            model_id,
            client,
        }
    }

    /// Adapter for the default model on the default local host.
    pub fn with_defaults(client: Client) -> Self {
        Self::new(DEFAULT_MODEL.to_string(), DEFAULT_HOST, client)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn open_stream(self, messages: Vec<Message>) -> Result<ChunkStream, ProxyError> {
        AdapterUtils::log_request(self.name(), &self.model_id, messages.len());

        let body = OllamaChatRequest {
            model: &self.model_id,
            messages: &messages,
        };

        let response = self.client.post(&self.url).json(&body).send().await?;
        let response = AdapterUtils::ensure_success(self.name(), response).await?;
        debug!(status = response.status().as_u16(), "Ollama stream opened");

        let chunks = lines(response.bytes_stream())
            .try_filter_map(|line| future::ready(parse_line(&line)));

        Ok(Box::pin(chunks))
    }
}

/// Decode one NDJSON line into at most one chunk.
///
/// Blank lines and objects without non-empty `message.content` (such as the
/// final `done` line) yield `None`. A line that is not valid JSON is an
/// error; there is no recovery within a response.
pub fn parse_line(line: &str) -> Result<Option<ChatCompletionChunk>, ProxyError> {
    if line.trim().is_empty() {
        return Ok(None);
    }

    let parsed: OllamaLine = serde_json::from_str(line)?;

    if let Some(error) = parsed.error {
        return Err(ProxyError::Upstream(format!("Ollama error: {}", error)));
    }

    Ok(parsed
        .message
        .and_then(|message| message.content)
        .and_then(ChatCompletionChunk::from_content))
}

#[async_trait::async_trait]
impl ChatClient for OllamaAdapter {
    fn name(&self) -> &'static str {
        "ollama"
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn chat_completion(&self, messages: Vec<Message>) -> ChunkStream {
        let adapter = self.clone();
        Box::pin(stream::once(adapter.open_stream(messages)).try_flatten())
    }
}
