//! # OpenAI Adapter Module
//!
//! Streams chat completions from the OpenAI API or an Azure OpenAI
//! deployment. Both speak the same event format: SSE frames whose `data`
//! is a JSON object with a `choices[].delta.content` field, terminated by
//! a `[DONE]` sentinel.
//!
//! Which URL shape and auth header is used depends on whether an API
//! version is configured:
//! - no version: `{base_url}/chat/completions` with `Authorization: Bearer`
//! - version: `{endpoint}/openai/deployments/{model}/chat/completions?api-version=...`
//!   with an `api-key` header

use crate::{
    adapters::base::{AdapterUtils, ChatClient, ChunkStream},
    error::ProxyError,
    schemas::{ChatCompletionChunk, Message},
};
use eventsource_stream::Eventsource;
use futures_util::{future, stream, TryStreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

const DONE_SENTINEL: &str = "[DONE]";

/// Endpoint shape for the cloud provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OpenAIEndpoint {
    /// OpenAI or any OpenAI-compatible base URL, bearer authentication
    Standard { base_url: String },
    /// Azure OpenAI resource with a versioned deployment URL
    Versioned { endpoint: String, api_version: String },
}

/// # OpenAI Adapter
///
/// Cheap to clone; the `reqwest::Client` inside shares its connection pool.
#[derive(Clone)]
pub struct OpenAIAdapter {
    endpoint: OpenAIEndpoint,
    model_id: String,
    api_key: String,
    client: Client,
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    stream: bool,
}

#[derive(Deserialize)]
struct StreamEvent {
    #[serde(default)]
    choices: Vec<EventChoice>,
    #[serde(default)]
    error: Option<EventError>,
}

#[derive(Deserialize)]
struct EventChoice {
    #[serde(default)]
    delta: Option<EventDelta>,
}

#[derive(Deserialize)]
struct EventDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct EventError {
    message: String,
}

impl OpenAIAdapter {
    /// Create a new adapter.
    ///
    /// Supplying `api_version` selects the versioned (Azure) endpoint shape,
    /// which needs an explicit endpoint.
    pub fn new(
        api_key: String,
        model_id: String,
        base_url: Option<String>,
        api_version: Option<String>,
        client: Client,
    ) -> Result<Self, ProxyError> {
        if api_key.is_empty() {
            return Err(ProxyError::Config("API key is required for OpenAI client".to_string()));
        }

        let endpoint = match (base_url, api_version) {
            (Some(endpoint), Some(api_version)) => OpenAIEndpoint::Versioned { endpoint, api_version },
            (None, Some(_)) => {
                return Err(ProxyError::Config(
                    "An API endpoint is required when an API version is set".to_string(),
                ))
            }
            (base_url, None) => OpenAIEndpoint::Standard {
                base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            },
        };

        Ok(Self {
            endpoint,
            model_id,
            api_key,
            client,
        })
    }

    pub fn endpoint(&self) -> &OpenAIEndpoint {
        &self.endpoint
    }

    /// Full URL of the chat completions call.
    pub fn completions_url(&self) -> String {
        match &self.endpoint {
            OpenAIEndpoint::Standard { base_url } => {
                AdapterUtils::endpoint_url(base_url, "chat/completions")
            }
            OpenAIEndpoint::Versioned { endpoint, api_version } => format!(
                "{}?api-version={}",
                AdapterUtils::endpoint_url(
                    endpoint,
                    &format!("openai/deployments/{}/chat/completions", self.model_id)
                ),
                api_version
            ),
        }
    }

    fn request(&self, messages: &[Message]) -> reqwest::RequestBuilder {
        let body = CompletionRequest {
            model: &self.model_id,
            messages,
            stream: true,
        };

        let builder = self
            .client
            .post(self.completions_url())
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .json(&body);

        match &self.endpoint {
            OpenAIEndpoint::Standard { .. } => builder.bearer_auth(&self.api_key),
            OpenAIEndpoint::Versioned { .. } => builder.header("api-key", &self.api_key),
        }
    }

    async fn open_stream(self, messages: Vec<Message>) -> Result<ChunkStream, ProxyError> {
        AdapterUtils::log_request(self.name(), &self.model_id, messages.len());

        let response = self.request(&messages).send().await?;
        let response = AdapterUtils::ensure_success(self.name(), response).await?;
        debug!(status = response.status().as_u16(), "OpenAI stream opened");

        let chunks = response
            .bytes_stream()
            .eventsource()
            .map_err(ProxyError::from)
            .try_take_while(|event| future::ready(Ok::<_, ProxyError>(event.data != DONE_SENTINEL)))
            .try_filter_map(|event| future::ready(parse_event(&event.data)));

        Ok(Box::pin(chunks))
    }
}

/// Decode one SSE `data` payload into at most one chunk.
///
/// Events without usable content (blank heartbeats, role-only deltas, empty
/// final deltas, content-filter annotations with no choices) yield `None`.
pub fn parse_event(data: &str) -> Result<Option<ChatCompletionChunk>, ProxyError> {
    if data.trim().is_empty() {
        return Ok(None);
    }

    let event: StreamEvent = serde_json::from_str(data)?;

    if let Some(error) = event.error {
        return Err(ProxyError::Upstream(error.message));
    }

    Ok(event
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta)
        .and_then(|delta| delta.content)
        .and_then(ChatCompletionChunk::from_content))
}

impl fmt::Debug for OpenAIAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAIAdapter")
            .field("endpoint", &self.endpoint)
            .field("model_id", &self.model_id)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

#[async_trait::async_trait]
impl ChatClient for OpenAIAdapter {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn chat_completion(&self, messages: Vec<Message>) -> ChunkStream {
        let adapter = self.clone();
        Box::pin(stream::once(adapter.open_stream(messages)).try_flatten())
    }
}
