//! # Base Adapter Functionality
//!
//! The streaming chat capability every provider adapter implements, plus
//! helpers shared by the adapters.

use crate::{
    error::ProxyError,
    schemas::{ChatCompletionChunk, Message},
};
use futures_util::stream::{Stream, StreamExt};
use std::pin::Pin;
use tracing::debug;

/// Lazily produced, single-pass sequence of chunks.
///
/// Nothing is sent upstream until the stream is first polled. Dropping it
/// releases the upstream connection.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<ChatCompletionChunk, ProxyError>> + Send>>;

/// # Streaming Chat Capability
///
/// Given an ordered conversation, produce the completion as a stream of
/// chunks. Implementations never yield chunks with empty content, and a
/// transport or decoding failure is yielded as an `Err` item that ends the
/// stream.
#[async_trait::async_trait]
pub trait ChatClient: Send + Sync {
    /// Provider name for logging
    fn name(&self) -> &'static str;

    /// Model identifier sent with every request
    fn model_id(&self) -> &str;

    /// Start a streaming chat completion.
    fn chat_completion(&self, messages: Vec<Message>) -> ChunkStream;

    /// Run a completion to the end and return the concatenated text.
    async fn complete(&self, messages: Vec<Message>) -> Result<String, ProxyError> {
        let mut stream = self.chat_completion(messages);
        let mut text = String::new();

        while let Some(chunk) = stream.next().await {
            if let Some(content) = chunk?.content() {
                text.push_str(content);
            }
        }

        Ok(text)
    }
}

/// Utility functions for adapters
pub struct AdapterUtils;

impl AdapterUtils {
    /// Join a base URL and a path without doubling the separator.
    pub fn endpoint_url(base: &str, path: &str) -> String {
        format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
    }

    /// Turn a non-2xx provider response into an upstream error carrying the body.
    pub async fn ensure_success(
        adapter_name: &str,
        response: reqwest::Response,
    ) -> Result<reqwest::Response, ProxyError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|e| format!("<unreadable body: {}>", e));
        debug!(adapter = adapter_name, status = status.as_u16(), "Provider returned error response");

        Err(ProxyError::Upstream(format!("HTTP {}: {}", status.as_u16(), body.trim())))
    }

    /// Log adapter request for debugging
    pub fn log_request(adapter_name: &str, model: &str, message_count: usize) {
        debug!(
            adapter = adapter_name,
            model = model,
            message_count = message_count,
            "Opening streaming chat completion"
        );
    }
}
