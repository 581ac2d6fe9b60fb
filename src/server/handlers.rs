//! # Server Handlers
//!
//! HTTP route handlers for the relay.

use super::AppState;
use crate::{
    adapters::ChatClient,
    error::ProxyError,
    schemas::{ChatRequest, ChatResponse, HealthResponse},
    streaming::create_streaming_response,
};
use axum::{
    extract::State,
    response::Response,
    Json,
};
use tracing::info;

/// Health check handler
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
    })
}

/// Non-streaming chat: runs the completion to the end and returns the text.
pub async fn chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ProxyError> {
    validate_message(&req)?;
    info!(provider = state.adapter().name(), chars = req.message.len(), "Chat request");

    let message = state
        .adapter()
        .complete(state.conversation(&req.message))
        .await?;

    Ok(Json(ChatResponse { message }))
}

/// Streaming chat: relays the completion as Server-Sent Events.
///
/// Once headers are sent, failures are reported in-band as an `error` frame.
pub async fn chat_stream(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Response, ProxyError> {
    validate_message(&req)?;
    info!(provider = state.adapter().name(), chars = req.message.len(), "Chat stream request");

    let chunks = state.adapter().chat_completion(state.conversation(&req.message));
    Ok(create_streaming_response(chunks))
}

fn validate_message(req: &ChatRequest) -> Result<(), ProxyError> {
    if req.message.trim().is_empty() {
        return Err(ProxyError::BadRequest("message must not be empty".to_string()));
    }
    Ok(())
}
