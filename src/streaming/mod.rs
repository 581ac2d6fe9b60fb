//! # Streaming Module
//!
//! Server-Sent-Event plumbing for `/chat/stream`: the line decoder for
//! Ollama bodies, the relay that turns chunks into frames, and the axum
//! response that writes those frames to the client.

pub mod decoder;
pub mod relay;

pub use decoder::{lines, LineDecoder};
pub use relay::{relay_frames, Relay};

#[cfg(feature = "server")]
use crate::{adapters::ChunkStream, schemas::StreamFrame};
#[cfg(feature = "server")]
use axum::{
    http::{header, HeaderName},
    response::{
        sse::{Event, Sse},
        IntoResponse, Response,
    },
};
#[cfg(feature = "server")]
use futures_util::StreamExt;
#[cfg(feature = "server")]
use std::convert::Infallible;

/// Encode one frame as an SSE event.
///
/// Serialising a frame cannot realistically fail; if it does, the client
/// still gets a terminal error frame instead of a silently truncated stream.
#[cfg(feature = "server")]
pub fn frame_event(frame: &StreamFrame) -> Event {
    Event::default()
        .json_data(frame)
        .unwrap_or_else(|e| {
            tracing::error!(error = %e, "Failed to encode stream frame");
            Event::default().data(r#"{"error":"failed to encode stream frame"}"#)
        })
}

/// Build the `text/event-stream` response for a chunk stream.
///
/// Frames are written as they are produced; no keep-alive comments are
/// interleaved, so the body is exactly one `data:` event per frame.
#[cfg(feature = "server")]
pub fn create_streaming_response(chunks: ChunkStream) -> Response {
    let events = relay_frames(chunks).map(|frame| Ok::<_, Infallible>(frame_event(&frame)));

    (
        [
            (header::CACHE_CONTROL, "no-cache"),
            (HeaderName::from_static("x-accel-buffering"), "no"),
        ],
        Sse::new(events),
    )
        .into_response()
}

#[cfg(all(test, feature = "server"))]
mod tests {
    use super::*;
    use crate::{error::ProxyError, schemas::ChatCompletionChunk};
    use axum::body::to_bytes;
    use futures_util::stream;

    #[tokio::test]
    async fn test_streaming_response_body() {
        let chunks: ChunkStream = Box::pin(stream::iter(vec![
            Ok(ChatCompletionChunk::from_content("Hel").unwrap()),
            Ok(ChatCompletionChunk::from_content("lo").unwrap()),
        ]));

        let response = create_streaming_response(chunks);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/event-stream"
        );
        assert_eq!(response.headers().get(header::CACHE_CONTROL).unwrap(), "no-cache");

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(
            std::str::from_utf8(&body).unwrap(),
            "data: {\"content\":\"Hel\"}\n\ndata: {\"content\":\"lo\"}\n\ndata: {\"done\":true}\n\n"
        );
    }

    #[tokio::test]
    async fn test_streaming_response_error_frame() {
        let chunks: ChunkStream = Box::pin(stream::iter(vec![Err(ProxyError::Upstream(
            "HTTP 500: boom".to_string(),
        ))]));

        let body = to_bytes(create_streaming_response(chunks).into_body(), usize::MAX)
            .await
            .unwrap();
        let text = std::str::from_utf8(&body).unwrap();

        assert_eq!(text.matches("data: ").count(), 1);
        assert!(text.starts_with("data: {\"error\":"));
        assert!(text.contains("HTTP 500: boom"));
    }
}
