//! # Token Relay
//!
//! Turns a provider's chunk stream into the frames written by `/chat/stream`.
//! Every relay ends with exactly one terminal frame: `done` when the chunk
//! stream ends normally, `error` the first time it yields an error. Nothing
//! follows the terminal frame.

use crate::{adapters::ChunkStream, schemas::StreamFrame};
use futures_util::stream::{self, Stream, StreamExt};
use std::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;

/// Per-request relay state.
///
/// Owns the upstream chunk stream, so dropping the relay (on completion, on
/// error, or when the client goes away and the response body is dropped)
/// closes the provider connection.
pub struct Relay {
    chunks: ChunkStream,
    request_id: String,
    frames: usize,
    started: Instant,
    finished: bool,
}

impl Relay {
    pub fn new(chunks: ChunkStream) -> Self {
        Self {
            chunks,
            request_id: Uuid::new_v4().to_string(),
            frames: 0,
            started: Instant::now(),
            finished: false,
        }
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Wait for the next frame to send.
    async fn next_frame(&mut self) -> StreamFrame {
        loop {
            match self.chunks.next().await {
                Some(Ok(chunk)) => match chunk.content() {
                    Some(text) if !text.is_empty() => {
                        self.frames += 1;
                        return StreamFrame::content(text);
                    }
                    _ => continue,
                },
                Some(Err(err)) => {
                    warn!(request_id = %self.request_id, frames = self.frames, error = %err, "Chat stream failed");
                    return StreamFrame::error(err.to_string());
                }
                None => return StreamFrame::done(),
            }
        }
    }

    fn finish(&mut self) {
        self.finished = true;
        debug!(
            request_id = %self.request_id,
            frames = self.frames,
            elapsed_ms = self.started.elapsed().as_millis() as u64,
            "Chat stream finished"
        );
    }
}

impl Drop for Relay {
    fn drop(&mut self) {
        if !self.finished {
            warn!(
                request_id = %self.request_id,
                frames = self.frames,
                "Client went away before the stream finished, closing upstream"
            );
        }
    }
}

/// Relay chunks as frames.
///
/// Pull-based: the next chunk is only requested once the previous frame has
/// been taken by the consumer.
pub fn relay_frames(chunks: ChunkStream) -> impl Stream<Item = StreamFrame> + Send + 'static {
    stream::unfold(Some(Relay::new(chunks)), |state| async move {
        let Some(mut relay) = state else {
            return None;
        };
        let frame = relay.next_frame().await;

        if frame.is_terminal() {
            relay.finish();
            return Some((frame, None));
        }

        Some((frame, Some(relay)))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::ProxyError, schemas::ChatCompletionChunk};
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    fn chunk(text: &str) -> Result<ChatCompletionChunk, ProxyError> {
        Ok(ChatCompletionChunk::from_content(text).unwrap())
    }

    fn scripted(items: Vec<Result<ChatCompletionChunk, ProxyError>>) -> ChunkStream {
        Box::pin(stream::iter(items))
    }

    #[tokio::test]
    async fn test_relay_success() {
        let frames: Vec<_> = relay_frames(scripted(vec![chunk("Hel"), chunk("lo")])).collect().await;

        assert_eq!(
            frames,
            vec![StreamFrame::content("Hel"), StreamFrame::content("lo"), StreamFrame::done()]
        );
    }

    #[tokio::test]
    async fn test_relay_empty_stream_is_done() {
        let frames: Vec<_> = relay_frames(scripted(vec![])).collect().await;
        assert_eq!(frames, vec![StreamFrame::done()]);
    }

    #[tokio::test]
    async fn test_relay_skips_empty_choices() {
        let empty = ChatCompletionChunk { choices: vec![] };
        let frames: Vec<_> = relay_frames(scripted(vec![Ok(empty), chunk("x")])).collect().await;
        assert_eq!(frames, vec![StreamFrame::content("x"), StreamFrame::done()]);
    }

    #[tokio::test]
    async fn test_relay_error_ends_stream() {
        let items = vec![
            chunk("Hel"),
            Err(ProxyError::Upstream("connection reset".to_string())),
            chunk("never sent"),
        ];
        let frames: Vec<_> = relay_frames(scripted(items)).collect().await;

        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0], StreamFrame::content("Hel"));
        match &frames[1] {
            StreamFrame::Error { error } => assert!(error.contains("connection reset")),
            other => panic!("expected error frame, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_relay_does_not_read_ahead() {
        let polled = Arc::new(AtomicUsize::new(0));
        let counter = polled.clone();
        let chunks: ChunkStream = Box::pin(stream::iter(vec!["a", "b", "c"]).map(move |text| {
            counter.fetch_add(1, Ordering::SeqCst);
            chunk(text)
        }));

        let mut frames = Box::pin(relay_frames(chunks));
        assert_eq!(frames.next().await, Some(StreamFrame::content("a")));
        assert_eq!(polled.load(Ordering::SeqCst), 1);

        drop(frames);
        assert_eq!(polled.load(Ordering::SeqCst), 1);
    }
}
