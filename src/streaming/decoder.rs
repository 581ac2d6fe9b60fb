//! # Line Decoder
//!
//! Turns a provider's raw response body into text lines (Ollama's
//! newline-delimited JSON). Network reads split the body at arbitrary points,
//! so partial input is buffered until a full line is available.
//!
//! The stream adapter in this module is pull-based: the upstream body is only
//! read when the consumer asks for the next item, and dropping the returned
//! stream drops the body, which closes the upstream connection.

use crate::error::ProxyError;
use bytes::Bytes;
use futures_util::stream::{self, Stream, StreamExt};
use std::collections::VecDeque;
use std::pin::Pin;

/// Longest line accepted before the body is rejected.
pub const MAX_LINE_BYTES: usize = 4 * 1024 * 1024;

/// Splits a byte stream into text lines.
///
/// Line terminators (`\n` or `\r\n`) are stripped. Splitting happens on the
/// `\n` byte, which never occurs inside a multi-byte UTF-8 sequence, so a
/// character cut in half by a network read is reassembled before decoding.
#[derive(Debug, Default)]
pub struct LineDecoder {
    buffer: Vec<u8>,
    /// Bytes of `buffer` already searched for a newline
    scanned: usize,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a block of bytes and return every line it completes, in order.
    ///
    /// Decoding stops at the first bad line: its error is the last element
    /// and the decoder should not be fed again.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<Result<String, ProxyError>> {
        self.buffer.extend_from_slice(bytes);

        let mut lines = Vec::new();
        let mut start = 0;
        while let Some(offset) = self.buffer[self.scanned..].iter().position(|b| *b == b'\n') {
            let end = self.scanned + offset;
            let line = decode_line(&self.buffer[start..end]);
            start = end + 1;
            self.scanned = start;

            let failed = line.is_err();
            lines.push(line);
            if failed {
                break;
            }
        }

        self.buffer.drain(..start);
        self.scanned = if lines.last().map_or(false, Result::is_err) {
            0
        } else {
            self.buffer.len()
        };

        if self.buffer.len() > MAX_LINE_BYTES && lines.last().map_or(true, Result::is_ok) {
            lines.push(Err(ProxyError::Serialization(format!(
                "Upstream line exceeds {} bytes",
                MAX_LINE_BYTES
            ))));
        }

        lines
    }

    /// Flush the trailing line of a body that did not end with a newline.
    pub fn finish(&mut self) -> Result<Option<String>, ProxyError> {
        if self.buffer.is_empty() {
            return Ok(None);
        }

        let line = std::mem::take(&mut self.buffer);
        self.scanned = 0;
        decode_line(&line).map(Some)
    }
}

fn decode_line(line: &[u8]) -> Result<String, ProxyError> {
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    std::str::from_utf8(line)
        .map(str::to_owned)
        .map_err(|e| ProxyError::Serialization(format!("Invalid UTF-8 in upstream stream: {}", e)))
}

struct LineState<E> {
    body: Pin<Box<dyn Stream<Item = Result<Bytes, E>> + Send>>,
    decoder: LineDecoder,
    pending: VecDeque<Result<String, ProxyError>>,
    exhausted: bool,
}

/// Turn a response body into a stream of lines.
///
/// Lines completed before a failure are yielded first. The stream ends after
/// the first error; a bad line or transport failure is never followed by
/// more lines.
pub fn lines<S, E>(body: S) -> impl Stream<Item = Result<String, ProxyError>> + Send + 'static
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Into<ProxyError> + Send + 'static,
{
    let state = LineState {
        body: Box::pin(body),
        decoder: LineDecoder::new(),
        pending: VecDeque::new(),
        exhausted: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.pending.pop_front() {
                return Some((item, state));
            }
            if state.exhausted {
                return None;
            }

            match state.body.next().await {
                Some(Ok(bytes)) => {
                    let decoded = state.decoder.push(&bytes);
                    if decoded.iter().any(Result::is_err) {
                        state.exhausted = true;
                    }
                    state.pending.extend(decoded);
                }
                Some(Err(err)) => {
                    state.exhausted = true;
                    state.pending.push_back(Err(err.into()));
                }
                None => {
                    state.exhausted = true;
                    if let Some(item) = state.decoder.finish().transpose() {
                        state.pending.push_back(item);
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::TryStreamExt;

    fn body(parts: &[&'static [u8]]) -> impl Stream<Item = Result<Bytes, ProxyError>> + Send {
        let items: Vec<Result<Bytes, ProxyError>> =
            parts.iter().copied().map(|p| Ok(Bytes::from_static(p))).collect();
        stream::iter(items)
    }

    fn ok_lines(results: Vec<Result<String, ProxyError>>) -> Vec<String> {
        results.into_iter().map(|line| line.unwrap()).collect()
    }

    #[test]
    fn test_line_decoder_reassembles_split_lines() {
        let mut decoder = LineDecoder::new();
        assert!(decoder.push(b"{\"a\":").is_empty());
        assert_eq!(ok_lines(decoder.push(b"1}\r\n{\"b\"")), vec!["{\"a\":1}"]);
        assert_eq!(ok_lines(decoder.push(b":2}\n")), vec!["{\"b\":2}"]);
        assert_eq!(decoder.finish().unwrap(), None);
    }

    #[test]
    fn test_line_decoder_keeps_split_utf8() {
        let text = "héllo\n".as_bytes();
        let mut decoder = LineDecoder::new();
        assert!(decoder.push(&text[..2]).is_empty());
        assert_eq!(ok_lines(decoder.push(&text[2..])), vec!["héllo"]);
    }

    #[test]
    fn test_line_decoder_flushes_trailing_line() {
        let mut decoder = LineDecoder::new();
        assert!(decoder.push(b"last").is_empty());
        assert_eq!(decoder.finish().unwrap(), Some("last".to_string()));
    }

    #[test]
    fn test_line_decoder_keeps_lines_before_invalid_utf8() {
        let mut decoder = LineDecoder::new();
        let results = decoder.push(b"good\n\xff\xfe\nnever\n");

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].as_ref().unwrap(), "good");
        assert!(matches!(results[1], Err(ProxyError::Serialization(_))));
    }

    #[test]
    fn test_line_decoder_many_small_reads() {
        let mut decoder = LineDecoder::new();
        for byte in b"abc" {
            assert!(decoder.push(&[*byte]).is_empty());
        }
        assert_eq!(ok_lines(decoder.push(b"\nd\n")), vec!["abc", "d"]);
    }

    #[test]
    fn test_line_decoder_rejects_oversized_line() {
        let mut decoder = LineDecoder::new();
        let block = vec![b'x'; 1024 * 1024];

        let mut results = Vec::new();
        for _ in 0..5 {
            results = decoder.push(&block);
            if !results.is_empty() {
                break;
            }
        }

        assert_eq!(results.len(), 1);
        assert!(matches!(results[0], Err(ProxyError::Serialization(_))));
    }

    #[tokio::test]
    async fn test_lines_stream() {
        let lines: Vec<String> = lines(body(&[b"a\nb", b"\n\nc"])).try_collect().await.unwrap();
        assert_eq!(lines, vec!["a", "b", "", "c"]);
    }

    #[tokio::test]
    async fn test_lines_stream_yields_content_before_bad_line() {
        let results: Vec<_> = lines(body(&[b"{\"message\":{\"content\":\"Hel\"}}\n\xff\n"]))
            .collect()
            .await;

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].as_ref().unwrap(), "{\"message\":{\"content\":\"Hel\"}}");
        assert!(matches!(results[1], Err(ProxyError::Serialization(_))));
    }

    #[tokio::test]
    async fn test_lines_stream_stops_after_error() {
        let items: Vec<Result<Bytes, ProxyError>> = vec![
            Ok(Bytes::from_static(b"a\n")),
            Err(ProxyError::Upstream("connection reset".to_string())),
            Ok(Bytes::from_static(b"b\n")),
        ];
        let results: Vec<_> = lines(stream::iter(items)).collect().await;

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].as_ref().unwrap(), "a");
        assert!(matches!(results[1], Err(ProxyError::Upstream(_))));
    }
}
