//! Pending stream buffer
//!
//! Text accumulated for the one in-flight assistant response. It exists from
//! the moment a request is issued until the stream ends, and is then either
//! finished into a [`CompletedStream`] or dropped.

use std::time::{Duration, Instant};

use bytes::BytesMut;

use super::decoder::Utf8StreamDecoder;
use crate::messages::MessageId;

/// Accumulator for an in-flight response
#[derive(Debug)]
pub struct PendingStream {
    /// Message ID reserved for the response
    message_id: MessageId,
    /// Every byte received, in arrival order
    raw: BytesMut,
    /// Incremental decoder for the live view
    decoder: Utf8StreamDecoder,
    /// Text shown so far in the transient view
    partial: String,
    /// Number of non-empty chunks received
    chunk_count: u32,
    /// When the request was issued
    started_at: Instant,
    /// When the first chunk arrived
    first_chunk_at: Option<Instant>,
}

impl PendingStream {
    /// Create an empty buffer for `message_id`
    #[must_use]
    pub fn new(message_id: MessageId) -> Self {
        Self {
            message_id,
            raw: BytesMut::new(),
            decoder: Utf8StreamDecoder::new(),
            partial: String::new(),
            chunk_count: 0,
            started_at: Instant::now(),
            first_chunk_at: None,
        }
    }

    /// Message ID reserved for the response
    #[must_use]
    pub fn message_id(&self) -> &MessageId {
        &self.message_id
    }

    /// Add a chunk; returns the newly decodable text (possibly empty)
    pub fn push(&mut self, chunk: &[u8]) -> String {
        if chunk.is_empty() {
            return String::new();
        }
        if self.first_chunk_at.is_none() {
            self.first_chunk_at = Some(Instant::now());
        }
        self.chunk_count += 1;
        self.raw.extend_from_slice(chunk);

        let text = self.decoder.decode(chunk);
        self.partial.push_str(&text);
        text
    }

    /// Text decoded so far
    #[must_use]
    pub fn partial_text(&self) -> &str {
        &self.partial
    }

    /// Bytes received so far
    #[must_use]
    pub fn byte_count(&self) -> usize {
        self.raw.len()
    }

    /// Chunks received so far
    #[must_use]
    pub fn chunk_count(&self) -> u32 {
        self.chunk_count
    }

    /// Close the buffer at end of stream
    ///
    /// The final text is decoded once from the complete byte sequence, not
    /// stitched together from the partial decodes.
    #[must_use]
    pub fn finish(self) -> CompletedStream {
        if self.decoder.has_pending() {
            tracing::debug!(
                message_id = %self.message_id,
                "Response ended inside a multi-byte character"
            );
        }
        let raw = self.raw.freeze();
        CompletedStream {
            message_id: self.message_id,
            text: String::from_utf8_lossy(&raw).into_owned(),
            byte_count: raw.len(),
            chunk_count: self.chunk_count,
            elapsed: self.started_at.elapsed(),
            time_to_first_chunk: self.first_chunk_at.map(|t| t - self.started_at),
        }
    }
}

/// A response whose stream ended normally
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompletedStream {
    /// Message ID reserved for the response
    pub message_id: MessageId,
    /// Full response text
    pub text: String,
    /// Total bytes received
    pub byte_count: usize,
    /// Total non-empty chunks received
    pub chunk_count: u32,
    /// Time from request to end of stream
    pub elapsed: Duration,
    /// Time from request to first chunk, if any chunk arrived
    pub time_to_first_chunk: Option<Duration>,
}
