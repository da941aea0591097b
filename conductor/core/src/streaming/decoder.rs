//! Incremental UTF-8 decoding
//!
//! Chunk boundaries fall wherever the transport puts them, including inside
//! a multi-byte character. The decoder holds back an incomplete trailing
//! sequence until the next chunk completes it.

/// Stateful UTF-8 decoder for a chunked byte stream
///
/// Invalid bytes become U+FFFD using the same rules as
/// [`String::from_utf8_lossy`], so decoding a stream piecewise yields the
/// same text as decoding the concatenated bytes at once.
#[derive(Debug, Default)]
pub struct Utf8StreamDecoder {
    /// Start of a character that has not been completed yet (at most 3 bytes)
    pending: Vec<u8>,
}

impl Utf8StreamDecoder {
    /// Create a decoder with no carried state
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode the next chunk, returning the text that is complete so far
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        let mut input = std::mem::take(&mut self.pending);
        input.extend_from_slice(chunk);

        let mut out = String::with_capacity(input.len());
        let mut rest = input.as_slice();

        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    out.push_str(valid);
                    break;
                }
                Err(err) => {
                    let (valid, after) = rest.split_at(err.valid_up_to());
                    out.push_str(&String::from_utf8_lossy(valid));
                    match err.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[len..];
                        }
                        None => {
                            // Incomplete sequence at the end, wait for more bytes
                            self.pending = after.to_vec();
                            break;
                        }
                    }
                }
            }
        }

        out
    }

    /// Whether bytes are being held back
    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}
