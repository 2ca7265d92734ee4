//! Incremental ingestion of streamed completion output
//!
//! The remote endpoint streams plain UTF-8 text fragments with no
//! inter-chunk framing, so fragment boundaries are arbitrary: a chunk may
//! end midway through a multi-byte code point, and whitespace that matters
//! to the final text can sit exactly on a boundary. The accumulator keeps
//! the raw bytes and always derives display text from the whole buffer:
//! an incomplete trailing code point is withheld until the bytes that
//! complete it arrive, and trailing whitespace is trimmed from the
//! accumulated text only, never from individual chunks.

use std::borrow::Cow;

/// Byte accumulator for one streamed assistant response
#[derive(Debug, Default)]
pub struct ChunkAccumulator {
    buf: Vec<u8>,
}

impl ChunkAccumulator {
    /// Create an empty accumulator
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one received fragment
    pub fn push(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Decoded text accumulated so far
    ///
    /// A trailing byte sequence that is a valid prefix of a multi-byte
    /// code point is withheld until completed by a later chunk. Bytes
    /// that can never become valid UTF-8 decode lossily instead of being
    /// dropped.
    pub fn text(&self) -> Cow<'_, str> {
        match std::str::from_utf8(&self.buf) {
            Ok(text) => Cow::Borrowed(text),
            Err(e) if e.error_len().is_none() => {
                let valid = &self.buf[..e.valid_up_to()];
                Cow::Borrowed(std::str::from_utf8(valid).unwrap_or_default())
            }
            Err(_) => String::from_utf8_lossy(&self.buf),
        }
    }

    /// Display form of the accumulated text
    ///
    /// Trailing whitespace is trimmed from the accumulated text as a
    /// whole; leading and internal whitespace pass through untouched.
    pub fn trimmed_text(&self) -> String {
        self.text().trim_end().to_string()
    }
}
