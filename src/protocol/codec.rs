//! Newline-delimited framing for the firmware link.
//!
//! The decoder keeps the partial-line remainder in the framed reader's buffer
//! between reads, so a line split across several TCP segments is emitted
//! exactly once, whole.

// ============================================================================
// Imports
// ============================================================================

use std::io::{Error as IoError, ErrorKind};

use bytes::{BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::trace;

// ============================================================================
// Constants
// ============================================================================

/// Longest line accepted from the firmware before the connection is dropped.
pub const MAX_LINE_LENGTH: usize = 64 * 1024;

// ============================================================================
// LineCodec
// ============================================================================

/// Splits inbound bytes on `\n` and appends `\n` to outbound lines.
///
/// Inbound lines have a trailing `\r` stripped and invalid UTF-8 replaced
/// lossily. Empty lines are emitted as empty strings.
#[derive(Debug, Clone, Default)]
pub struct LineCodec {
    /// Index already scanned for a newline, so rescans start where they left off.
    next_index: usize,
}

impl LineCodec {
    /// Creates a new codec.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self { next_index: 0 }
    }
}

impl Decoder for LineCodec {
    type Item = String;
    type Error = IoError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<String>, IoError> {
        let Some(offset) = src[self.next_index..].iter().position(|b| *b == b'\n') else {
            self.next_index = src.len();
            if src.len() > MAX_LINE_LENGTH {
                return Err(IoError::new(
                    ErrorKind::InvalidData,
                    format!("line exceeds {MAX_LINE_LENGTH} bytes"),
                ));
            }
            return Ok(None);
        };

        let newline = self.next_index + offset;
        self.next_index = 0;

        let frame = src.split_to(newline + 1);
        let body = &frame[..newline];
        let body = body.strip_suffix(b"\r").unwrap_or(body);

        Ok(Some(String::from_utf8_lossy(body).into_owned()))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<String>, IoError> {
        if let Some(line) = self.decode(src)? {
            return Ok(Some(line));
        }

        // An unterminated tail is not a message.
        if !src.is_empty() {
            trace!(bytes = src.len(), "Discarding unterminated tail at EOF");
            src.clear();
        }
        self.next_index = 0;
        Ok(None)
    }
}

impl<T: AsRef<str>> Encoder<T> for LineCodec {
    type Error = IoError;

    fn encode(&mut self, line: T, dst: &mut BytesMut) -> Result<(), IoError> {
        let line = line.as_ref();
        dst.reserve(line.len() + 1);
        dst.put_slice(line.as_bytes());
        dst.put_u8(b'\n');
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
