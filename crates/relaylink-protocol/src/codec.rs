//! Line framing for the serial byte stream.
//!
//! The transport delivers arbitrary byte chunks; frames are terminated by
//! CRLF or LF. [`LineCodec`] accumulates chunks and yields complete lines,
//! dropping anything that overruns the length guard (a line that long is
//! noise, not protocol).

use bytes::BytesMut;

use crate::constants::MAX_LINE_LENGTH;
use crate::error::ProtocolError;

/// Accumulates received bytes and splits them into protocol lines.
#[derive(Debug, Default)]
pub struct LineCodec {
    /// Buffer for accumulating incoming data.
    buffer: BytesMut,
}

impl LineCodec {
    /// Create a new line codec.
    pub fn new() -> Self {
        LineCodec {
            buffer: BytesMut::with_capacity(MAX_LINE_LENGTH * 2),
        }
    }

    /// Add received data to the buffer.
    pub fn push(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Try to take the next complete line from the buffer.
    ///
    /// Returns `None` when no full line is buffered yet. Empty lines are
    /// skipped. A line exceeding [`MAX_LINE_LENGTH`] without a terminator is
    /// discarded wholesale.
    pub fn next_line(&mut self) -> Option<String> {
        loop {
            let line_end = self
                .buffer
                .iter()
                .position(|&b| b == b'\r' || b == b'\n');

            let Some(end) = line_end else {
                if self.buffer.len() > MAX_LINE_LENGTH {
                    log::warn!(
                        "{}",
                        ProtocolError::LineTooLong {
                            max: MAX_LINE_LENGTH,
                            actual: self.buffer.len(),
                        }
                    );
                    self.buffer.clear();
                }
                return None;
            };

            let line_data = self.buffer.split_to(end);

            // Consume the terminator(s) so a CRLF pair is not read as a
            // second, empty line.
            while !self.buffer.is_empty() && (self.buffer[0] == b'\r' || self.buffer[0] == b'\n') {
                let _ = self.buffer.split_to(1);
            }

            if line_data.is_empty() {
                continue;
            }

            return Some(String::from_utf8_lossy(&line_data).to_string());
        }
    }

    /// Get the number of buffered bytes.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Drop any partially accumulated input.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_line() {
        let mut codec = LineCodec::new();
        codec.push(b"D|03|02|7.25|124500\r\n");
        assert_eq!(codec.next_line(), Some("D|03|02|7.25|124500".to_string()));
        assert_eq!(codec.next_line(), None);
    }

    #[test]
    fn test_partial_then_complete() {
        let mut codec = LineCodec::new();
        codec.push(b"D|03|02|7.");
        assert_eq!(codec.next_line(), None);
        codec.push(b"25|124500\n");
        assert_eq!(codec.next_line(), Some("D|03|02|7.25|124500".to_string()));
    }

    #[test]
    fn test_multiple_lines_per_chunk() {
        let mut codec = LineCodec::new();
        codec.push(b"NODE|03\r\nD|03|--|PONG|1\r\n");
        assert_eq!(codec.next_line(), Some("NODE|03".to_string()));
        assert_eq!(codec.next_line(), Some("D|03|--|PONG|1".to_string()));
        assert_eq!(codec.next_line(), None);
    }

    #[test]
    fn test_bare_lf_and_blank_lines() {
        let mut codec = LineCodec::new();
        codec.push(b"\n\nNODE|01\n\n");
        assert_eq!(codec.next_line(), Some("NODE|01".to_string()));
        assert_eq!(codec.next_line(), None);
    }

    #[test]
    fn test_overlong_garbage_is_discarded() {
        let mut codec = LineCodec::new();
        codec.push(&vec![b'x'; MAX_LINE_LENGTH + 1]);
        assert_eq!(codec.next_line(), None);
        assert_eq!(codec.buffered_len(), 0);

        // The codec keeps working after the discard.
        codec.push(b"NODE|02\n");
        assert_eq!(codec.next_line(), Some("NODE|02".to_string()));
    }
}
