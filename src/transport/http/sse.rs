//! Server-sent events decoding
//!
//! A `tokio_util` codec that turns a `text/event-stream` body into frames.
//! Only the parts of the format the engine uses are interpreted: `data:`
//! fields, comment lines, and blank-line dispatch. Other fields (`event:`,
//! `id:`, `retry:`) are skipped. Comment lines are surfaced as
//! [`SseFrame::KeepAlive`] so callers can count them as activity.

use tokio_util::bytes::{Buf, BytesMut};
use tokio_util::codec::Decoder;

use crate::error::LabError;

/// Default maximum length of a single line (16MB, frame lists are large)
pub const DEFAULT_MAX_LINE_LENGTH: usize = 16 * 1024 * 1024;

/// Decoded unit of an event stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseFrame {
    /// A comment line (`: keep-alive`)
    KeepAlive,
    /// A dispatched event's `data:` lines joined with `\n`
    Event(String),
}

/// Decoder for `text/event-stream` bodies
#[derive(Debug)]
pub struct SseCodec {
    data_lines: Vec<String>,
    max_line_length: usize,
}

impl Default for SseCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl SseCodec {
    /// Create a codec with the default line limit
    #[must_use]
    pub const fn new() -> Self {
        Self::with_max_line_length(DEFAULT_MAX_LINE_LENGTH)
    }

    /// Create a codec with a custom line limit
    #[must_use]
    pub const fn with_max_line_length(max_line_length: usize) -> Self {
        Self {
            data_lines: Vec::new(),
            max_line_length,
        }
    }

    /// Feed one line (without terminator)
    fn process_line(&mut self, line: &str) -> Option<SseFrame> {
        if line.is_empty() {
            return self.dispatch().map(SseFrame::Event);
        }

        if line.starts_with(':') {
            return Some(SseFrame::KeepAlive);
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        if field == "data" {
            self.data_lines.push(value.to_string());
        }
        None
    }

    fn dispatch(&mut self) -> Option<String> {
        if self.data_lines.is_empty() {
            return None;
        }
        Some(std::mem::take(&mut self.data_lines).join("\n"))
    }
}

impl Decoder for SseCodec {
    type Item = SseFrame;
    type Error = LabError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            let Some(newline) = src.iter().position(|b| *b == b'\n') else {
                if src.len() > self.max_line_length {
                    return Err(LabError::protocol_violation(format!(
                        "Event stream line exceeded maximum length of {} bytes",
                        self.max_line_length
                    )));
                }
                return Ok(None);
            };

            let line = src.split_to(newline);
            src.advance(1);

            let text = String::from_utf8_lossy(&line);
            let text = text.strip_suffix('\r').unwrap_or(&text);

            if let Some(frame) = self.process_line(text) {
                return Ok(Some(frame));
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(frame) = self.decode(src)? {
            return Ok(Some(frame));
        }

        if !src.is_empty() {
            let line = src.split();
            let text = String::from_utf8_lossy(&line).into_owned();
            if let Some(frame) = self.process_line(text.trim_end_matches('\r')) {
                return Ok(Some(frame));
            }
        }

        Ok(self.dispatch().map(SseFrame::Event))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(codec: &mut SseCodec, input: &str) -> Vec<SseFrame> {
        let mut buf = BytesMut::from(input);
        let mut frames = Vec::new();
        while let Some(frame) = codec.decode(&mut buf).expect("decode") {
            frames.push(frame);
        }
        frames
    }

    fn expect_event(frame: Option<SseFrame>) -> String {
        match frame {
            Some(SseFrame::Event(data)) => data,
            other => panic!("expected event, got {other:?}"),
        }
    }

    #[test]
    fn test_keep_alive_comments_are_reported() {
        let mut codec = SseCodec::new();
        let frames = decode_all(
            &mut codec,
            ": keep-alive\n\ndata: {\"status\":\"complete\"}\n\n",
        );
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0], SseFrame::KeepAlive);
        let data = expect_event(frames.into_iter().nth(1));
        assert_eq!(data, "{\"status\":\"complete\"}");
    }

    #[test]
    fn test_multi_line_data_is_joined() {
        let mut codec = SseCodec::new();
        let frames = decode_all(
            &mut codec,
            "event: update\r\nid: 7\r\ndata: a\r\ndata: b\r\n\r\n",
        );
        assert_eq!(frames, vec![SseFrame::Event("a\nb".to_string())]);
    }

    #[test]
    fn test_split_chunks_reassemble() {
        let mut codec = SseCodec::new();
        let mut buf = BytesMut::from("data: {\"epi");
        assert!(codec.decode(&mut buf).expect("decode").is_none());

        buf.extend_from_slice(b"sode\":1}\n\n");
        let data = expect_event(codec.decode(&mut buf).expect("decode"));
        assert_eq!(data, "{\"episode\":1}");
    }

    #[test]
    fn test_eof_flushes_pending_event() {
        let mut codec = SseCodec::new();
        let mut buf = BytesMut::from("data: tail");
        assert!(codec.decode(&mut buf).expect("decode").is_none());
        let data = expect_event(codec.decode_eof(&mut buf).expect("decode"));
        assert_eq!(data, "tail");
    }

    #[test]
    fn test_oversized_line_is_rejected() {
        let mut codec = SseCodec::with_max_line_length(8);
        let mut buf = BytesMut::from("data: 0123456789");
        assert!(codec.decode(&mut buf).is_err());
    }
}
