//! Event sources.
//!
//! The converter pulls events one at a time from an [`EventSource`]. Trace
//! files on disk hold the decoded event stream as JSON lines, one event per
//! line, which [`JsonLinesSource`] reads lazily.

use super::event::Event;
use crate::utils::error::DecodeError;
use log::debug;
use std::collections::VecDeque;
use std::io::{BufRead, BufReader, Read};

/// A finite, ordered stream of decoded trace events
pub trait EventSource {
    /// Next event, `Ok(None)` once the stream is exhausted
    fn next_event(&mut self) -> Result<Option<Event>, DecodeError>;
}

impl<S: EventSource + ?Sized> EventSource for &mut S {
    fn next_event(&mut self) -> Result<Option<Event>, DecodeError> {
        (**self).next_event()
    }
}

impl<S: EventSource + ?Sized> EventSource for Box<S> {
    fn next_event(&mut self) -> Result<Option<Event>, DecodeError> {
        (**self).next_event()
    }
}

/// Open an event stream over raw bytes
///
/// **Public** - main entry point for reading trace files
///
/// # Errors
/// * `DecodeError::Io` - The stream cannot be read
/// * `DecodeError::NotAnEventStream` - The first byte is not the start of an event
pub fn open<R: Read>(reader: R) -> Result<JsonLinesSource<BufReader<R>>, DecodeError> {
    let mut reader = BufReader::new(reader);

    let first = reader
        .fill_buf()?
        .iter()
        .copied()
        .find(|b| !b.is_ascii_whitespace());
    if let Some(b) = first {
        if b != b'{' {
            return Err(DecodeError::NotAnEventStream(format!(
                "unexpected leading byte 0x{:02x}",
                b
            )));
        }
    }

    Ok(JsonLinesSource::new(reader))
}

/// Lazily decodes one JSON event per line
#[derive(Debug)]
pub struct JsonLinesSource<R> {
    reader: R,
    buf: String,
    line: usize,
}

impl<R: BufRead> JsonLinesSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: String::new(),
            line: 0,
        }
    }

    /// Number of lines consumed so far
    pub fn lines_read(&self) -> usize {
        self.line
    }
}

impl<R: BufRead> EventSource for JsonLinesSource<R> {
    fn next_event(&mut self) -> Result<Option<Event>, DecodeError> {
        loop {
            self.buf.clear();
            if self.reader.read_line(&mut self.buf)? == 0 {
                debug!("Event stream ended after {} lines", self.line);
                return Ok(None);
            }
            self.line += 1;

            let text = self.buf.trim();
            if text.is_empty() {
                continue;
            }

            return serde_json::from_str(text)
                .map(Some)
                .map_err(|source| DecodeError::Malformed {
                    line: self.line,
                    source,
                });
        }
    }
}

/// In-memory event stream
///
/// Useful for embedding the converter behind another decoder and for tests.
/// An optional trailing error is returned once all events are drained, which
/// mimics a stream that is cut off mid-record.
#[derive(Debug, Default, Clone)]
pub struct MemorySource {
    events: VecDeque<Event>,
    trailing_error: Option<String>,
}

impl MemorySource {
    pub fn new(events: impl IntoIterator<Item = Event>) -> Self {
        Self {
            events: events.into_iter().collect(),
            trailing_error: None,
        }
    }

    /// End the stream with a decode error instead of a clean end
    pub fn truncated(mut self, reason: impl Into<String>) -> Self {
        self.trailing_error = Some(reason.into());
        self
    }

    pub fn remaining(&self) -> usize {
        self.events.len()
    }
}

impl EventSource for MemorySource {
    fn next_event(&mut self) -> Result<Option<Event>, DecodeError> {
        if let Some(event) = self.events.pop_front() {
            return Ok(Some(event));
        }
        match self.trailing_error.take() {
            Some(reason) => Err(DecodeError::Truncated(reason)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::event::EventKind;

    #[test]
    fn test_json_lines_skips_blank_lines() {
        let data = "{\"time\":1,\"kind\":\"state_transition\"}\n\n{\"time\":2,\"kind\":\"label\",\"label\":\"x\"}\n";
        let mut source = open(data.as_bytes()).unwrap();

        let first = source.next_event().unwrap().unwrap();
        assert_eq!(first.time, 1);
        let second = source.next_event().unwrap().unwrap();
        assert_eq!(second.kind, EventKind::Label { label: "x".to_string() });
        assert!(source.next_event().unwrap().is_none());
        assert_eq!(source.lines_read(), 3);
    }

    #[test]
    fn test_json_lines_reports_malformed_line() {
        let data = "{\"time\":1,\"kind\":\"state_transition\"}\n{\"time\":\n";
        let mut source = open(data.as_bytes()).unwrap();

        assert!(source.next_event().unwrap().is_some());
        match source.next_event() {
            Err(DecodeError::Malformed { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected malformed line error, got {:?}", other),
        }
    }

    #[test]
    fn test_open_rejects_binary_data() {
        let data: &[u8] = b"go 1.23 trace\x00\x00";
        assert!(matches!(open(data), Err(DecodeError::NotAnEventStream(_))));
    }

    #[test]
    fn test_open_accepts_empty_stream() {
        let mut source = open(&b""[..]).unwrap();
        assert!(source.next_event().unwrap().is_none());
    }

    #[test]
    fn test_memory_source_trailing_error() {
        let mut source = MemorySource::new(vec![Event::range_begin(1, "r")]).truncated("cut");
        assert_eq!(source.remaining(), 1);
        assert!(source.next_event().unwrap().is_some());
        assert!(matches!(source.next_event(), Err(DecodeError::Truncated(_))));
        assert!(source.next_event().unwrap().is_none());
    }
}
