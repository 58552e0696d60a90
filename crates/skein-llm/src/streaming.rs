use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::stream::Stream;

use skein_core::error::{Result, SkeinError};

/// A parsed SSE event.
#[derive(Debug, Clone, PartialEq)]
pub struct SseEvent {
    pub event_type: Option<String>,
    pub data: String,
}

/// Incremental parser for `text/event-stream` bodies.
///
/// Bytes may arrive split anywhere, including inside a multi-byte UTF-8
/// sequence; incomplete tails are held until the next chunk.
#[derive(Debug, Default)]
pub struct SseParser {
    buffer: String,
    undecoded: Vec<u8>,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes and extract complete events.
    ///
    /// Invalid sequences are replaced with U+FFFD; only an incomplete
    /// trailing sequence is held back.
    pub fn feed_bytes(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.undecoded.extend_from_slice(chunk);
        let mut text = String::new();
        loop {
            match std::str::from_utf8(&self.undecoded) {
                Ok(valid) => {
                    text.push_str(valid);
                    self.undecoded.clear();
                    break;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    text.push_str(&String::from_utf8_lossy(&self.undecoded[..valid]));
                    match e.error_len() {
                        Some(bad) => {
                            text.push(char::REPLACEMENT_CHARACTER);
                            self.undecoded.drain(..valid + bad);
                        }
                        None => {
                            self.undecoded.drain(..valid);
                            break;
                        }
                    }
                }
            }
        }
        self.feed(&text)
    }

    /// Feed text and extract complete events.
    pub fn feed(&mut self, chunk: &str) -> Vec<SseEvent> {
        self.buffer.push_str(chunk);
        // A CRLF can straddle two chunks
        if self.buffer.contains("\r\n") {
            self.buffer = self.buffer.replace("\r\n", "\n");
        }
        let mut events = Vec::new();

        while let Some(pos) = self.buffer.find("\n\n") {
            let block: String = self.buffer.drain(..pos + 2).collect();
            if let Some(event) = parse_block(&block) {
                events.push(event);
            }
        }

        events
    }

    /// Flush a trailing event that was not terminated by a blank line.
    pub fn finish(&mut self) -> Option<SseEvent> {
        let mut block = std::mem::take(&mut self.buffer);
        if !self.undecoded.is_empty() {
            block.push_str(&String::from_utf8_lossy(&self.undecoded));
            self.undecoded.clear();
        }
        parse_block(&block)
    }
}

fn parse_block(block: &str) -> Option<SseEvent> {
    let mut event_type = None;
    let mut data_lines = Vec::new();

    for line in block.lines() {
        if line.starts_with(':') {
            continue;
        }
        if let Some(val) = line.strip_prefix("event:") {
            event_type = Some(val.trim().to_string());
        } else if let Some(val) = line.strip_prefix("data:") {
            data_lines.push(val.strip_prefix(' ').unwrap_or(val));
        }
    }

    if data_lines.is_empty() {
        None
    } else {
        Some(SseEvent {
            event_type,
            data: data_lines.join("\n"),
        })
    }
}

/// A stream of SSE events over an HTTP body.
///
/// A transport error is yielded once as `LlmStream`, after which the
/// stream ends.
pub struct SseStream<S> {
    inner: S,
    parser: SseParser,
    pending: VecDeque<SseEvent>,
    done: bool,
}

impl<S> SseStream<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            parser: SseParser::new(),
            pending: VecDeque::new(),
            done: false,
        }
    }
}

impl<S> Stream for SseStream<S>
where
    S: Stream<Item = std::result::Result<bytes::Bytes, reqwest::Error>> + Unpin,
{
    type Item = Result<SseEvent>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            if let Some(event) = this.pending.pop_front() {
                return Poll::Ready(Some(Ok(event)));
            }
            if this.done {
                return Poll::Ready(None);
            }

            match Pin::new(&mut this.inner).poll_next(cx) {
                Poll::Ready(Some(Ok(bytes))) => {
                    this.pending.extend(this.parser.feed_bytes(&bytes));
                }
                Poll::Ready(Some(Err(e))) => {
                    this.done = true;
                    return Poll::Ready(Some(Err(SkeinError::LlmStream(e.to_string()))));
                }
                Poll::Ready(None) => {
                    this.done = true;
                    this.pending.extend(this.parser.finish());
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parser_basic() {
        let mut parser = SseParser::new();
        let events = parser.feed("data: {\"choices\":[]}\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, None);
        assert_eq!(events[0].data, "{\"choices\":[]}");
    }

    #[test]
    fn test_parser_event_type_and_multiline_data() {
        let mut parser = SseParser::new();
        let events = parser.feed("event: delta\ndata: line one\ndata:line two\n\n");
        assert_eq!(events[0].event_type.as_deref(), Some("delta"));
        assert_eq!(events[0].data, "line one\nline two");
    }

    #[test]
    fn test_parser_chunked_and_crlf() {
        let mut parser = SseParser::new();
        assert!(parser.feed("data: {\"x\":").is_empty());
        let events = parser.feed("1}\r\n\r\ndata: [DONE]\r\n\r\n");
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].data, "{\"x\":1}");
        assert_eq!(events[1].data, "[DONE]");
    }

    #[test]
    fn test_parser_skips_comments() {
        let mut parser = SseParser::new();
        let events = parser.feed(": keep-alive\n\ndata: ok\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "ok");
    }

    #[test]
    fn test_parser_split_utf8_sequence() {
        let mut parser = SseParser::new();
        let bytes = "data: 25°C\n\n".as_bytes();
        // '°' is two bytes; split between them
        let split = bytes.iter().position(|b| *b == 0xC2).unwrap() + 1;
        assert!(parser.feed_bytes(&bytes[..split]).is_empty());
        let events = parser.feed_bytes(&bytes[split..]);
        assert_eq!(events[0].data, "25°C");
    }

    #[test]
    fn test_crlf_terminator_split_across_chunks() {
        let mut parser = SseParser::new();
        assert!(parser.feed("data: one\r\n\r").is_empty());
        let events = parser.feed("\ndata: two\r\n\r\n");
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].data, "one");
        assert_eq!(events[1].data, "two");
    }

    #[test]
    fn test_invalid_utf8_is_replaced_not_buffered() {
        let mut parser = SseParser::new();
        let first = parser.feed_bytes(b"data: a\xFFb\n\n");
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].data, "a\u{FFFD}b");

        let second = parser.feed_bytes(b"data: next\n\n");
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].data, "next");
        assert!(parser.finish().is_none());
    }

    #[test]
    fn test_finish_flushes_incomplete_utf8_tail() {
        let mut parser = SseParser::new();
        assert!(parser.feed_bytes(b"data: 25\xC2").is_empty());
        assert_eq!(parser.finish().unwrap().data, "25\u{FFFD}");
    }

    #[test]
    fn test_finish_flushes_unterminated_event() {
        let mut parser = SseParser::new();
        assert!(parser.feed("data: tail").is_empty());
        assert_eq!(parser.finish().unwrap().data, "tail");
        assert!(parser.finish().is_none());
    }
}
