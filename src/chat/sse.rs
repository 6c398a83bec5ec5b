//! Incremental SSE parser for the Gemini streaming endpoint.
//!
//! `streamGenerateContent?alt=sse` responses are a plain sequence of
//! `data: {json}` lines separated by blank lines; there are no `event:` or
//! `id:` fields and no `[DONE]` sentinel. The parser therefore only has to
//! extract `data:` payloads, tolerate payloads split across network chunks,
//! and strip `\r\n` line endings.

/// Line-buffered extractor of SSE `data:` payloads.
///
/// Lines are buffered as raw bytes so multi-byte characters split across
/// network chunks survive intact; UTF-8 decoding happens per complete line.
#[derive(Debug, Default)]
pub struct SseDataParser {
    line_buffer: Vec<u8>,
}

impl SseDataParser {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds a chunk of bytes, returning any complete `data:` payloads.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut payloads = Vec::new();

        for &byte in chunk {
            if byte == b'\n' {
                let line = std::mem::take(&mut self.line_buffer);
                let line = String::from_utf8_lossy(&line);
                if let Some(payload) = data_payload(&line) {
                    payloads.push(payload.to_owned());
                }
            } else {
                self.line_buffer.push(byte);
            }
        }

        payloads
    }

    /// Flushes a trailing payload when the stream ends without a newline.
    pub fn flush(&mut self) -> Option<String> {
        let line = std::mem::take(&mut self.line_buffer);
        let line = String::from_utf8_lossy(&line);
        data_payload(&line).map(str::to_owned)
    }
}

/// Extracts the payload from a `data:` line, or `None` for anything else
/// (blank separators, comments, unknown fields).
fn data_payload(line: &str) -> Option<&str> {
    let line = line.strip_suffix('\r').unwrap_or(line);
    let value = line.strip_prefix("data:")?;
    let value = value.strip_prefix(' ').unwrap_or(value);
    if value.is_empty() { None } else { Some(value) }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    #[test]
    fn single_payload() {
        let mut parser = SseDataParser::new();
        let payloads = parser.push(b"data: {\"a\":1}\n\n");
        assert_eq!(payloads, vec!["{\"a\":1}"]);
    }

    #[test]
    fn payload_split_across_chunks() {
        let mut parser = SseDataParser::new();
        assert!(parser.push(b"data: {\"text\":\"Hel").is_empty());
        let payloads = parser.push(b"lo\"}\n\n");
        assert_eq!(payloads, vec!["{\"text\":\"Hello\"}"]);
    }

    #[test]
    fn multiple_payloads_in_one_chunk() {
        let mut parser = SseDataParser::new();
        let payloads = parser.push(b"data: one\n\ndata: two\n\n");
        assert_eq!(payloads, vec!["one", "two"]);
    }

    #[test]
    fn crlf_lines() {
        let mut parser = SseDataParser::new();
        let payloads = parser.push(b"data: hello\r\n\r\n");
        assert_eq!(payloads, vec!["hello"]);
    }

    #[test]
    fn no_space_after_colon() {
        let mut parser = SseDataParser::new();
        let payloads = parser.push(b"data:tight\n");
        assert_eq!(payloads, vec!["tight"]);
    }

    #[test]
    fn comments_and_unknown_fields_ignored() {
        let mut parser = SseDataParser::new();
        let payloads = parser.push(b": keepalive\nretry: 5000\ndata: real\n");
        assert_eq!(payloads, vec!["real"]);
    }

    #[test]
    fn flush_emits_trailing_payload() {
        let mut parser = SseDataParser::new();
        assert!(parser.push(b"data: trailing").is_empty());
        assert_eq!(parser.flush().as_deref(), Some("trailing"));
        assert!(parser.flush().is_none());
    }

    #[test]
    fn multibyte_character_split_across_chunks() {
        let bytes = "data: {\"t\":\"🎸\"}\n".as_bytes();
        let mut parser = SseDataParser::new();
        // Split inside the guitar emoji's UTF-8 sequence.
        assert!(parser.push(&bytes[..14]).is_empty());
        let payloads = parser.push(&bytes[14..]);
        assert_eq!(payloads, vec!["{\"t\":\"🎸\"}"]);
    }

    #[test]
    fn empty_data_line_yields_nothing() {
        let mut parser = SseDataParser::new();
        assert!(parser.push(b"data:\n").is_empty());
    }
}
