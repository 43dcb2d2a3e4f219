//! Incremental decoder for `data: <payload>\n` record streams.
//!
//! Bytes are buffered until a full line is available, so records and
//! multi-byte UTF-8 sequences may be split across chunks arbitrarily.

use crate::types::StreamFrame;

/// Payload that ends the stream gracefully.
pub const STREAM_TERMINATOR: &str = "[DONE]";

/// Prefix of a record line.
pub const DATA_PREFIX: &str = "data:";

/// Longest line accepted before the partial line is discarded.
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

/// One decoded record.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    /// A well-formed frame.
    Frame(StreamFrame),
    /// The terminator token.
    Terminator,
    /// A record that could not be decoded; callers skip it.
    Malformed {
        /// The offending payload, lossily decoded.
        payload: String,
        /// Why it was rejected.
        error: String,
    },
}

/// Splits a byte stream into [`Record`]s.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buf: Vec<u8>,
    terminated: bool,
}

impl FrameDecoder {
    /// A decoder with an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the terminator has been seen. Later input is ignored.
    #[must_use]
    pub const fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Feeds a chunk and returns every record completed by it.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Record> {
        if self.terminated {
            return Vec::new();
        }
        self.buf.extend_from_slice(chunk);

        let mut records = Vec::new();
        while let Some(pos) = self.buf.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=pos).collect();
            self.decode_line(&line[..pos], &mut records);
            if self.terminated {
                self.buf.clear();
                return records;
            }
        }

        if self.buf.len() > MAX_LINE_BYTES {
            let dropped = std::mem::take(&mut self.buf);
            records.push(Record::Malformed {
                payload: String::from_utf8_lossy(&dropped[..64.min(dropped.len())]).into_owned(),
                error: format!("line exceeds {MAX_LINE_BYTES} bytes"),
            });
        }
        records
    }

    /// Flushes a final unterminated line at end of input.
    pub fn finish(&mut self) -> Vec<Record> {
        let mut records = Vec::new();
        if !self.terminated && !self.buf.is_empty() {
            let line = std::mem::take(&mut self.buf);
            self.decode_line(&line, &mut records);
        }
        records
    }

    fn decode_line(&mut self, raw: &[u8], out: &mut Vec<Record>) {
        let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
        let line = match std::str::from_utf8(raw) {
            Ok(line) => line,
            Err(e) => {
                out.push(Record::Malformed {
                    payload: String::from_utf8_lossy(raw).into_owned(),
                    error: e.to_string(),
                });
                return;
            }
        };

        if line.trim().is_empty() || line.starts_with(':') {
            return;
        }
        let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
            // Other SSE fields (event:, id:, retry:) carry nothing we use.
            return;
        };
        let payload = payload.trim();

        if payload == STREAM_TERMINATOR {
            self.terminated = true;
            out.push(Record::Terminator);
            return;
        }

        out.push(match serde_json::from_str::<StreamFrame>(payload) {
            Ok(frame) => Record::Frame(frame),
            Err(e) => Record::Malformed {
                payload: payload.to_string(),
                error: e.to_string(),
            },
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content(text: &str) -> Record {
        Record::Frame(StreamFrame::Content { text: text.into() })
    }

    #[test]
    fn decodes_complete_records() {
        let mut decoder = FrameDecoder::new();
        let records = decoder.push(
            b"data: {\"kind\":\"content\",\"text\":\"Hello \"}\ndata: {\"kind\":\"done\"}\n",
        );
        assert_eq!(records, vec![content("Hello "), Record::Frame(StreamFrame::Done)]);
    }

    #[test]
    fn records_split_across_chunks() {
        let mut decoder = FrameDecoder::new();
        assert!(decoder.push(b"data: {\"kind\":\"con").is_empty());
        assert!(decoder.push(b"tent\",\"text\":\"wor").is_empty());
        assert_eq!(decoder.push(b"ld\"}\n"), vec![content("world")]);
    }

    #[test]
    fn multibyte_characters_split_across_chunks() {
        let line = "data: {\"kind\":\"content\",\"text\":\"caf\u{e9} \u{1f600}\"}\n".as_bytes();
        let split = line.len() - 5; // inside the emoji
        let mut decoder = FrameDecoder::new();
        assert!(decoder.push(&line[..split]).is_empty());
        assert_eq!(decoder.push(&line[split..]), vec![content("caf\u{e9} \u{1f600}")]);
    }

    #[test]
    fn crlf_blank_lines_and_comments_are_tolerated() {
        let mut decoder = FrameDecoder::new();
        let records = decoder.push(b": keep-alive\r\n\r\nevent: message\r\ndata: {\"kind\":\"content\",\"text\":\"x\"}\r\n");
        assert_eq!(records, vec![content("x")]);
    }

    #[test]
    fn malformed_record_does_not_stop_decoding() {
        let mut decoder = FrameDecoder::new();
        let records = decoder.push(b"data: {not json\ndata: {\"kind\":\"content\",\"text\":\"ok\"}\n");
        assert_eq!(records.len(), 2);
        assert!(matches!(&records[0], Record::Malformed { payload, .. } if payload == "{not json"));
        assert_eq!(records[1], content("ok"));
    }

    #[test]
    fn terminator_ends_decoding() {
        let mut decoder = FrameDecoder::new();
        let records = decoder.push(b"data: [DONE]\ndata: {\"kind\":\"content\",\"text\":\"late\"}\n");
        assert_eq!(records, vec![Record::Terminator]);
        assert!(decoder.is_terminated());
        assert!(decoder.push(b"data: {\"kind\":\"done\"}\n").is_empty());
        assert!(decoder.finish().is_empty());
    }

    #[test]
    fn final_unterminated_line_is_flushed() {
        let mut decoder = FrameDecoder::new();
        assert!(decoder.push(b"data: {\"kind\":\"content\",\"text\":\"tail\"}").is_empty());
        assert_eq!(decoder.finish(), vec![content("tail")]);
        assert!(decoder.finish().is_empty());
    }

    #[test]
    fn oversized_line_is_dropped() {
        let mut decoder = FrameDecoder::new();
        let records = decoder.push(&vec![b'x'; MAX_LINE_BYTES + 1]);
        assert!(matches!(records.as_slice(), [Record::Malformed { .. }]));
        assert_eq!(decoder.push(b"data: {\"kind\":\"done\"}\n"), vec![Record::Frame(StreamFrame::Done)]);
    }
}
