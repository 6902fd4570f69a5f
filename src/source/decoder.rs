//! Incremental decoder over a dump's top-level JSON array.
//!
//! The decoder walks the array framing (`[`, `,`, `]`) over the reader's
//! buffer, copies each element's bytes into a reused scratch buffer, and
//! hands that slice to serde_json, so only one record is materialized at a
//! time. Elements must be objects; their end is found by brace depth, with
//! braces inside strings (and escaped quotes) ignored.

use std::io::{self, BufRead};

use serde::de::IgnoredAny;

use crate::errors::SearchError;
use crate::source::record::RawRecord;

const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum FrameState {
    /// Nothing consumed yet; the opening `[` is still ahead.
    Start,
    /// Inside the array, before the first element.
    First,
    /// Inside the array, after an element.
    Next,
    /// Closing `]` consumed (or a fatal error occurred).
    Done,
}

/// Forward-only record decoder over any buffered byte source.
///
/// Dropping the decoder drops the reader, which releases its file handle.
pub struct RecordDecoder<R> {
    reader: R,
    state: FrameState,
    records_read: u64,
    scratch: Vec<u8>,
}

/// Tracks where an object ends while its bytes stream past.
#[derive(Default)]
struct ObjectScan {
    depth: u32,
    in_string: bool,
    escaped: bool,
}

impl ObjectScan {
    /// Bytes of `buf` that belong to the object, and whether it closed.
    fn feed(&mut self, buf: &[u8]) -> (usize, bool) {
        for (pos, &byte) in buf.iter().enumerate() {
            if self.in_string {
                if self.escaped {
                    self.escaped = false;
                } else if byte == b'\\' {
                    self.escaped = true;
                } else if byte == b'"' {
                    self.in_string = false;
                }
                continue;
            }
            match byte {
                b'"' => self.in_string = true,
                b'{' => self.depth += 1,
                b'}' => {
                    self.depth = self.depth.saturating_sub(1);
                    if self.depth == 0 {
                        return (pos + 1, true);
                    }
                }
                _ => {}
            }
        }
        (buf.len(), false)
    }
}

impl<R: BufRead> RecordDecoder<R> {
    /// Create a decoder positioned before the first record.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            state: FrameState::Start,
            records_read: 0,
            scratch: Vec::new(),
        }
    }

    /// Number of records decoded or skipped so far.
    pub fn records_read(&self) -> u64 {
        self.records_read
    }

    /// True once the closing bracket has been consumed.
    pub fn is_finished(&self) -> bool {
        self.state == FrameState::Done
    }

    /// Decode the next record, or `None` at the end of the array.
    pub fn next_record(&mut self) -> Result<Option<RawRecord>, SearchError> {
        if !self.advance_to_element()? {
            return Ok(None);
        }
        let index = self.records_read;
        self.frame_object()?;
        let record = serde_json::from_slice::<RawRecord>(&self.scratch)
            .map_err(|err| self.fail(index, err))?;
        self.records_read += 1;
        self.state = FrameState::Next;
        Ok(Some(record))
    }

    /// Discard up to `count` records without building them.
    ///
    /// Returns how many were skipped; fewer than `count` means the array ended.
    pub fn skip_records(&mut self, count: u64) -> Result<u64, SearchError> {
        let mut skipped = 0;
        while skipped < count {
            if !self.advance_to_element()? {
                break;
            }
            let index = self.records_read;
            self.frame_object()?;
            serde_json::from_slice::<IgnoredAny>(&self.scratch)
                .map_err(|err| self.fail(index, err))?;
            self.records_read += 1;
            self.state = FrameState::Next;
            skipped += 1;
        }
        Ok(skipped)
    }

    /// Consume framing up to the start of the next element.
    ///
    /// Returns `false` once the array is closed.
    fn advance_to_element(&mut self) -> Result<bool, SearchError> {
        loop {
            match self.state {
                FrameState::Done => return Ok(false),
                FrameState::Start => {
                    self.skip_bom()?;
                    match self.next_non_whitespace()? {
                        Some(b'[') => {
                            self.reader.consume(1);
                            self.state = FrameState::First;
                        }
                        Some(other) => {
                            return Err(self.framing_error(format!(
                                "expected top-level array, found byte 0x{other:02x}"
                            )));
                        }
                        None => return Err(self.framing_error("empty input".to_string())),
                    }
                }
                FrameState::First => match self.next_non_whitespace()? {
                    Some(b']') => {
                        self.reader.consume(1);
                        self.state = FrameState::Done;
                    }
                    Some(_) => return self.expect_object_start(),
                    None => return Err(self.truncated()),
                },
                FrameState::Next => match self.next_non_whitespace()? {
                    Some(b',') => {
                        self.reader.consume(1);
                        match self.next_non_whitespace()? {
                            Some(b']') => {
                                return Err(self.framing_error(
                                    "trailing comma before end of array".to_string(),
                                ));
                            }
                            Some(_) => return self.expect_object_start(),
                            None => return Err(self.truncated()),
                        }
                    }
                    Some(b']') => {
                        self.reader.consume(1);
                        self.state = FrameState::Done;
                    }
                    Some(other) => {
                        return Err(self.framing_error(format!(
                            "expected ',' or ']' after record, found byte 0x{other:02x}"
                        )));
                    }
                    None => return Err(self.truncated()),
                },
            }
        }
    }

    /// Copy the object starting at the current `{` into `scratch`.
    fn frame_object(&mut self) -> Result<(), SearchError> {
        self.scratch.clear();
        let mut scan = ObjectScan::default();
        loop {
            let buf = match fill(&mut self.reader) {
                Ok(buf) => buf,
                Err(err) => {
                    self.state = FrameState::Done;
                    return Err(err);
                }
            };
            if buf.is_empty() {
                return Err(self.truncated());
            }
            let (used, closed) = scan.feed(buf);
            self.scratch.extend_from_slice(&buf[..used]);
            self.reader.consume(used);
            if closed {
                return Ok(());
            }
        }
    }

    fn expect_object_start(&mut self) -> Result<bool, SearchError> {
        match self.peek_byte()? {
            Some(b'{') => Ok(true),
            Some(other) => Err(self.framing_error(format!(
                "expected record object, found byte 0x{other:02x}"
            ))),
            None => Err(self.truncated()),
        }
    }

    fn skip_bom(&mut self) -> Result<(), SearchError> {
        let buf = self.fill_buf()?;
        if buf.starts_with(&UTF8_BOM) {
            self.reader.consume(UTF8_BOM.len());
        }
        Ok(())
    }

    fn next_non_whitespace(&mut self) -> Result<Option<u8>, SearchError> {
        loop {
            let buf = self.fill_buf()?;
            if buf.is_empty() {
                return Ok(None);
            }
            let skip = buf
                .iter()
                .take_while(|byte| byte.is_ascii_whitespace())
                .count();
            if skip < buf.len() {
                let byte = buf[skip];
                self.reader.consume(skip);
                return Ok(Some(byte));
            }
            let len = buf.len();
            self.reader.consume(len);
        }
    }

    fn peek_byte(&mut self) -> Result<Option<u8>, SearchError> {
        Ok(self.fill_buf()?.first().copied())
    }

    fn fill_buf(&mut self) -> Result<&[u8], SearchError> {
        fill(&mut self.reader)
    }

    fn fail(&mut self, index: u64, err: serde_json::Error) -> SearchError {
        self.state = FrameState::Done;
        if err.is_io() {
            return SearchError::Io(io::Error::from(err));
        }
        SearchError::Decode {
            record_index: index,
            reason: err.to_string(),
        }
    }

    fn framing_error(&mut self, reason: String) -> SearchError {
        self.state = FrameState::Done;
        SearchError::Decode {
            record_index: self.records_read,
            reason,
        }
    }

    fn truncated(&mut self) -> SearchError {
        self.framing_error("unexpected end of input inside top-level array".to_string())
    }
}

fn fill<R: BufRead>(reader: &mut R) -> Result<&[u8], SearchError> {
    loop {
        match reader.fill_buf() {
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            _ => break,
        }
    }
    reader.fill_buf().map_err(SearchError::Io)
}

impl<R: BufRead> Iterator for RecordDecoder<R> {
    type Item = Result<RawRecord, SearchError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufReader, Cursor};

    fn decoder(input: &str) -> RecordDecoder<Cursor<Vec<u8>>> {
        RecordDecoder::new(Cursor::new(input.as_bytes().to_vec()))
    }

    fn record(id: &str) -> String {
        format!(r#"{{"id":"{id}","type":"item","labels":{{"en":{{"language":"en","value":"{id} label"}}}}}}"#)
    }

    fn ids<R: BufRead>(decoder: RecordDecoder<R>) -> Vec<String> {
        decoder.map(|record| record.unwrap().id).collect()
    }

    #[test]
    fn decodes_records_in_file_order() {
        let input = format!("[\n{},\n{},\n{}\n]\n", record("Q1"), record("Q2"), record("Q3"));
        assert_eq!(ids(decoder(&input)), vec!["Q1", "Q2", "Q3"]);
    }

    #[test]
    fn empty_array_yields_nothing() {
        let mut decoder = decoder(" [ ] ");
        assert!(decoder.next_record().unwrap().is_none());
        assert!(decoder.is_finished());
        assert!(decoder.next_record().unwrap().is_none());
    }

    #[test]
    fn byte_order_mark_is_ignored() {
        let input = format!("\u{feff}[{}]", record("Q1"));
        assert_eq!(ids(decoder(&input)), vec!["Q1"]);
    }

    #[test]
    fn tiny_read_buffer_still_frames_records() {
        let input = format!("[{} , {}]", record("Q1"), record("Q2"));
        let reader = BufReader::with_capacity(1, Cursor::new(input.into_bytes()));
        assert_eq!(ids(RecordDecoder::new(reader)), vec!["Q1", "Q2"]);
    }

    #[test]
    fn braces_and_quotes_inside_strings_do_not_end_a_record() {
        let tricky = r#"{"id":"Q1","type":"item","labels":{"en":{"value":"} \"{ \\"}},"descriptions":{"en":{"value":"[{]}\\\\"}}}"#;
        let input = format!("[{tricky},{}]", record("Q2"));
        let mut decoder = decoder(&input);
        let first = decoder.next_record().unwrap().unwrap();
        assert_eq!(first.id, "Q1");
        assert_eq!(decoder.next_record().unwrap().unwrap().id, "Q2");
        assert!(decoder.next_record().unwrap().is_none());

        let reader = BufReader::with_capacity(1, Cursor::new(input.into_bytes()));
        let mut byte_at_a_time = RecordDecoder::new(reader);
        assert_eq!(byte_at_a_time.skip_records(1).unwrap(), 1);
        assert_eq!(byte_at_a_time.next_record().unwrap().unwrap().id, "Q2");
    }

    #[test]
    fn truncated_record_is_fatal() {
        let input = format!("[{},{{\"id\":\"Q2\",\"type\":\"item\"", record("Q1"));
        let mut decoder = decoder(&input);
        assert!(decoder.next_record().unwrap().is_some());
        assert!(matches!(
            decoder.next_record().unwrap_err(),
            SearchError::Decode { record_index: 1, .. }
        ));
        assert!(decoder.is_finished());
    }

    #[test]
    fn skip_records_discards_without_building() {
        let input = format!("[{},{},{}]", record("Q1"), record("Q2"), record("Q3"));
        let mut decoder = decoder(&input);
        assert_eq!(decoder.skip_records(2).unwrap(), 2);
        assert_eq!(decoder.records_read(), 2);
        assert_eq!(decoder.next_record().unwrap().unwrap().id, "Q3");
        assert_eq!(decoder.skip_records(5).unwrap(), 0);
    }

    #[test]
    fn skip_past_end_reports_short_count() {
        let input = format!("[{},{}]", record("Q1"), record("Q2"));
        let mut decoder = decoder(&input);
        assert_eq!(decoder.skip_records(10).unwrap(), 2);
        assert!(decoder.is_finished());
    }

    #[test]
    fn abandoning_early_is_not_an_error() {
        let input = format!("[{},{}", record("Q1"), record("Q2"));
        let mut decoder = decoder(&input);
        assert_eq!(decoder.next_record().unwrap().unwrap().id, "Q1");
        drop(decoder);
    }

    #[test]
    fn non_array_top_level_is_fatal() {
        let err = decoder(&record("Q1")).next_record().unwrap_err();
        assert!(matches!(err, SearchError::Decode { record_index: 0, ref reason } if reason.contains("top-level array")));
    }

    #[test]
    fn truncated_array_is_fatal() {
        let input = format!("[{}", record("Q1"));
        let mut decoder = decoder(&input);
        assert!(decoder.next_record().unwrap().is_some());
        let err = decoder.next_record().unwrap_err();
        assert!(matches!(err, SearchError::Decode { record_index: 1, .. }));
        assert!(decoder.next_record().unwrap().is_none());
    }

    #[test]
    fn malformed_record_is_fatal_and_stops_the_sequence() {
        let input = format!("[{},{{\"id\":\"Q2\",\"type\":}},{}]", record("Q1"), record("Q3"));
        let mut decoder = decoder(&input);
        assert!(decoder.next_record().unwrap().is_some());
        assert!(matches!(
            decoder.next_record().unwrap_err(),
            SearchError::Decode { record_index: 1, .. }
        ));
        assert!(decoder.next_record().unwrap().is_none());
    }

    #[test]
    fn trailing_comma_and_scalar_elements_are_rejected() {
        let input = format!("[{},]", record("Q1"));
        let mut trailing = decoder(&input);
        trailing.next_record().unwrap();
        assert!(trailing.next_record().is_err());

        assert!(decoder("[1, 2]").next_record().is_err());
    }
}
