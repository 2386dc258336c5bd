use std::{io, str::FromStr};

use bigdecimal::BigDecimal;
use csv::{ReaderBuilder, StringRecord, Trim};
use time::{macros::format_description, Date};

use super::ParserError;

/// Flat, forward-only token stream over comma separated lines.
///
/// Only the current physical line is held in memory. Tokens keep flowing into
/// the next line when a record runs short, so `skip_to_line_end` is the only
/// place where line boundaries matter.
pub struct Tokenizer<R> {
    reader: csv::Reader<R>,
    record: StringRecord,
    cursor: usize,
    exhausted: bool,
}

impl<R: io::Read> Tokenizer<R> {
    pub fn new(input: R) -> Self {
        let reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(input);

        Self {
            reader,
            record: StringRecord::new(),
            cursor: 0,
            exhausted: false,
        }
    }

    /// Line number of the most recently loaded line (1-based, 0 before any read).
    pub fn line(&self) -> u64 {
        self.record.position().map(|p| p.line()).unwrap_or(0)
    }

    // Loads lines until one with an unconsumed field is current.
    fn fill(&mut self) -> Result<bool, ParserError> {
        while self.cursor >= self.record.len() {
            if self.exhausted {
                return Ok(false);
            }
            if !self.reader.read_record(&mut self.record)? {
                self.exhausted = true;
                self.record.clear();
                self.cursor = 0;
                return Ok(false);
            }
            self.cursor = 0;
        }
        Ok(true)
    }

    pub fn has_more(&mut self) -> Result<bool, ParserError> {
        self.fill()
    }

    // Index of the next field within the current line, after loading it.
    fn advance(&mut self) -> Result<usize, ParserError> {
        if !self.fill()? {
            return Err(ParserError::EndOfInput);
        }
        let idx = self.cursor;
        self.cursor += 1;
        Ok(idx)
    }

    fn next_field(&mut self) -> Result<&str, ParserError> {
        let idx = self.advance()?;
        Ok(&self.record[idx])
    }

    fn malformed(&self, idx: usize, expected: &'static str) -> ParserError {
        ParserError::MalformedToken {
            expected,
            token: self.record[idx].to_owned(),
            line: self.line(),
        }
    }

    pub fn next_string(&mut self) -> Result<String, ParserError> {
        self.next_field().map(str::to_owned)
    }

    pub fn skip_field(&mut self) -> Result<(), ParserError> {
        self.next_field().map(|_| ())
    }

    pub fn next_int(&mut self) -> Result<i64, ParserError> {
        self.next_parsed("integer")
    }

    /// Parses the next field as an exact decimal, preserving its scale.
    pub fn next_decimal(&mut self) -> Result<BigDecimal, ParserError> {
        self.next_parsed("decimal")
    }

    /// Parses the next field as a `yyyymmdd` date.
    pub fn next_date(&mut self) -> Result<Date, ParserError> {
        let idx = self.advance()?;
        Date::parse(&self.record[idx], format_description!("[year][month][day]"))
            .map_err(|_| self.malformed(idx, "date (yyyymmdd)"))
    }

    fn next_parsed<T: FromStr>(&mut self, expected: &'static str) -> Result<T, ParserError> {
        let idx = self.advance()?;
        self.record[idx].parse().map_err(|_| self.malformed(idx, expected))
    }

    /// Drops whatever is left of the current line. A no-op at a line boundary.
    pub fn skip_to_line_end(&mut self) {
        self.cursor = self.record.len();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn tokens_flow_across_lines() {
        let mut t = Tokenizer::new("a,b\nc\n".as_bytes());
        assert_eq!(t.next_string().unwrap(), "a");
        assert_eq!(t.next_string().unwrap(), "b");
        assert_eq!(t.next_string().unwrap(), "c");
        assert!(!t.has_more().unwrap());
        assert!(matches!(t.next_string(), Err(ParserError::EndOfInput)));
    }

    #[test]
    fn skip_to_line_end_discards_rest_of_line_only() {
        let mut t = Tokenizer::new("1,2,3\n4,5\n".as_bytes());
        assert_eq!(t.next_int().unwrap(), 1);
        t.skip_to_line_end();
        t.skip_to_line_end();
        assert_eq!(t.next_int().unwrap(), 4);
        assert_eq!(t.next_int().unwrap(), 5);
        // Already at the boundary: the next line must survive.
        t.skip_to_line_end();
        assert!(!t.has_more().unwrap());
    }

    #[test]
    fn skip_at_boundary_keeps_following_line() {
        let mut t = Tokenizer::new("1\n2\n".as_bytes());
        assert_eq!(t.next_int().unwrap(), 1);
        t.skip_to_line_end();
        assert_eq!(t.next_int().unwrap(), 2);
    }

    #[test]
    fn blank_lines_and_crlf_are_tolerated() {
        let mut t = Tokenizer::new("100,x\r\n\r\n200,y\r\n".as_bytes());
        assert_eq!(t.next_int().unwrap(), 100);
        assert_eq!(t.next_string().unwrap(), "x");
        assert_eq!(t.next_int().unwrap(), 200);
        assert_eq!(t.next_string().unwrap(), "y");
        assert!(!t.has_more().unwrap());
    }

    #[test]
    fn typed_tokens() {
        let mut t = Tokenizer::new("20050301,0.460,abc\n".as_bytes());
        assert_eq!(t.next_date().unwrap(), date!(2005 - 03 - 01));
        assert_eq!(t.next_decimal().unwrap().to_string(), "0.460");
        match t.next_int() {
            Err(ParserError::MalformedToken { token, line, .. }) => {
                assert_eq!(token, "abc");
                assert_eq!(line, 1);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn malformed_token_reports_the_line_it_came_from() {
        let mut t = Tokenizer::new("1,2\n\nabc,4\n".as_bytes());
        assert_eq!(t.next_int().unwrap(), 1);
        assert_eq!(t.next_int().unwrap(), 2);
        match t.next_decimal() {
            Err(ParserError::MalformedToken { token, line, .. }) => {
                assert_eq!(token, "abc");
                assert_eq!(line, 3);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn rejects_invalid_date() {
        let mut t = Tokenizer::new("20051301\n".as_bytes());
        assert!(matches!(t.next_date(), Err(ParserError::MalformedToken { .. })));
    }
}
