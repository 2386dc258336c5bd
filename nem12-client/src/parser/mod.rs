//! Streaming NEM12 parser.
//!
//! Walks NMI data details records (200) and interval data records (300) and
//! yields one [`MeterReading`] per interval value. Readings are produced one
//! at a time from a resumable state, so memory stays bounded by a single line
//! no matter how many meters and days the input holds.

use std::{io, iter::FusedIterator, sync::Arc};

use time::{Duration, PrimitiveDateTime};
use tracing::{debug, trace};

use crate::domain::MeterReading;

pub mod error;
pub mod record;
pub mod tokenizer;

pub use error::ParserError;
pub use record::RecordType;
pub use tokenizer::Tokenizer;

/// Number of minutes in a day
pub const MINUTES_PER_DAY: i64 = 24 * 60;

/// Fields between the NMI and the interval length of a 200 record: NMI
/// configuration, register id, NMI suffix, MDM datastream id, meter serial
/// number and unit of measure.
pub const NMI_DETAILS_SKIPPED_FIELDS: usize = 6;

/// Context established by the most recent 200 record.
#[derive(Debug, Default)]
struct ParserState {
    active_nmi: Option<Arc<str>>,
    active_interval_minutes: Option<i64>,
}

/// Expansion progress through one 300 record.
#[derive(Debug)]
struct IntervalRun {
    nmi: Arc<str>,
    day_start: PrimitiveDateTime,
    interval_minutes: i64,
    index: i64,
    count: i64,
}

impl IntervalRun {
    // Reading `i` (1-based) covers the interval ending `i * interval` after midnight.
    fn timestamp_at(&self, i: i64) -> Result<PrimitiveDateTime, ParserError> {
        self.day_start
            .checked_add(Duration::minutes(self.interval_minutes * i))
            .ok_or(ParserError::TimestampOutOfRange)
    }
}

/// Parses a NEM12 byte source into meter readings.
///
/// The source is only read forward and never closed here; whoever owns it
/// releases it, whether iteration finished, failed or was abandoned.
///
/// After a fatal error the parser is exhausted: the iterator yields `None` and
/// [`Nem12Parser::next_reading`] returns [`ParserError::EndOfInput`].
pub struct Nem12Parser<R> {
    tokens: Tokenizer<R>,
    state: ParserState,
    run: Option<IntervalRun>,
    peeked: Option<MeterReading>,
    done: bool,
}

impl<R: io::Read> Nem12Parser<R> {
    pub fn new(input: R) -> Self {
        Self {
            tokens: Tokenizer::new(input),
            state: ParserState::default(),
            run: None,
            peeked: None,
            done: false,
        }
    }

    /// Indicates whether another reading is available.
    ///
    /// This computes (and holds on to) the next reading, so a malformed record
    /// surfaces here rather than in the following `next_reading` call.
    pub fn has_next(&mut self) -> Result<bool, ParserError> {
        if self.peeked.is_some() {
            return Ok(true);
        }
        match self.produce() {
            Ok(reading) => {
                self.peeked = Some(reading);
                Ok(true)
            }
            Err(ParserError::EndOfInput) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Returns the next reading, or [`ParserError::EndOfInput`] when none remain.
    pub fn next_reading(&mut self) -> Result<MeterReading, ParserError> {
        match self.peeked.take() {
            Some(reading) => Ok(reading),
            None => self.produce(),
        }
    }

    fn produce(&mut self) -> Result<MeterReading, ParserError> {
        if self.done {
            return Err(ParserError::EndOfInput);
        }
        let res = self.step();
        if res.is_err() {
            self.done = true;
            self.run = None;
        }
        res
    }

    fn step(&mut self) -> Result<MeterReading, ParserError> {
        loop {
            if let Some(run) = self.run.as_mut() {
                run.index += 1;
                let consumption = self
                    .tokens
                    .next_decimal()
                    .map_err(|e| e.within_record(record::INTERVAL_DATA))?;
                let timestamp = run.timestamp_at(run.index)?;
                let reading = MeterReading::new(Arc::clone(&run.nmi), timestamp, consumption);

                if run.index == run.count {
                    // Quality method, reason codes and timestamps trail the values.
                    self.tokens.skip_to_line_end();
                    self.run = None;
                }
                return Ok(reading);
            }

            self.advance_to_interval_data()?;
        }
    }

    /// Consumes records until a 300 record is opened. The next token is then
    /// its first consumption value.
    fn advance_to_interval_data(&mut self) -> Result<(), ParserError> {
        loop {
            if !self.tokens.has_more()? {
                return Err(ParserError::EndOfInput);
            }

            match RecordType::from(self.tokens.next_int()?) {
                RecordType::NmiDataDetails => {
                    self.read_nmi_details()
                        .map_err(|e| e.within_record(record::NMI_DATA_DETAILS))?;
                }
                RecordType::IntervalData => {
                    let run = self
                        .begin_interval_data()
                        .map_err(|e| e.within_record(record::INTERVAL_DATA))?;
                    self.run = Some(run);
                    return Ok(());
                }
                RecordType::EndOfData => {
                    debug!(line = self.tokens.line(), "end of data record reached");
                    return Err(ParserError::EndOfInput);
                }
                RecordType::Other(code) => {
                    trace!(code, line = self.tokens.line(), "skipping record");
                    self.tokens.skip_to_line_end();
                }
            }
        }
    }

    fn read_nmi_details(&mut self) -> Result<(), ParserError> {
        let line = self.tokens.line();
        let nmi = self.tokens.next_string()?;
        if nmi.is_empty() {
            return Err(ParserError::MalformedToken {
                expected: "NMI",
                token: nmi,
                line,
            });
        }
        for _ in 0..NMI_DETAILS_SKIPPED_FIELDS {
            self.tokens.skip_field()?;
        }
        let interval = self.tokens.next_int()?;
        self.tokens.skip_to_line_end();

        debug!(nmi = %nmi, interval_minutes = interval, line, "NMI data details record");
        self.state.active_nmi = Some(nmi.into());
        self.state.active_interval_minutes = Some(interval);
        Ok(())
    }

    fn begin_interval_data(&mut self) -> Result<IntervalRun, ParserError> {
        let date = self.tokens.next_date()?;

        let (Some(nmi), Some(interval)) = (&self.state.active_nmi, self.state.active_interval_minutes) else {
            return Err(ParserError::MissingMeterContext);
        };
        if interval <= 0 || MINUTES_PER_DAY % interval != 0 {
            return Err(ParserError::InvalidInterval { minutes: interval });
        }

        Ok(IntervalRun {
            nmi: Arc::clone(nmi),
            day_start: date.midnight(),
            interval_minutes: interval,
            index: 0,
            count: MINUTES_PER_DAY / interval,
        })
    }
}

impl<R: io::Read> Iterator for Nem12Parser<R> {
    type Item = Result<MeterReading, ParserError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_reading() {
            Err(ParserError::EndOfInput) => None,
            other => Some(other),
        }
    }
}

impl<R: io::Read> FusedIterator for Nem12Parser<R> {}
