use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParserError {
    /// No reading (or token) remains. This is the normal way a parse ends.
    #[error("end of input")]
    EndOfInput,

    #[error("malformed token on line {line}: expected {expected}, found '{token}'")]
    MalformedToken {
        expected: &'static str,
        token: String,
        line: u64,
    },

    #[error("interval data record found before any NMI data details record")]
    MissingMeterContext,

    #[error("interval length of {minutes} minutes does not evenly divide a day")]
    InvalidInterval { minutes: i64 },

    #[error("record {code} cut off by the end of input")]
    TruncatedRecord { code: i64 },

    #[error("interval timestamp is out of the supported date range")]
    TimestampOutOfRange,

    #[error("failed to read NEM12 input: {0}")]
    Read(#[from] csv::Error),
}

impl ParserError {
    pub fn is_end_of_input(&self) -> bool {
        matches!(self, Self::EndOfInput)
    }

    /// Running out of tokens halfway through a record is a truncated record,
    /// not a clean end of input.
    pub(crate) fn within_record(self, code: i64) -> Self {
        match self {
            Self::EndOfInput => Self::TruncatedRecord { code },
            other => other,
        }
    }
}
