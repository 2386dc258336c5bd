// Record indicator codes for NEM12 files
pub const NMI_DATA_DETAILS: i64 = 200;
pub const INTERVAL_DATA: i64 = 300;
pub const END_OF_DATA: i64 = 900;

/// Record type, keyed by the leading indicator of each line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordType {
    NmiDataDetails,
    IntervalData,
    EndOfData,
    /// Header, footer and metadata records (100, 400, 500, ...) that carry no readings.
    Other(i64),
}

impl From<i64> for RecordType {
    fn from(code: i64) -> Self {
        match code {
            NMI_DATA_DETAILS => Self::NmiDataDetails,
            INTERVAL_DATA => Self::IntervalData,
            END_OF_DATA => Self::EndOfData,
            other => Self::Other(other),
        }
    }
}

impl RecordType {
    pub fn code(self) -> i64 {
        match self {
            Self::NmiDataDetails => NMI_DATA_DETAILS,
            Self::IntervalData => INTERVAL_DATA,
            Self::EndOfData => END_OF_DATA,
            Self::Other(code) => code,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_codes_map_to_record_types() {
        assert_eq!(RecordType::from(200), RecordType::NmiDataDetails);
        assert_eq!(RecordType::from(300), RecordType::IntervalData);
        assert_eq!(RecordType::from(900), RecordType::EndOfData);
        assert_eq!(RecordType::from(100), RecordType::Other(100));
        assert_eq!(RecordType::from(500).code(), 500);
        assert_eq!(RecordType::IntervalData.code(), 300);
    }
}
