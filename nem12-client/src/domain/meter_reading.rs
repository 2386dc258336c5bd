use std::sync::Arc;

use bigdecimal::BigDecimal;
use time::PrimitiveDateTime;

/// A single interval reading from a meter.
///
/// `timestamp` is a naive local date-time marking the *end* of the measured
/// interval, so the last reading of a day sits on midnight of the next day.
/// `consumption` keeps the scale of the source token (`0.460` stays `0.460`).
/// Readings expanded from the same 200 record share one `nmi` allocation.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MeterReading {
    pub nmi: Arc<str>,
    pub timestamp: PrimitiveDateTime,
    pub consumption: BigDecimal,
}

impl MeterReading {
    pub fn new(nmi: impl Into<Arc<str>>, timestamp: PrimitiveDateTime, consumption: BigDecimal) -> Self {
        Self {
            nmi: nmi.into(),
            timestamp,
            consumption,
        }
    }
}
