use bigdecimal::{BigDecimal, Zero};
use nem12_client::MeterReading;
use time::macros::datetime;

use crate::pipeline::{Envelope, PipelineError, Transform};

/// NMIs are ten characters; the target column is sized accordingly.
pub const MAX_NMI_LEN: usize = 10;

/// Pure validation of a `MeterReading` record.
///
/// Rules:
/// - NMI must be non-empty and at most 10 characters.
/// - consumption must be non-negative.
/// - timestamp must be within a broad sanity window [2000-01-01, 2100-01-01].
pub fn validate_meter_reading(env: Envelope<MeterReading>) -> Result<Envelope<MeterReading>, PipelineError> {
    let m = &env.payload;

    if m.nmi.is_empty() || m.nmi.chars().count() > MAX_NMI_LEN {
        return Err(PipelineError::Transform(format!(
            "nmi '{}' must be 1 to {MAX_NMI_LEN} characters",
            m.nmi
        )));
    }

    if m.consumption < BigDecimal::zero() {
        return Err(PipelineError::Transform("consumption must be non-negative".to_string()));
    }

    let min_ts = datetime!(2000-01-01 00:00:00);
    let max_ts = datetime!(2100-01-01 00:00:00);

    if m.timestamp < min_ts || m.timestamp > max_ts {
        return Err(PipelineError::Transform("timestamp out of allowed range".to_string()));
    }

    Ok(env)
}

#[derive(Clone, Default)]
pub struct MeterReadingValidation;

#[async_trait::async_trait]
impl Transform<MeterReading, MeterReading> for MeterReadingValidation {
    async fn apply(
        &self,
        input: Envelope<MeterReading>,
    ) -> Result<Envelope<MeterReading>, PipelineError> {
        let sequence = input.sequence;
        match validate_meter_reading(input) {
            Ok(env) => Ok(env),
            Err(e) => {
                metrics::counter!("validation_meter_reading_rejected_total").increment(1);
                tracing::warn!(error = %e, sequence, "meter reading rejected");
                Err(e)
            }
        }
    }
}
