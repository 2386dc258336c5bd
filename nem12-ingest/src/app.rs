use std::{path::PathBuf, sync::Arc};

use nem12_client::{db::CREATE_METER_READINGS_TABLE, MeterReading};
use tokio::io::AsyncWrite;

use crate::{
    config::AppConfig,
    pipeline::{Pipeline, PipelineError, Transform},
    sinks::SqlStatementSink,
    sources::Nem12FileSource,
    transform::MeterReadingValidation,
};

/// Converts one NEM12 file into SQL statements on `writer`, assembled from
/// `cfg`. Returns the number of insert statements written.
pub async fn run_file<W>(cfg: &AppConfig, path: impl Into<PathBuf>, writer: W) -> Result<u64, PipelineError>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let source = Nem12FileSource::new(path, cfg.source.channel_capacity);

    let mut sink = SqlStatementSink::new(writer, cfg.sink.batch_size);
    if cfg.sink.emit_create_table {
        sink = sink.with_preamble(CREATE_METER_READINGS_TABLE);
    }

    let mut transforms: Vec<Arc<dyn Transform<MeterReading, MeterReading> + Send + Sync>> = Vec::new();
    if cfg.validation.enabled {
        transforms.push(Arc::new(MeterReadingValidation::default()));
    }

    let pipeline: Pipeline<_, MeterReading, _> = Pipeline {
        source,
        transforms,
        sink,
    };
    pipeline.run().await
}
