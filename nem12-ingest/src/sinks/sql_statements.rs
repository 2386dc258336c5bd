use futures::StreamExt;
use nem12_client::{db::SqlEncode, MeterReading};
use tokio::{
    io::{AsyncWrite, AsyncWriteExt},
    sync::Mutex,
};

use crate::pipeline::{Envelope, PipelineError, Sink};

/// Writes one SQL insert statement per line to an async writer.
///
/// Statements are rendered into a buffer and written and flushed once per
/// batch. Rejected readings (transform errors) are logged and skipped; any
/// other upstream error aborts the run.
pub struct SqlStatementSink<W> {
    writer: Mutex<W>,
    batch_size: usize,
    preamble: Option<String>,
}

impl<W> SqlStatementSink<W> {
    pub fn new(writer: W, batch_size: usize) -> Self {
        Self {
            writer: Mutex::new(writer),
            batch_size: batch_size.max(1),
            preamble: None,
        }
    }

    /// Statement written once before the first reading, e.g. the table DDL.
    pub fn with_preamble(mut self, statement: impl Into<String>) -> Self {
        self.preamble = Some(statement.into());
        self
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

impl<W> SqlStatementSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    fn encode_batch<T: SqlEncode>(&self, batch: &[Envelope<T>]) -> Result<Vec<u8>, PipelineError> {
        // Heuristic capacity: ~110 bytes per statement.
        let mut s = String::with_capacity(batch.len().saturating_mul(110));
        for env in batch {
            env.payload.write_insert(&mut s).map_err(|e| {
                PipelineError::Sink(format!("failed to render reading {}: {e}", env.sequence))
            })?;
            s.push('\n');
        }
        Ok(s.into_bytes())
    }

    async fn write_all(&self, bytes: &[u8]) -> Result<(), PipelineError> {
        let mut writer = self.writer.lock().await;
        writer
            .write_all(bytes)
            .await
            .map_err(|e| PipelineError::Sink(format!("failed to write SQL statements: {e}")))?;
        writer
            .flush()
            .await
            .map_err(|e| PipelineError::Sink(format!("failed to flush SQL statements: {e}")))
    }

    async fn flush_batch(&self, batch: &[Envelope<MeterReading>]) -> Result<(), PipelineError> {
        if batch.is_empty() {
            return Ok(());
        }

        let written = match self.encode_batch(batch) {
            Ok(payload) => self.write_all(&payload).await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            tracing::error!(error = %e, "SQL statement sink write failed");
            metrics::counter!("sql_sink_errors_total").increment(1);
            return Err(e);
        }
        metrics::counter!("sql_statements_written_total").increment(batch.len() as u64);
        Ok(())
    }
}

#[async_trait::async_trait]
impl<W> Sink<MeterReading> for SqlStatementSink<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    async fn run<S>(&self, mut input: S) -> Result<u64, PipelineError>
    where
        S: futures::Stream<Item = Result<Envelope<MeterReading>, PipelineError>> + Send + Unpin + 'static,
    {
        if let Some(preamble) = &self.preamble {
            let mut line = preamble.clone();
            line.push('\n');
            self.write_all(line.as_bytes()).await?;
        }

        let mut buffer: Vec<Envelope<MeterReading>> = Vec::with_capacity(self.batch_size);
        let mut written: u64 = 0;
        let mut rejected: u64 = 0;

        while let Some(item) = input.next().await {
            let env = match item {
                Ok(env) => env,
                Err(e) if !e.is_fatal() => {
                    rejected += 1;
                    continue;
                }
                Err(e) => {
                    // Keep what was read before the failure.
                    self.flush_batch(&buffer).await?;
                    tracing::error!(error = %e, written = written + buffer.len() as u64, "aborting SQL statement sink");
                    return Err(e);
                }
            };

            buffer.push(env);
            if buffer.len() >= self.batch_size {
                self.flush_batch(&buffer).await?;
                written += buffer.len() as u64;
                buffer.clear();
            }
        }

        if !buffer.is_empty() {
            self.flush_batch(&buffer).await?;
            written += buffer.len() as u64;
        }

        tracing::info!(written, rejected, "SQL statements written");
        Ok(written)
    }
}
