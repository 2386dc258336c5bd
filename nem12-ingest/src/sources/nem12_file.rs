use std::{fs::File, io::BufReader, path::PathBuf};

use futures::StreamExt;
use nem12_client::{MeterReading, Nem12Parser};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::pipeline::{Envelope, EnvelopeStream, PipelineError, Source};

/// NEM12 file source for `MeterReading`.
///
/// The parser is blocking, so it runs on the blocking pool and hands readings
/// over a bounded channel. With the default capacity of 1 there is at most one
/// reading in flight. Dropping the stream stops the producer, which then drops
/// (and closes) the file.
pub struct Nem12FileSource {
    path: PathBuf,
    channel_capacity: usize,
}

impl Nem12FileSource {
    pub fn new<P: Into<PathBuf>>(path: P, channel_capacity: usize) -> Self {
        Self {
            path: path.into(),
            channel_capacity: channel_capacity.max(1),
        }
    }
}

// Returns the number of items handed to the consumer.
fn produce(path: PathBuf, tx: mpsc::Sender<Result<Envelope<MeterReading>, PipelineError>>) -> u64 {
    let file = match File::open(&path) {
        Ok(f) => f,
        Err(e) => {
            let err = PipelineError::Source(format!("failed to open NEM12 file {}: {e}", path.display()));
            return u64::from(tx.blocking_send(Err(err)).is_ok());
        }
    };

    let mut sequence: u64 = 0;
    for item in Nem12Parser::new(BufReader::new(file)) {
        let msg = match item {
            Ok(reading) => {
                metrics::counter!("nem12_readings_parsed_total").increment(1);
                Ok(Envelope::new(reading, sequence))
            }
            Err(e) => {
                metrics::counter!("nem12_parse_errors_total").increment(1);
                tracing::error!(error = %e, file = %path.display(), after = sequence, "NEM12 parse failed");
                Err(PipelineError::Parse(e))
            }
        };
        if tx.blocking_send(msg).is_err() {
            tracing::debug!(file = %path.display(), sent = sequence, "NEM12 consumer went away, stopping");
            return sequence;
        }
        sequence += 1;
    }

    tracing::info!(file = %path.display(), readings = sequence, "NEM12 file parsed");
    sequence
}

#[async_trait::async_trait]
impl Source<MeterReading> for Nem12FileSource {
    async fn stream(&self) -> EnvelopeStream<MeterReading> {
        let (tx, rx) = mpsc::channel(self.channel_capacity);
        let path = self.path.clone();

        let handle = tokio::task::spawn_blocking(move || produce(path, tx));

        // A panicking producer closes the channel; surface it instead of a clean end.
        let tail = futures::stream::once(async move {
            match handle.await {
                Ok(_) => None,
                Err(e) => Some(Err(PipelineError::Source(format!("NEM12 reader task failed: {e}")))),
            }
        })
        .filter_map(futures::future::ready);

        Box::pin(ReceiverStream::new(rx).chain(tail))
    }
}
