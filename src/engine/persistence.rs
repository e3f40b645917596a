use crate::core::{ChannelSet, DaqError, DaqResult};
use crate::engine::BlockConsumer;
use crate::observability::{PipelineMetrics, PipelineMonitor};
use crate::storage::CsvSink;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistenceReport {
    /// Rows appended by this consumer, one per sample index
    pub rows_written: u64,
    pub blocks_written: u64,
    /// Sink size on disk when the consumer finished
    pub sink_bytes: u64,
}

/// Consumer side of the pipeline: drains the sample channel into a CSV sink.
///
/// Runs until every producer handle is gone and the queue is empty, so
/// blocks queued before a stop are still written.
pub struct PersistenceConsumer {
    sink: CsvSink,
    consumer: BlockConsumer,
    metrics: Arc<PipelineMetrics>,
}

impl PersistenceConsumer {
    pub fn open(
        path: impl AsRef<Path>,
        channels: &ChannelSet,
        sampling_rate_hz: u32,
        consumer: BlockConsumer,
    ) -> DaqResult<Self> {
        Ok(Self {
            sink: CsvSink::open(path, channels, sampling_rate_hz)?,
            consumer,
            metrics: Arc::new(PipelineMetrics::new()),
        })
    }

    pub fn with_metrics(mut self, metrics: Arc<PipelineMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn run(mut self) -> DaqResult<PersistenceReport> {
        let monitor = PipelineMonitor::new(self.metrics.clone());
        let mut report = PersistenceReport::default();

        loop {
            let block = match self.consumer.get() {
                Ok(block) => block,
                Err(DaqError::ChannelClosed) => break,
                Err(e) => return Err(e),
            };

            let rows = self.sink.append_block(&block).inspect_err(|e| {
                log::error!("Writing to '{}' failed: {}", self.sink.path().display(), e);
            })?;
            let size = self.sink.size_bytes()?;

            report.rows_written += rows as u64;
            report.blocks_written += 1;
            self.metrics.record_block_persisted(rows, size);
            log::info!("{}", monitor.progress_line());
        }

        report.sink_bytes = self.sink.finish()?;
        log::info!(
            "Persistence finished: {} rows in {} blocks",
            report.rows_written,
            report.blocks_written
        );
        Ok(report)
    }
}
