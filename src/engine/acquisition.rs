use crate::core::{AcquisitionConfig, DaqResult};
use crate::engine::{AcquisitionState, BlockProducer, CancellationToken};
use crate::hal::{AcquisitionSource, ManagedSource, ReadRequest, SourceSettings};
use crate::observability::PipelineMetrics;
use crate::visualization::LiveMonitor;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Pause between availability polls while the driver buffer is empty
pub const DEFAULT_IDLE_BACKOFF: Duration = Duration::from_micros(500);

/// What one acquisition run delivered to the sample channel
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcquisitionReport {
    pub blocks: u64,
    pub samples_per_channel: u64,
}

/// Producer side of the pipeline.
///
/// Owns the hardware task for its whole life: configure, start, then
/// read-and-put until the token asks for a stop or a read fails. The task is
/// closed exactly once on every exit path.
pub struct AcquisitionLoop {
    source: ManagedSource,
    settings: SourceSettings,
    request: ReadRequest,
    producer: BlockProducer,
    token: CancellationToken,
    metrics: Arc<PipelineMetrics>,
    live: Option<LiveMonitor>,
    idle_backoff: Duration,
    read_label: String,
    report: AcquisitionReport,
}

impl AcquisitionLoop {
    pub fn new(
        source: Box<dyn AcquisitionSource>,
        config: &AcquisitionConfig,
        producer: BlockProducer,
        token: CancellationToken,
    ) -> Self {
        Self {
            source: ManagedSource::new(source),
            settings: config.source_settings(),
            request: config.read_request(),
            producer,
            token,
            metrics: Arc::new(PipelineMetrics::new()),
            live: None,
            idle_backoff: DEFAULT_IDLE_BACKOFF,
            read_label: config.samples_per_read_label(),
            report: AcquisitionReport::default(),
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<PipelineMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_live(mut self, live: LiveMonitor) -> Self {
        self.live = Some(live);
        self
    }

    pub fn with_idle_backoff(mut self, backoff: Duration) -> Self {
        self.idle_backoff = backoff;
        self
    }

    pub fn state(&self) -> AcquisitionState {
        self.source.state()
    }

    /// Run to completion on the calling thread
    pub fn run(mut self) -> DaqResult<AcquisitionReport> {
        self.log_banner();

        let outcome = self.drive();
        self.source.close();
        log::info!("Closed {}", self.settings.task_name);

        match outcome {
            Ok(()) => Ok(self.report),
            Err(e) => {
                log::error!("{} terminated: {}", self.settings.task_name, e);
                Err(e)
            }
        }
    }

    fn drive(&mut self) -> DaqResult<()> {
        self.source.configure(&self.settings)?;
        self.source.start()?;
        log::info!("Started {}", self.settings.task_name);

        loop {
            if self.token.is_stop_requested() {
                self.token.acknowledge();
                self.source.begin_stop()?;
                return Ok(());
            }

            // Never issue a read against an empty driver buffer
            let available = self.source.available_samples().inspect_err(|_| {
                self.metrics.record_read_fault();
            })?;
            if available == 0 {
                thread::sleep(self.idle_backoff);
                continue;
            }

            let block = self.source.read(self.request).inspect_err(|_| {
                self.metrics.record_read_fault();
            })?;

            let samples = block.samples_per_channel();
            if let Some(live) = &self.live {
                live.publish(&block);
            }
            self.producer.put(block)?;

            self.report.blocks += 1;
            self.report.samples_per_channel += samples as u64;
            self.metrics.record_block_acquired(samples);
        }
    }

    fn log_banner(&self) {
        let s = &self.settings;
        log::info!("Starting {}", s.task_name);
        log::info!("Input channels: {}", s.channels);
        log::info!(
            "Trigger channel: {}",
            s.trigger.as_ref().map_or("None", |t| t.source.as_str())
        );
        log::info!("Sampling rate: {}Hz", s.sampling_rate_hz);
        log::info!("Number of samples per read: {}", self.read_label);
    }
}
