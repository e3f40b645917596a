use crate::core::{AcquisitionConfig, DaqError};
use crate::engine::{
    AcquisitionLoop, AcquisitionReport, CancellationToken, PersistenceConsumer, PersistenceReport,
    PipelineStatus, SampleChannel,
};
use crate::hal::AcquisitionSource;
use crate::observability::{PipelineMetrics, PipelineMonitor};
use crate::visualization::LiveMonitor;
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Builds a fresh hardware source for each acquisition run
pub type SourceFactory =
    Box<dyn Fn(&AcquisitionConfig) -> Result<Box<dyn AcquisitionSource>> + Send + Sync>;

/// How often `stop` re-checks the consumer while waiting for the producer
const CONSUMER_CHECK_INTERVAL: Duration = Duration::from_millis(50);

type AcquisitionHandle = JoinHandle<crate::core::DaqResult<AcquisitionReport>>;
type PersistenceHandle = JoinHandle<crate::core::DaqResult<PersistenceReport>>;

/// Session context for one acquisition setup.
///
/// The persistence consumer is spawned on the first `start` and keeps running
/// across start/stop cycles, so all runs land in the same file under a single
/// header. Each `start` gets a new source from the factory and a new
/// acquisition worker.
pub struct PipelineController {
    config: AcquisitionConfig,
    factory: SourceFactory,
    token: CancellationToken,
    status: PipelineStatus,
    channel: Option<SampleChannel>,
    acquisition: Option<AcquisitionHandle>,
    persistence: Option<PersistenceHandle>,
    metrics: Arc<PipelineMetrics>,
    live: LiveMonitor,
}

impl PipelineController {
    pub fn new(config: AcquisitionConfig, factory: SourceFactory) -> Result<Self> {
        config.validate().context("Invalid acquisition configuration")?;

        let metrics = Arc::new(PipelineMetrics::new());
        let window = config.sampling_rate_hz as usize;
        let live = LiveMonitor::new(config.channels.clone(), window).with_metrics(metrics.clone());

        Ok(Self {
            config,
            factory,
            token: CancellationToken::new(),
            status: PipelineStatus::Offline,
            channel: None,
            acquisition: None,
            persistence: None,
            metrics,
            live,
        })
    }

    pub fn config(&self) -> &AcquisitionConfig {
        &self.config
    }

    pub fn status(&self) -> PipelineStatus {
        self.status
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn metrics(&self) -> Arc<PipelineMetrics> {
        self.metrics.clone()
    }

    pub fn monitor(&self) -> PipelineMonitor {
        PipelineMonitor::new(self.metrics.clone())
    }

    /// Live channel views; observers attached here survive start/stop cycles
    pub fn live(&self) -> &LiveMonitor {
        &self.live
    }

    pub fn is_acquiring(&self) -> bool {
        self.acquisition.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Drop to Offline if the acquisition worker ended on its own
    pub fn refresh_status(&mut self) -> PipelineStatus {
        if self.status == PipelineStatus::Live && !self.is_acquiring() {
            log::warn!("{} stopped unexpectedly", self.config.task_name);
            self.status = PipelineStatus::Offline;
        }
        self.status
    }

    pub async fn start(&mut self) -> Result<()> {
        if self.is_acquiring() {
            return Err(DaqError::InvalidState {
                action: "start",
                state: self.status.label().to_string(),
            }
            .into());
        }
        if let Some(handle) = self.acquisition.take() {
            reap_acquisition(handle).await;
        }
        self.config.validate()?;

        if self.persistence.as_ref().is_some_and(|h| h.is_finished()) {
            self.channel = None;
        }
        let channel = match &self.channel {
            Some(channel) => channel.clone(),
            None => {
                if let Some(handle) = self.persistence.take() {
                    reap_persistence(handle).await;
                }
                let channel = SampleChannel::bounded(self.config.channel_capacity);
                self.channel = Some(channel.clone());
                channel
            }
        };

        if self.persistence.is_none() {
            let consumer = PersistenceConsumer::open(
                &self.config.output_filename,
                &self.config.channels,
                self.config.sampling_rate_hz,
                channel.consumer(),
            )?
            .with_metrics(self.metrics.clone());
            self.persistence = Some(tokio::task::spawn_blocking(move || consumer.run()));
        }

        let source = (self.factory)(&self.config)
            .with_context(|| format!("Failed to create source for {}", self.config.device))?;
        let worker = AcquisitionLoop::new(source, &self.config, channel.producer(), self.token.clone())
            .with_metrics(self.metrics.clone())
            .with_live(self.live.clone());
        self.acquisition = Some(tokio::task::spawn_blocking(move || worker.run()));

        self.status = PipelineStatus::Live;
        Ok(())
    }

    /// Ask the acquisition worker to stop and wait for it. The consumer keeps
    /// draining whatever was already queued.
    ///
    /// Returns `None` when nothing was acquiring.
    pub async fn stop(&mut self) -> Result<Option<AcquisitionReport>> {
        let Some(mut handle) = self.acquisition.take() else {
            self.status = PipelineStatus::Offline;
            return Ok(None);
        };

        self.token.signal();
        let joined = loop {
            tokio::select! {
                joined = &mut handle => break joined,
                _ = tokio::time::sleep(CONSUMER_CHECK_INTERVAL) => {
                    // A producer blocked on a dead consumer only returns once
                    // every receiving end is gone
                    if self.channel.is_some() && self.consumer_exited() {
                        log::warn!("Persistence stopped; releasing the sample channel");
                        self.channel = None;
                    }
                }
            }
        };

        self.token.reset();
        self.status = PipelineStatus::Offline;
        log::info!("{} stopped", self.config.task_name);

        let report = joined.context("Acquisition worker panicked")??;
        Ok(Some(report))
    }

    /// Stop acquiring, let the consumer drain the channel and wait for it
    pub async fn shutdown(&mut self) -> Result<Option<PersistenceReport>> {
        match self.stop().await {
            Ok(Some(report)) => log::info!(
                "Acquired {} blocks ({} samples per channel)",
                report.blocks,
                report.samples_per_channel
            ),
            Ok(None) => {}
            Err(e) => log::error!("Acquisition ended with an error: {:#}", e),
        }

        self.channel = None;
        let Some(handle) = self.persistence.take() else {
            return Ok(None);
        };
        let report = handle.await.context("Persistence worker panicked")??;
        Ok(Some(report))
    }

    fn consumer_exited(&self) -> bool {
        self.persistence.as_ref().map_or(true, |h| h.is_finished())
    }
}

impl Drop for PipelineController {
    fn drop(&mut self) {
        if self.is_acquiring() {
            self.token.signal();
        }
    }
}

async fn reap_acquisition(handle: AcquisitionHandle) {
    match handle.await {
        Ok(Ok(report)) => log::debug!("Previous run acquired {} blocks", report.blocks),
        Ok(Err(e)) => log::warn!("Previous run ended with: {}", e),
        Err(e) => log::error!("Acquisition worker panicked: {}", e),
    }
}

async fn reap_persistence(handle: PersistenceHandle) {
    match handle.await {
        Ok(Ok(report)) => log::debug!("Previous sink received {} rows", report.rows_written),
        Ok(Err(e)) => log::warn!("Persistence ended with: {}", e),
        Err(e) => log::error!("Persistence worker panicked: {}", e),
    }
}
