use crate::core::{DaqError, DaqResult, SampleBlock};
use crate::hal::{
    AcquisitionDriver, AcquisitionSource, DeviceInfo, ReadRequest, SampleCount, SourceSettings,
};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::f64::consts::PI;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Analog inputs exposed by the simulated board
pub const SIMULATED_CHANNELS: [&str; 8] = ["ai0", "ai1", "ai2", "ai3", "ai4", "ai5", "ai6", "ai7"];

const WAIT_STEP: Duration = Duration::from_millis(1);

/// Call counters shared with whoever created the source.
///
/// The source itself moves into the acquisition worker; the probe stays
/// behind so tests can observe what happened to it.
#[derive(Debug, Clone, Default)]
pub struct SourceProbe {
    counters: Arc<ProbeCounters>,
}

#[derive(Debug, Default)]
struct ProbeCounters {
    configure_calls: AtomicUsize,
    start_calls: AtomicUsize,
    read_calls: AtomicUsize,
    reads_while_empty: AtomicUsize,
    reads_in_flight: AtomicUsize,
    close_calls: AtomicUsize,
}

impl SourceProbe {
    pub fn configure_calls(&self) -> usize {
        self.counters.configure_calls.load(Ordering::SeqCst)
    }

    pub fn start_calls(&self) -> usize {
        self.counters.start_calls.load(Ordering::SeqCst)
    }

    pub fn read_calls(&self) -> usize {
        self.counters.read_calls.load(Ordering::SeqCst)
    }

    /// Reads issued while the source reported nothing buffered
    pub fn reads_while_empty(&self) -> usize {
        self.counters.reads_while_empty.load(Ordering::SeqCst)
    }

    pub fn read_in_flight(&self) -> bool {
        self.counters.reads_in_flight.load(Ordering::SeqCst) > 0
    }

    pub fn close_calls(&self) -> usize {
        self.counters.close_calls.load(Ordering::SeqCst)
    }
}

enum Signal {
    /// Hand out prepared blocks in order, then report nothing available
    Scripted(VecDeque<SampleBlock>),
    /// Real-time paced sine per channel, channel `c` at `frequency_hz * (c + 1)`
    Sine { frequency_hz: f64, amplitude: f64 },
}

pub struct SimulatedSource {
    signal: Signal,
    settings: Option<SourceSettings>,
    started_at: Option<Instant>,
    produced: u64,
    read_delay: Option<Duration>,
    fail_start: bool,
    fail_read_after: Option<usize>,
    successful_reads: usize,
    probe: SourceProbe,
}

impl SimulatedSource {
    fn with_signal(signal: Signal) -> Self {
        Self {
            signal,
            settings: None,
            started_at: None,
            produced: 0,
            read_delay: None,
            fail_start: false,
            fail_read_after: None,
            successful_reads: 0,
            probe: SourceProbe::default(),
        }
    }

    pub fn scripted(blocks: impl IntoIterator<Item = SampleBlock>) -> Self {
        Self::with_signal(Signal::Scripted(blocks.into_iter().collect()))
    }

    pub fn sine(frequency_hz: f64, amplitude: f64) -> Self {
        Self::with_signal(Signal::Sine {
            frequency_hz,
            amplitude,
        })
    }

    /// Every read takes at least this long
    pub fn with_read_delay(mut self, delay: Duration) -> Self {
        self.read_delay = Some(delay);
        self
    }

    pub fn fail_on_start(mut self) -> Self {
        self.fail_start = true;
        self
    }

    /// The read after `reads` successful ones fails
    pub fn fail_read_after(mut self, reads: usize) -> Self {
        self.fail_read_after = Some(reads);
        self
    }

    pub fn probe(&self) -> SourceProbe {
        self.probe.clone()
    }

    fn settings(&self) -> DaqResult<&SourceSettings> {
        self.settings
            .as_ref()
            .ok_or_else(|| DaqError::read("simulated source is not configured"))
    }

    fn sine_available(&self) -> DaqResult<usize> {
        let settings = self.settings()?;
        let Some(started) = self.started_at else {
            return Ok(0);
        };
        let clocked = (started.elapsed().as_secs_f64() * settings.sampling_rate_hz) as u64;
        Ok(clocked.saturating_sub(self.produced) as usize)
    }

    fn read_sine(&mut self, request: ReadRequest, frequency_hz: f64, amplitude: f64) -> DaqResult<SampleBlock> {
        let wanted = match request.count {
            SampleCount::All => self.sine_available()?,
            SampleCount::PerChannel(n) => n,
        };

        let waiting_since = Instant::now();
        while self.sine_available()? < wanted {
            if let Some(timeout) = request.timeout {
                if waiting_since.elapsed() > timeout {
                    return Err(DaqError::read(format!(
                        "timed out waiting for {} samples per channel",
                        wanted
                    )));
                }
            }
            thread::sleep(WAIT_STEP);
        }

        let settings = self.settings()?;
        let rate = settings.sampling_rate_hz;
        let first = self.produced;
        let channels = (0..settings.channels.len())
            .map(|c| {
                let freq = frequency_hz * (c + 1) as f64;
                (0..wanted as u64)
                    .map(|k| amplitude * (2.0 * PI * freq * (first + k) as f64 / rate).sin())
                    .collect()
            })
            .collect();

        self.produced += wanted as u64;
        SampleBlock::new(channels)
    }

    fn read_scripted(&mut self) -> DaqResult<SampleBlock> {
        let width = self.settings()?.channels.len();
        let Signal::Scripted(blocks) = &mut self.signal else {
            return Err(DaqError::read("source has no script"));
        };

        let block = blocks
            .pop_front()
            .ok_or_else(|| DaqError::read("no samples buffered"))?;
        if block.num_channels() != width {
            return Err(DaqError::MalformedBlock(format!(
                "scripted block has {} channels, task has {}",
                block.num_channels(),
                width
            )));
        }
        Ok(block)
    }
}

impl AcquisitionSource for SimulatedSource {
    fn configure(&mut self, settings: &SourceSettings) -> DaqResult<()> {
        self.probe.counters.configure_calls.fetch_add(1, Ordering::SeqCst);

        for channel in settings.channels.iter() {
            if !SIMULATED_CHANNELS.contains(&channel) {
                return Err(DaqError::config(format!(
                    "device {} has no analog input '{}'",
                    settings.device, channel
                )));
            }
        }
        if let Some(trigger) = &settings.trigger {
            if !SIMULATED_CHANNELS.contains(&trigger.source.as_str()) {
                return Err(DaqError::config(format!(
                    "trigger source '{}' does not exist on {}",
                    trigger.source, settings.device
                )));
            }
        }
        if settings.sampling_rate_hz <= 0.0 {
            return Err(DaqError::config("sampling rate must be positive"));
        }

        self.settings = Some(settings.clone());
        Ok(())
    }

    fn start(&mut self) -> DaqResult<()> {
        self.probe.counters.start_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_start {
            return Err(DaqError::config("simulated task rejected its configuration"));
        }
        self.started_at = Some(Instant::now());
        self.produced = 0;
        Ok(())
    }

    fn available_samples(&mut self) -> DaqResult<usize> {
        match &self.signal {
            Signal::Scripted(blocks) => Ok(blocks.front().map_or(0, SampleBlock::samples_per_channel)),
            Signal::Sine { .. } => self.sine_available(),
        }
    }

    fn read(&mut self, request: ReadRequest) -> DaqResult<SampleBlock> {
        let counters = self.probe.counters.clone();
        counters.read_calls.fetch_add(1, Ordering::SeqCst);
        if self.available_samples()? == 0 {
            counters.reads_while_empty.fetch_add(1, Ordering::SeqCst);
        }

        counters.reads_in_flight.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.read_delay {
            thread::sleep(delay);
        }

        let result = match self.fail_read_after {
            Some(limit) if self.successful_reads >= limit => {
                Err(DaqError::read("simulated driver fault"))
            }
            _ => match self.signal {
                Signal::Scripted(_) => self.read_scripted(),
                Signal::Sine {
                    frequency_hz,
                    amplitude,
                } => self.read_sine(request, frequency_hz, amplitude),
            },
        };
        counters.reads_in_flight.fetch_sub(1, Ordering::SeqCst);

        if result.is_ok() {
            self.successful_reads += 1;
        }
        result
    }

    fn close(&mut self) -> DaqResult<()> {
        self.probe.counters.close_calls.fetch_add(1, Ordering::SeqCst);
        self.started_at = None;
        Ok(())
    }
}

/// Driver exposing one simulated eight-input board producing sine waves
pub struct SimulatedDriver {
    frequency_hz: f64,
    amplitude: f64,
}

impl SimulatedDriver {
    pub const DRIVER_ID: &'static str = "simulated";
    pub const DEVICE_ID: &'static str = "SimDev1";

    pub fn new() -> Self {
        Self {
            frequency_hz: 5.0,
            amplitude: 1.0,
        }
    }
}

impl Default for SimulatedDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AcquisitionDriver for SimulatedDriver {
    fn driver_id(&self) -> &str {
        Self::DRIVER_ID
    }

    async fn discover_devices(&self) -> Result<Vec<DeviceInfo>> {
        Ok(vec![DeviceInfo {
            id: Self::DEVICE_ID.to_string(),
            name: "Simulated analog input board".to_string(),
            driver_id: Self::DRIVER_ID.to_string(),
            analog_inputs: SIMULATED_CHANNELS.iter().map(|c| c.to_string()).collect(),
        }])
    }

    fn create_source(&self, _device_id: &str) -> Result<Box<dyn AcquisitionSource>> {
        Ok(Box::new(SimulatedSource::sine(self.frequency_hz, self.amplitude)))
    }
}
