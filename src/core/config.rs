use super::channels::validate_channel_id;
use super::{ChannelSet, DaqError, DaqResult};
use crate::hal::{ReadRequest, SourceSettings, TriggerSettings, TriggerSlope};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const MIN_SAMPLING_RATE_HZ: u32 = 1;
pub const MAX_SAMPLING_RATE_HZ: u32 = 1_000_000;

/// Samples the driver delivers after the trigger point on top of the
/// pretrigger window. Specific to the NI-DAQmx reference trigger.
pub const POST_TRIGGER_GUARD_SAMPLES: usize = 2;

/// Clock buffer hint used when no per-read count is configured
pub const DEFAULT_CLOCK_BUFFER_SAMPLES: usize = 1000;

pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

fn default_task_name() -> String {
    "AcquisitionTask".to_string()
}

fn default_device() -> String {
    "Dev1".to_string()
}

fn default_output_filename() -> PathBuf {
    PathBuf::from("data/measurements.csv")
}

fn default_channel_capacity() -> usize {
    DEFAULT_CHANNEL_CAPACITY
}

/// Parameters of one acquisition run. Immutable once the run starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcquisitionConfig {
    #[serde(default = "default_task_name")]
    pub task_name: String,

    #[serde(default = "default_device")]
    pub device: String,

    pub channels: ChannelSet,

    #[serde(default)]
    pub trigger_channel: Option<String>,

    /// Trigger threshold in volts
    #[serde(default)]
    pub trigger_level: f64,

    #[serde(default)]
    pub trigger_slope: TriggerSlope,

    pub sampling_rate_hz: u32,

    /// `None` reads everything buffered (untriggered) or a sampling-rate sized
    /// pretrigger window (triggered)
    #[serde(default)]
    pub samples_per_read: Option<usize>,

    #[serde(default = "default_output_filename")]
    pub output_filename: PathBuf,

    /// Bound of the sample channel, in blocks
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl AcquisitionConfig {
    pub fn new(channels: ChannelSet, sampling_rate_hz: u32) -> Self {
        Self {
            task_name: default_task_name(),
            device: default_device(),
            channels,
            trigger_channel: None,
            trigger_level: 0.0,
            trigger_slope: TriggerSlope::Rising,
            sampling_rate_hz,
            samples_per_read: None,
            output_filename: default_output_filename(),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }

    pub fn with_task_name(mut self, task_name: impl Into<String>) -> Self {
        self.task_name = task_name.into();
        self
    }

    pub fn with_device(mut self, device: impl Into<String>) -> Self {
        self.device = device.into();
        self
    }

    pub fn with_trigger(mut self, channel: impl Into<String>, level: f64) -> Self {
        self.trigger_channel = Some(channel.into());
        self.trigger_level = level;
        self
    }

    pub fn with_trigger_slope(mut self, slope: TriggerSlope) -> Self {
        self.trigger_slope = slope;
        self
    }

    pub fn with_samples_per_read(mut self, samples: usize) -> Self {
        self.samples_per_read = Some(samples);
        self
    }

    pub fn with_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_filename = path.into();
        self
    }

    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    /// Load a JSON config file
    pub fn from_json_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: AcquisitionConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config JSON {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> DaqResult<()> {
        if !(MIN_SAMPLING_RATE_HZ..=MAX_SAMPLING_RATE_HZ).contains(&self.sampling_rate_hz) {
            return Err(DaqError::config(format!(
                "sampling rate {} Hz outside {}..={} Hz",
                self.sampling_rate_hz, MIN_SAMPLING_RATE_HZ, MAX_SAMPLING_RATE_HZ
            )));
        }
        if self.samples_per_read == Some(0) {
            return Err(DaqError::config("samples per read must be positive"));
        }
        if let Some(trigger) = &self.trigger_channel {
            validate_channel_id(trigger)?;
        }
        if !self.trigger_level.is_finite() {
            return Err(DaqError::config("trigger level must be finite"));
        }
        if self.channel_capacity == 0 {
            return Err(DaqError::config("channel capacity must be at least one block"));
        }
        if self.task_name.trim().is_empty() {
            return Err(DaqError::config("task name must not be empty"));
        }
        if self.output_filename.as_os_str().is_empty() {
            return Err(DaqError::config("output filename must not be empty"));
        }
        Ok(())
    }

    pub fn is_triggered(&self) -> bool {
        self.trigger_channel.is_some()
    }

    /// Pretrigger window size; only meaningful with a trigger configured
    pub fn pretrigger_samples(&self) -> Option<usize> {
        if self.trigger_channel.is_none() {
            return None;
        }
        Some(self.samples_per_read.unwrap_or(self.sampling_rate_hz as usize))
    }

    /// Samples per channel one read returns, `None` meaning "all available"
    pub fn effective_samples_per_read(&self) -> Option<usize> {
        match self.pretrigger_samples() {
            Some(pre) => Some(pre + POST_TRIGGER_GUARD_SAMPLES),
            None => self.samples_per_read,
        }
    }

    pub fn read_request(&self) -> ReadRequest {
        match self.effective_samples_per_read() {
            Some(n) if self.is_triggered() => ReadRequest::per_channel(n).wait_forever(),
            Some(n) => ReadRequest::per_channel(n),
            None => ReadRequest::all(),
        }
    }

    pub fn source_settings(&self) -> SourceSettings {
        let trigger = self.trigger_channel.as_ref().map(|source| TriggerSettings {
            source: source.clone(),
            slope: self.trigger_slope,
            level: self.trigger_level,
            pretrigger_samples: self.pretrigger_samples().unwrap_or_default(),
        });

        SourceSettings {
            task_name: self.task_name.clone(),
            device: self.device.clone(),
            channels: self.channels.clone(),
            sampling_rate_hz: f64::from(self.sampling_rate_hz),
            samples_per_channel: self
                .effective_samples_per_read()
                .unwrap_or(DEFAULT_CLOCK_BUFFER_SAMPLES),
            trigger,
        }
    }

    /// Refresh period for live observers: one read's worth of time
    pub fn live_poll_interval(&self) -> Duration {
        let samples = self
            .effective_samples_per_read()
            .unwrap_or(DEFAULT_CLOCK_BUFFER_SAMPLES);
        crate::visualization::poll_interval(self.sampling_rate_hz, samples)
    }

    /// Human-readable per-read count for the run banner: the configured
    /// count, else the pretrigger window, else "READ ALL"
    pub fn samples_per_read_label(&self) -> String {
        match self.samples_per_read.or(self.pretrigger_samples()) {
            Some(n) => n.to_string(),
            None => "READ ALL".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_channels() -> ChannelSet {
        ChannelSet::new(["ai0", "ai1"]).unwrap()
    }

    #[test]
    fn test_untriggered_without_count_reads_all() {
        let config = AcquisitionConfig::new(two_channels(), 1000);
        assert_eq!(config.effective_samples_per_read(), None);
        assert_eq!(config.read_request(), ReadRequest::all());
        assert_eq!(config.samples_per_read_label(), "READ ALL");
    }

    #[test]
    fn test_triggered_adds_guard_samples() {
        let config = AcquisitionConfig::new(two_channels(), 1000)
            .with_trigger("ai3", 0.5)
            .with_samples_per_read(100);

        assert_eq!(config.pretrigger_samples(), Some(100));
        assert_eq!(config.effective_samples_per_read(), Some(102));
        assert_eq!(config.read_request().timeout, None);
    }

    #[test]
    fn test_triggered_without_count_uses_sampling_rate() {
        let config = AcquisitionConfig::new(two_channels(), 500).with_trigger("ai0", 0.0);
        assert_eq!(config.pretrigger_samples(), Some(500));
        assert_eq!(config.effective_samples_per_read(), Some(502));
    }
}
