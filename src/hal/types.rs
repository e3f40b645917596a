use crate::core::ChannelSet;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Device discovery information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub id: String,
    pub name: String,
    pub driver_id: String,
    pub analog_inputs: Vec<String>,
}

/// Edge slope an analog reference trigger fires on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerSlope {
    #[default]
    Rising,
    Falling,
}

impl std::str::FromStr for TriggerSlope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "rising" => Ok(Self::Rising),
            "falling" => Ok(Self::Falling),
            other => Err(format!("unknown trigger slope '{}'", other)),
        }
    }
}

/// Analog edge reference trigger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerSettings {
    /// Channel id the trigger watches, e.g. "ai3"
    pub source: String,
    pub slope: TriggerSlope,
    /// Threshold in volts
    pub level: f64,
    pub pretrigger_samples: usize,
}

/// Everything a source needs to set up one analog-input task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSettings {
    pub task_name: String,
    pub device: String,
    pub channels: ChannelSet,
    /// Continuous sample clock rate
    pub sampling_rate_hz: f64,
    /// Per-channel buffer size hint handed to the sample clock
    pub samples_per_channel: usize,
    pub trigger: Option<TriggerSettings>,
}

/// How many samples a single read should return
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SampleCount {
    /// Everything currently buffered
    All,
    PerChannel(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadRequest {
    pub count: SampleCount,
    /// `None` waits indefinitely (triggered acquisition)
    pub timeout: Option<Duration>,
}

impl ReadRequest {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    pub fn all() -> Self {
        Self {
            count: SampleCount::All,
            timeout: Some(Self::DEFAULT_TIMEOUT),
        }
    }

    pub fn per_channel(samples: usize) -> Self {
        Self {
            count: SampleCount::PerChannel(samples),
            timeout: Some(Self::DEFAULT_TIMEOUT),
        }
    }

    pub fn wait_forever(mut self) -> Self {
        self.timeout = None;
        self
    }
}
