use async_trait::async_trait;
use anyhow::Result;
use crate::core::{DaqResult, SampleBlock};
use super::types::{DeviceInfo, ReadRequest, SourceSettings};

/// Trait implemented by acquisition drivers for device discovery and source creation
#[async_trait]
pub trait AcquisitionDriver: Send + Sync {
    /// Unique driver identifier (e.g., "simulated", "nidaqmx")
    fn driver_id(&self) -> &str;

    /// Discover available devices
    async fn discover_devices(&self) -> Result<Vec<DeviceInfo>>;

    /// Create an unconfigured source bound to one device
    fn create_source(&self, device_id: &str) -> Result<Box<dyn AcquisitionSource>>;
}

/// Blocking analog-input capability of one hardware task.
///
/// Implementations are driven from a dedicated blocking worker and are never
/// shared; `ManagedSource` enforces call ordering on top of this trait.
pub trait AcquisitionSource: Send {
    /// Bind channels, sample clock and optional reference trigger
    fn configure(&mut self, settings: &SourceSettings) -> DaqResult<()>;

    /// Arm the task
    fn start(&mut self) -> DaqResult<()>;

    /// Samples per channel currently buffered by the driver
    fn available_samples(&mut self) -> DaqResult<usize>;

    /// Block until the requested samples are present and return them
    fn read(&mut self, request: ReadRequest) -> DaqResult<SampleBlock>;

    /// Release the hardware task
    fn close(&mut self) -> DaqResult<()>;
}
