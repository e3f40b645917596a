pub mod lifecycle;
pub mod mock;
#[cfg(feature = "nidaqmx")]
pub mod nidaqmx;
pub mod registry;
pub mod traits;
pub mod types;

pub use lifecycle::ManagedSource;
pub use registry::DriverRegistry;
pub use traits::{AcquisitionDriver, AcquisitionSource};
pub use types::{
    DeviceInfo, ReadRequest, SampleCount, SourceSettings, TriggerSettings,
    TriggerSlope,
};
