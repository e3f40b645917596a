pub mod block;
pub mod channels;
pub mod config;
pub mod error;

pub use block::SampleBlock;
pub use channels::ChannelSet;
pub use config::AcquisitionConfig;
pub use error::{DaqError, DaqResult};
