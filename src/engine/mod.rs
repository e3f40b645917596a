pub mod acquisition;
pub mod cancel;
pub mod controller;
pub mod persistence;
pub mod sample_channel;
pub mod state;

pub use acquisition::{AcquisitionLoop, AcquisitionReport};
pub use cancel::{CancellationToken, StopState};
pub use controller::{PipelineController, SourceFactory};
pub use persistence::{PersistenceConsumer, PersistenceReport};
pub use sample_channel::{BlockConsumer, BlockProducer, SampleChannel, TryPutError};
pub use state::{AcquisitionState, PipelineStatus};
