pub mod simulated;

pub use simulated::{SimulatedDriver, SimulatedSource, SourceProbe, SIMULATED_CHANNELS};
