use super::{AcquisitionSource, ReadRequest, SourceSettings};
use crate::core::{DaqError, DaqResult, SampleBlock};
use crate::engine::AcquisitionState;

/// Manages the lifecycle of an AcquisitionSource with proper state transitions.
///
/// The backend `close` runs exactly once, either through `close()` or on drop.
pub struct ManagedSource {
    inner: Box<dyn AcquisitionSource>,
    state: AcquisitionState,
}

impl ManagedSource {
    pub fn new(source: Box<dyn AcquisitionSource>) -> Self {
        Self {
            inner: source,
            state: AcquisitionState::Unconfigured,
        }
    }

    pub fn state(&self) -> AcquisitionState {
        self.state
    }

    fn require(&self, state: AcquisitionState, action: &'static str) -> DaqResult<()> {
        if self.state != state {
            return Err(DaqError::InvalidState {
                action,
                state: self.state.name().to_string(),
            });
        }
        Ok(())
    }

    fn transition(&mut self, target: AcquisitionState, action: &'static str) -> DaqResult<()> {
        if !self.state.can_transition_to(target) {
            return Err(DaqError::InvalidState {
                action,
                state: self.state.name().to_string(),
            });
        }
        self.state = target;
        Ok(())
    }

    pub fn configure(&mut self, settings: &SourceSettings) -> DaqResult<()> {
        self.require(AcquisitionState::Unconfigured, "configure")?;
        self.inner.configure(settings)?;
        self.transition(AcquisitionState::Configured, "configure")
    }

    pub fn start(&mut self) -> DaqResult<()> {
        self.require(AcquisitionState::Configured, "start")?;
        self.inner.start()?;
        self.transition(AcquisitionState::Running, "start")
    }

    pub fn available_samples(&mut self) -> DaqResult<usize> {
        self.require(AcquisitionState::Running, "poll available samples")?;
        self.inner.available_samples()
    }

    pub fn read(&mut self, request: ReadRequest) -> DaqResult<SampleBlock> {
        self.require(AcquisitionState::Running, "read")?;
        self.inner.read(request)
    }

    /// Leave the running state; no more reads are accepted
    pub fn begin_stop(&mut self) -> DaqResult<()> {
        self.transition(AcquisitionState::Stopping, "stop")
    }

    /// Release the task. Returns false when it was already closed.
    pub fn close(&mut self) -> bool {
        if self.state == AcquisitionState::Closed {
            return false;
        }

        if let Err(e) = self.inner.close() {
            log::warn!("Closing acquisition task failed: {}", e);
        }
        self.state = AcquisitionState::Closed;
        true
    }
}

impl Drop for ManagedSource {
    fn drop(&mut self) {
        if self.close() {
            log::debug!("Acquisition task closed on drop");
        }
    }
}
