use serde::{Deserialize, Serialize};

/// Lifecycle of one hardware task inside the acquisition worker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AcquisitionState {
    Unconfigured,
    Configured,
    Running,
    Stopping,
    Closed,
}

impl AcquisitionState {
    /// Check if transition from current state to target state is valid
    pub fn can_transition_to(&self, target: AcquisitionState) -> bool {
        use AcquisitionState::*;

        matches!(
            (self, target),
            (Unconfigured, Configured) |
            (Configured, Running) |
            (Running, Stopping) |

            // close() is reachable from every open state
            (Unconfigured, Closed) |
            (Configured, Closed) |
            (Running, Closed) |
            (Stopping, Closed)
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Unconfigured => "Unconfigured",
            Self::Configured => "Configured",
            Self::Running => "Running",
            Self::Stopping => "Stopping",
            Self::Closed => "Closed",
        }
    }
}

impl Default for AcquisitionState {
    fn default() -> Self {
        Self::Unconfigured
    }
}

/// Live/offline label the controller reports to its callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineStatus {
    Live,
    Offline,
}

impl PipelineStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Live => "live",
            Self::Offline => "offline",
        }
    }
}

impl Default for PipelineStatus {
    fn default() -> Self {
        Self::Offline
    }
}
