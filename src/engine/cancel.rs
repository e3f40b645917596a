use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// Position of a cooperative stop request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopState {
    Clear,
    /// Stop requested, not yet seen by the worker
    Signaled,
    /// Worker observed the request and is winding down
    Acknowledged,
}

impl StopState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => StopState::Signaled,
            2 => StopState::Acknowledged,
            _ => StopState::Clear,
        }
    }
}

/// Shared stop flag between the controller and the acquisition worker.
///
/// Clear -> Signaled (controller) -> Acknowledged (worker) -> Clear
/// (controller, after joining the worker).
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    state: Arc<AtomicU8>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> StopState {
        StopState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Request a stop. Has no effect once acknowledged.
    pub fn signal(&self) {
        let _ = self.state.compare_exchange(
            StopState::Clear as u8,
            StopState::Signaled as u8,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
    }

    pub fn is_stop_requested(&self) -> bool {
        self.state() != StopState::Clear
    }

    /// Worker side: mark the request as seen. Returns false if none was pending.
    pub fn acknowledge(&self) -> bool {
        self.state
            .compare_exchange(
                StopState::Signaled as u8,
                StopState::Acknowledged as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok()
    }

    /// Controller side: re-arm for the next run
    pub fn reset(&self) {
        self.state.store(StopState::Clear as u8, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_cycle() {
        let token = CancellationToken::new();
        assert_eq!(token.state(), StopState::Clear);
        assert!(!token.is_stop_requested());

        token.signal();
        assert_eq!(token.state(), StopState::Signaled);
        assert!(token.is_stop_requested());

        assert!(token.acknowledge());
        assert_eq!(token.state(), StopState::Acknowledged);
        assert!(token.is_stop_requested());

        token.reset();
        assert_eq!(token.state(), StopState::Clear);
    }

    #[test]
    fn test_acknowledge_without_signal() {
        let token = CancellationToken::new();
        assert!(!token.acknowledge());
        assert_eq!(token.state(), StopState::Clear);
    }

    #[test]
    fn test_clones_share_state() {
        let token = CancellationToken::new();
        let worker_side = token.clone();

        token.signal();
        assert!(worker_side.is_stop_requested());

        worker_side.acknowledge();
        token.signal();
        assert_eq!(token.state(), StopState::Acknowledged);
    }
}
