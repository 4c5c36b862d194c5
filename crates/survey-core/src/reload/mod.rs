// ── Reload synchronization ──
//
// Keeps every entity provider consistent after the backend's dataset
// changes. The coordinator owns the reload flag and the participant set;
// providers join for their lifetime, register for each refetch, and report
// completion through a handle. The reload is finished when the set drains.

mod coordinator;
mod registry;
mod watchdog;

pub use coordinator::ReloadCoordinator;
pub use registry::{CompletionHandle, Membership, ParticipantId, ParticipantSet};

/// Typed signal broadcast by the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadSignal {
    /// Every provider should refetch. `epoch` increases with each request.
    Requested { epoch: u64 },
    /// The participant set drained; emitted once per reload.
    Finished { epoch: u64 },
}

/// Where the coordinator is in a dataset switch.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SwitchPhase {
    #[default]
    Idle,
    /// The backend switch call is in flight.
    SwitchRequested { target: String },
    /// Backend switched; waiting on providers to refetch.
    Reloading,
}

impl SwitchPhase {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }
}
