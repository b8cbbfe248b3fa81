use super::state::JobSnapshot;

/// Transitions reported by the controller, each with the snapshot after it was applied.
#[derive(Debug, Clone)]
pub enum JobEvent {
    /// Phase changed (including back to idle after cancel or reset).
    Phase(JobSnapshot),
    /// Progress moved within the current phase.
    Progress(JobSnapshot),
    /// Terminal success; `snapshot.result` is set.
    Completed(JobSnapshot),
    /// Terminal failure; `snapshot.failure` is set.
    Failed(JobSnapshot),
}

impl JobEvent {
    pub fn snapshot(&self) -> &JobSnapshot {
        match self {
            JobEvent::Phase(snapshot)
            | JobEvent::Progress(snapshot)
            | JobEvent::Completed(snapshot)
            | JobEvent::Failed(snapshot) => snapshot,
        }
    }
}

/// Presentation-side callbacks.
///
/// Called while the controller holds its state lock, in the order transitions
/// are applied. Implementations must return quickly and must not call back
/// into the controller.
pub trait JobObserver: Send + Sync {
    fn report(&self, event: &JobEvent);
}

/// No-op observer for callers that only read snapshots.
pub struct NoopObserver;

impl JobObserver for NoopObserver {
    fn report(&self, _event: &JobEvent) {}
}
