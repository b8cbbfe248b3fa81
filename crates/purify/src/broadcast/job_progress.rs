//! Job progress broadcaster for real-time status streaming.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::job::{FailureKind, JobEvent, JobObserver, Phase, Stage};

/// Coarse status of a job as seen by subscribers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Idle,
    Running,
    Completed,
    Failed,
}

impl From<Phase> for JobStatus {
    fn from(phase: Phase) -> Self {
        match phase {
            Phase::Idle => JobStatus::Idle,
            Phase::Uploading | Phase::Processing => JobStatus::Running,
            Phase::Completed => JobStatus::Completed,
            Phase::Error => JobStatus::Failed,
        }
    }
}

/// Progress event for a job, flattened for serialisation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobProgressEvent {
    /// Run the event belongs to.
    pub generation: u64,
    /// Service-assigned job identifier, once known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    /// Original filename being processed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    pub phase: Phase,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
    /// Human-readable message describing current activity.
    pub message: String,
    pub timestamp: DateTime<Utc>,
    /// Result locator (set on completion).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    /// Error message (set on failure).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<FailureKind>,
}

impl From<&JobEvent> for JobProgressEvent {
    fn from(event: &JobEvent) -> Self {
        let snapshot = event.snapshot();
        let message = match event {
            JobEvent::Completed(_) => "Watermark removal completed successfully".to_string(),
            JobEvent::Failed(s) => s
                .failure
                .as_ref()
                .map(|f| f.message.clone())
                .unwrap_or_else(|| "Processing failed".to_string()),
            JobEvent::Phase(s) | JobEvent::Progress(s) => match (s.phase, s.stage) {
                (Phase::Idle, _) => "Ready".to_string(),
                (_, Some(stage)) => stage.description().to_string(),
                (phase, None) => phase.to_string(),
            },
        };

        Self {
            generation: snapshot.generation,
            job_id: snapshot.job_id.as_ref().map(ToString::to_string),
            filename: snapshot.filename.clone(),
            phase: snapshot.phase,
            status: snapshot.phase.into(),
            progress: snapshot.progress.map(|p| p.value()),
            stage: snapshot.stage,
            message,
            timestamp: snapshot.updated_at,
            result: snapshot.result.as_ref().map(ToString::to_string),
            error: snapshot.failure.as_ref().map(|f| f.message.clone()),
            error_kind: snapshot.failure.as_ref().map(|f| f.kind),
        }
    }
}

/// Broadcasts job progress events for streaming.
#[derive(Clone)]
pub struct JobProgressBroadcaster {
    sender: Arc<broadcast::Sender<JobProgressEvent>>,
}

impl JobProgressBroadcaster {
    /// Creates a new job progress broadcaster with the specified channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Sends a progress event to all subscribers.
    pub fn send(&self, event: JobProgressEvent) {
        // Ignore errors - no active receivers is fine
        let _ = self.sender.send(event);
    }

    /// Creates a new subscriber for progress events.
    pub fn subscribe(&self) -> broadcast::Receiver<JobProgressEvent> {
        self.sender.subscribe()
    }
}

impl Default for JobProgressBroadcaster {
    fn default() -> Self {
        Self::new(100)
    }
}

impl JobObserver for JobProgressBroadcaster {
    fn report(&self, event: &JobEvent) {
        self.send(JobProgressEvent::from(event));
    }
}
