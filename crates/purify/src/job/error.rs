use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::state::Phase;
use crate::gateway::GatewayError;

/// Which step of the job failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Rejected before submission. Never produced by the controller itself.
    Validation,
    Upload,
    Start,
    Poll,
    /// The backend reported the job as failed.
    Processing,
    /// No terminal status before the polling deadline.
    Timeout,
    Fetch,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::Validation => write!(f, "ValidationError"),
            FailureKind::Upload => write!(f, "UploadError"),
            FailureKind::Start => write!(f, "StartError"),
            FailureKind::Poll => write!(f, "PollError"),
            FailureKind::Processing => write!(f, "ProcessingError"),
            FailureKind::Timeout => write!(f, "TimeoutError"),
            FailureKind::Fetch => write!(f, "FetchError"),
        }
    }
}

/// Terminal failure payload shown to the user verbatim.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{message}")]
pub struct JobFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl JobFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Wraps a transport failure of the given operation.
    pub fn from_gateway(kind: FailureKind, err: &GatewayError) -> Self {
        let prefix = match kind {
            FailureKind::Upload => "Upload failed",
            FailureKind::Start => "Processing failed",
            FailureKind::Poll => "Failed to check processing status",
            FailureKind::Fetch => "Download failed",
            FailureKind::Validation | FailureKind::Processing | FailureKind::Timeout => {
                return Self::new(kind, err.to_string());
            }
        };
        Self::new(kind, format!("{}: {}", prefix, err))
    }

    /// The backend reported `status: "error"`.
    pub fn processing(message: Option<String>) -> Self {
        Self::new(
            FailureKind::Processing,
            message.unwrap_or_else(|| "Processing failed".to_string()),
        )
    }

    pub fn timeout(deadline: std::time::Duration) -> Self {
        let secs = deadline.as_secs();
        let rendered = if secs >= 60 && secs % 60 == 0 {
            let minutes = secs / 60;
            format!("{} minute{}", minutes, if minutes == 1 { "" } else { "s" })
        } else {
            format!("{} seconds", deadline.as_secs_f64())
        };
        Self::new(
            FailureKind::Timeout,
            format!("Processing timed out after {}", rendered),
        )
    }
}

/// Misuse of the controller API.
#[derive(Error, Debug)]
pub enum ControllerError {
    #[error("Cannot {operation} while the job is {phase}")]
    InvalidPhase {
        operation: &'static str,
        phase: Phase,
    },

    #[error("No tokio runtime is available to drive the job")]
    NoRuntime,

    #[error(transparent)]
    Failed(#[from] JobFailure),
}
