//! Wire types for the processing service and the normalised shapes the
//! controller consumes.

use serde::{Deserialize, Serialize};

/// Identifier the service assigns to an uploaded document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque reference to a finished artifact. Not the artifact itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultLocator(String);

impl ResultLocator {
    pub fn new(locator: impl Into<String>) -> Self {
        Self(locator.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ResultLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Response from `POST /upload`.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadResponse {
    pub file_id: String,
    pub filename: String,
    pub status: String,
    pub message: String,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// Response from `POST /remove_watermark/{file_id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProcessResponse {
    pub file_id: String,
    pub status: String,
    #[serde(default)]
    pub output_available: bool,
    #[serde(default)]
    pub processing_time: f64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl ProcessResponse {
    /// Whether the backend finished the work inside the start call.
    pub fn is_immediate(&self) -> bool {
        self.status.eq_ignore_ascii_case("completed")
    }
}

/// Response from `GET /status/{file_id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusResponse {
    pub file_id: String,
    pub status: String,
    #[serde(default)]
    pub progress: Option<f64>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl StatusResponse {
    pub fn into_report(self) -> PollReport {
        let status = match self.status.to_ascii_lowercase().as_str() {
            "completed" => RemoteStatus::Completed,
            "error" | "timeout" => RemoteStatus::Failed,
            _ => RemoteStatus::Pending,
        };
        let progress = self
            .progress
            .filter(|p| p.is_finite())
            .map(|p| p.round().clamp(0.0, 100.0) as u8);

        PollReport {
            status,
            progress,
            message: self.message,
        }
    }
}

/// Error body shape used by the service (`detail`) and by proxies (`message`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ApiErrorBody {
    pub fn into_detail(self) -> Option<String> {
        self.detail.or(self.message).filter(|s| !s.trim().is_empty())
    }
}

/// Outcome of starting a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    /// Work already finished; the artifact can be fetched right away.
    Immediate { result: ResultLocator },
    /// Work continues remotely and has to be polled.
    Pending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteStatus {
    Pending,
    Completed,
    Failed,
}

/// One status query result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollReport {
    pub status: RemoteStatus,
    pub progress: Option<u8>,
    pub message: Option<String>,
}

impl PollReport {
    pub fn pending(progress: Option<u8>) -> Self {
        Self {
            status: RemoteStatus::Pending,
            progress,
            message: None,
        }
    }

    pub fn completed() -> Self {
        Self {
            status: RemoteStatus::Completed,
            progress: None,
            message: None,
        }
    }

    pub fn failed(message: Option<String>) -> Self {
        Self {
            status: RemoteStatus::Failed,
            progress: None,
            message,
        }
    }
}
