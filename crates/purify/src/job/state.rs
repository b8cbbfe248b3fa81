//! Job lifecycle state and the read-only snapshots handed to observers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::JobFailure;
use crate::gateway::{JobId, ResultLocator};

/// Lifecycle phase of a job. Exactly one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Uploading,
    Processing,
    Completed,
    Error,
}

impl Phase {
    /// `Completed` and `Error` only leave through `reset`.
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Completed | Phase::Error)
    }

    /// A job run is in flight.
    pub fn is_active(self) -> bool {
        matches!(self, Phase::Uploading | Phase::Processing)
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Idle => write!(f, "idle"),
            Phase::Uploading => write!(f, "uploading"),
            Phase::Processing => write!(f, "processing"),
            Phase::Completed => write!(f, "completed"),
            Phase::Error => write!(f, "in error"),
        }
    }
}

/// Presentation stages, in order. Derived from progress, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Uploading,
    Analyzing,
    Detecting,
    Removing,
    Finalizing,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::Uploading,
        Stage::Analyzing,
        Stage::Detecting,
        Stage::Removing,
        Stage::Finalizing,
    ];

    /// Progress points covered by each stage.
    pub const SPAN: u8 = 20;

    pub fn index(self) -> usize {
        self as usize
    }

    /// Stage at `index`, clamped to the last stage.
    pub fn from_index(index: usize) -> Stage {
        Self::ALL[index.min(Self::ALL.len() - 1)]
    }

    pub fn from_progress(progress: Progress) -> Stage {
        Self::from_index((progress.value() / Self::SPAN) as usize)
    }

    /// Progress value at which this stage begins.
    pub fn progress(self) -> Progress {
        Progress::new(Self::SPAN * self.index() as u8)
    }

    pub fn name(self) -> &'static str {
        match self {
            Stage::Uploading => "Uploading",
            Stage::Analyzing => "Analyzing",
            Stage::Detecting => "Detecting",
            Stage::Removing => "Removing",
            Stage::Finalizing => "Finalizing",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Stage::Uploading => "Uploading your PDF file",
            Stage::Analyzing => "AI is analyzing the document for branded watermarks",
            Stage::Detecting => "Detecting 'Made with' boxes and branded overlays",
            Stage::Removing => "Removing watermark boxes while preserving content",
            Stage::Finalizing => "Generating clean PDF file",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Percentage in `0..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Progress(u8);

impl Progress {
    pub const ZERO: Progress = Progress(0);
    pub const COMPLETE: Progress = Progress(100);

    /// Clamps values above 100.
    pub fn new(value: u8) -> Self {
        Self(value.min(100))
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// Moves forward to `target`; never moves backwards.
    pub fn advance_to(self, target: Progress) -> Progress {
        self.max(target)
    }

    pub fn stage(self) -> Stage {
        Stage::from_progress(self)
    }
}

impl std::fmt::Display for Progress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}%", self.0)
    }
}

/// How progress is observed after the job was started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    Simulated,
    Polling,
}

/// Authoritative job state, owned by the controller.
///
/// Each variant carries exactly the data that is defined in that phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum JobState {
    Idle,
    Uploading {
        progress: Progress,
    },
    Processing {
        job_id: JobId,
        progress: Progress,
        strategy: Option<StrategyKind>,
    },
    Completed {
        job_id: JobId,
        result: ResultLocator,
    },
    Error {
        job_id: Option<JobId>,
        failure: JobFailure,
    },
}

impl JobState {
    pub(crate) fn phase(&self) -> Phase {
        match self {
            JobState::Idle => Phase::Idle,
            JobState::Uploading { .. } => Phase::Uploading,
            JobState::Processing { .. } => Phase::Processing,
            JobState::Completed { .. } => Phase::Completed,
            JobState::Error { .. } => Phase::Error,
        }
    }

    pub(crate) fn progress(&self) -> Option<Progress> {
        match self {
            JobState::Uploading { progress } | JobState::Processing { progress, .. } => {
                Some(*progress)
            }
            JobState::Completed { .. } => Some(Progress::COMPLETE),
            JobState::Idle | JobState::Error { .. } => None,
        }
    }

    pub(crate) fn job_id(&self) -> Option<&JobId> {
        match self {
            JobState::Processing { job_id, .. } | JobState::Completed { job_id, .. } => {
                Some(job_id)
            }
            JobState::Error { job_id, .. } => job_id.as_ref(),
            JobState::Idle | JobState::Uploading { .. } => None,
        }
    }

    fn strategy(&self) -> Option<StrategyKind> {
        match self {
            JobState::Processing { strategy, .. } => *strategy,
            _ => None,
        }
    }
}

/// Point-in-time copy of the job, safe to hand to presentation code.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSnapshot {
    pub generation: u64,
    pub phase: Phase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<JobId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<Progress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<StrategyKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ResultLocator>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<JobFailure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl JobSnapshot {
    pub(crate) fn capture(state: &JobState, generation: u64, filename: Option<&str>) -> Self {
        let progress = state.progress();
        let (result, failure) = match state {
            JobState::Completed { result, .. } => (Some(result.clone()), None),
            JobState::Error { failure, .. } => (None, Some(failure.clone())),
            _ => (None, None),
        };

        Self {
            generation,
            phase: state.phase(),
            job_id: state.job_id().cloned(),
            progress,
            stage: progress.map(Progress::stage),
            strategy: state.strategy(),
            result,
            failure,
            filename: filename.map(str::to_string),
            updated_at: Utc::now(),
        }
    }

    /// Initial snapshot of a fresh controller.
    pub fn idle() -> Self {
        Self::capture(&JobState::Idle, 0, None)
    }

    /// Index into [`Stage::ALL`], defined whenever progress is.
    pub fn current_step_index(&self) -> Option<usize> {
        self.stage.map(Stage::index)
    }

    /// Completed, failed or back to idle.
    pub fn is_settled(&self) -> bool {
        !self.phase.is_active()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::FailureKind;

    #[test]
    fn test_stage_derived_from_progress() {
        for value in 0..=100u8 {
            let expected = ((value / 20) as usize).min(4);
            assert_eq!(Progress::new(value).stage().index(), expected, "progress {}", value);
        }
    }

    #[test]
    fn test_stage_progress_and_index_roundtrip() {
        for stage in Stage::ALL {
            assert_eq!(Stage::from_progress(stage.progress()), stage);
            assert_eq!(Stage::from_index(stage.index()), stage);
        }
        assert_eq!(Stage::from_index(99), Stage::Finalizing);
    }

    #[test]
    fn test_progress_clamps_and_never_moves_backwards() {
        assert_eq!(Progress::new(250).value(), 100);
        let p = Progress::new(60);
        assert_eq!(p.advance_to(Progress::new(40)), p);
        assert_eq!(p.advance_to(Progress::new(80)).value(), 80);
    }

    #[test]
    fn test_snapshot_fields_follow_phase() {
        let job_id = JobId::new("j1");

        let idle = JobSnapshot::capture(&JobState::Idle, 1, None);
        assert_eq!(idle.progress, None);
        assert_eq!(idle.current_step_index(), None);
        assert!(idle.result.is_none() && idle.failure.is_none());

        let processing = JobSnapshot::capture(
            &JobState::Processing {
                job_id: job_id.clone(),
                progress: Progress::new(45),
                strategy: Some(StrategyKind::Polling),
            },
            1,
            Some("a.pdf"),
        );
        assert_eq!(processing.stage, Some(Stage::Detecting));
        assert_eq!(processing.strategy, Some(StrategyKind::Polling));
        assert_eq!(processing.filename.as_deref(), Some("a.pdf"));

        let completed = JobSnapshot::capture(
            &JobState::Completed {
                job_id: job_id.clone(),
                result: ResultLocator::new("R1"),
            },
            1,
            None,
        );
        assert_eq!(completed.progress, Some(Progress::COMPLETE));
        assert_eq!(completed.current_step_index(), Some(4));
        assert_eq!(completed.result, Some(ResultLocator::new("R1")));
        assert!(completed.failure.is_none());

        let failed = JobSnapshot::capture(
            &JobState::Error {
                job_id: Some(job_id),
                failure: JobFailure::new(FailureKind::Poll, "boom"),
            },
            1,
            None,
        );
        assert_eq!(failed.progress, None);
        assert!(failed.result.is_none());
        assert_eq!(failed.failure.map(|f| f.kind), Some(FailureKind::Poll));
    }

    #[test]
    fn test_snapshot_serializes_camel_case() {
        let snapshot = JobSnapshot::capture(
            &JobState::Processing {
                job_id: JobId::new("j1"),
                progress: Progress::new(20),
                strategy: None,
            },
            3,
            None,
        );
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["jobId"], "j1");
        assert_eq!(json["phase"], "processing");
        assert_eq!(json["progress"], 20);
        assert_eq!(json["stage"], "analyzing");
        assert!(json.get("result").is_none());
        assert!(json.get("updatedAt").is_some());
    }
}
