//! Progress strategy selection.
//!
//! After the job is started exactly one strategy observes its progress: a
//! simulated walk through the stages when the backend already finished, or a
//! polling loop when the work is still pending. The controller matches on the
//! variant and drives it.

use std::time::Duration;

use tokio::time::Instant;

use super::settings::ControllerSettings;
use super::state::{Stage, StrategyKind};
use crate::gateway::{ResultLocator, StartOutcome};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressStrategy {
    Simulated(SimulatedSteps),
    Polling(PollingLoop),
}

impl ProgressStrategy {
    /// Picks the strategy for a start outcome.
    pub fn select(
        outcome: StartOutcome,
        settings: &ControllerSettings,
        processing_started: Instant,
    ) -> Self {
        match outcome {
            StartOutcome::Immediate { result } => ProgressStrategy::Simulated(SimulatedSteps {
                result,
                delays: settings.step_delays.clone(),
            }),
            StartOutcome::Pending => ProgressStrategy::Polling(PollingLoop {
                interval: settings.poll_interval,
                deadline: processing_started + settings.poll_deadline,
                deadline_after: settings.poll_deadline,
            }),
        }
    }

    pub fn kind(&self) -> StrategyKind {
        match self {
            ProgressStrategy::Simulated(_) => StrategyKind::Simulated,
            ProgressStrategy::Polling(_) => StrategyKind::Polling,
        }
    }
}

/// Stage walk for a job the backend finished during `start`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulatedSteps {
    pub result: ResultLocator,
    pub delays: Vec<Duration>,
}

impl SimulatedSteps {
    /// Every stage after `Uploading` with the pause that follows it.
    /// Missing delays count as zero.
    pub fn schedule(&self) -> Vec<(Stage, Duration)> {
        Stage::ALL[1..]
            .iter()
            .enumerate()
            .map(|(i, stage)| (*stage, self.delays.get(i).copied().unwrap_or_default()))
            .collect()
    }
}

/// Status polling for a job that is still pending remotely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollingLoop {
    pub interval: Duration,
    /// Absolute instant after which the job times out.
    pub deadline: Instant,
    /// Configured deadline, kept for the failure message.
    pub deadline_after: Duration,
}
