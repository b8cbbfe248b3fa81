use std::time::Duration;

use crate::config::ClientConfig;

/// Timing values that drive a job run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerSettings {
    pub poll_interval: Duration,
    /// Measured from the moment the job entered `Processing`.
    pub poll_deadline: Duration,
    /// Pause after each simulated stage, starting with `Analyzing`.
    pub step_delays: Vec<Duration>,
}

impl ControllerSettings {
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            poll_interval: config.polling.interval(),
            poll_deadline: config.polling.deadline(),
            step_delays: config.simulation.step_delays(),
        }
    }
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self::from_config(&ClientConfig::default())
    }
}
