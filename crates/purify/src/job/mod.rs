//! Job orchestration: lifecycle state, progress strategies and the controller.

pub mod controller;
pub mod error;
pub mod events;
pub mod settings;
pub mod state;
pub mod strategy;

pub use controller::JobController;
pub use error::{ControllerError, FailureKind, JobFailure};
pub use events::{JobEvent, JobObserver, NoopObserver};
pub use settings::ControllerSettings;
pub use state::{JobSnapshot, Phase, Progress, Stage, StrategyKind};
pub use strategy::{PollingLoop, ProgressStrategy, SimulatedSteps};
