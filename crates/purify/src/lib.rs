pub mod broadcast;
pub mod config;
pub mod document;
pub mod error;
pub mod gateway;
pub mod job;

pub use broadcast::{JobProgressBroadcaster, JobProgressEvent};
pub use config::{load_config, ClientConfig};
pub use document::SourceDocument;
pub use error::{ConfigError, DocumentError, PurifyError, Result, ValidationError};
pub use gateway::{Gateway, GatewayError, HttpGateway, JobId, ResultLocator};
pub use job::{
    ControllerError, ControllerSettings, FailureKind, JobController, JobEvent, JobFailure,
    JobObserver, JobSnapshot, Phase, Progress, Stage,
};
