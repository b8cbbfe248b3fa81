//! Transport gateway to the remote processing service.
//!
//! [`Gateway`] is the seam the controller is written against; [`HttpGateway`]
//! is the production implementation speaking the HTTP/JSON protocol.

pub mod error;
pub mod http;
pub mod types;

use async_trait::async_trait;

use crate::document::SourceDocument;

pub use error::GatewayError;
pub use http::HttpGateway;
pub use types::{JobId, PollReport, RemoteStatus, ResultLocator, StartOutcome};

/// The four remote operations a job needs.
///
/// Implementations must not retry `submit` or `start` on their own.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Uploads a document and returns the identifier of the new job.
    async fn submit(&self, document: &SourceDocument) -> error::Result<JobId>;

    /// Asks the backend to begin processing.
    async fn start(&self, job: &JobId) -> error::Result<StartOutcome>;

    /// Queries current status. Safe to call repeatedly.
    async fn poll(&self, job: &JobId) -> error::Result<PollReport>;

    /// Downloads the finished artifact.
    async fn fetch_result(&self, job: &JobId) -> error::Result<Vec<u8>>;

    /// Locator for a job whose completion was observed by polling.
    fn result_locator(&self, job: &JobId) -> ResultLocator;
}
