//! HTTP implementation of the transport gateway.

use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, Url};

use super::error::{GatewayError, Result};
use super::types::{
    ApiErrorBody, JobId, PollReport, ProcessResponse, ResultLocator, StartOutcome,
    StatusResponse, UploadResponse,
};
use super::Gateway;
use crate::config::ApiConfig;
use crate::document::SourceDocument;

/// Maximum length for error bodies echoed into messages and logs.
const MAX_ERROR_BODY_LENGTH: usize = 200;

/// Truncates a raw error body so an HTML error page does not flood the log.
fn truncate_error_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() > MAX_ERROR_BODY_LENGTH {
        let head: String = trimmed.chars().take(MAX_ERROR_BODY_LENGTH).collect();
        format!("{}... (truncated)", head)
    } else {
        trimmed.to_string()
    }
}

/// Gateway speaking the service's HTTP/JSON protocol.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: Client,
    base_url: Url,
    health_timeout: std::time::Duration,
}

impl HttpGateway {
    /// Creates a gateway from API settings.
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let base_url =
            Url::parse(&config.base_url).map_err(|e| GatewayError::InvalidUrl(e.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(GatewayError::InvalidUrl(format!(
                "'{}' cannot be used as a base URL",
                config.base_url
            )));
        }

        let client = Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| GatewayError::Client(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            health_timeout: config.health_timeout(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Public URL of the cleaned artifact for a job.
    pub fn download_url(&self, job: &JobId) -> Result<Url> {
        self.endpoint(&["download", job.as_str()])
    }

    /// Returns whether `GET /health` answers with a success status.
    pub async fn health_check(&self) -> bool {
        let url = match self.endpoint(&["health"]) {
            Ok(url) => url,
            Err(e) => {
                warn!("Health check skipped: {}", e);
                return false;
            }
        };

        info!("Health check: {}", url);
        match self
            .client
            .get(url)
            .timeout(self.health_timeout)
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => {
                info!("Backend is healthy ({})", response.status());
                true
            }
            Ok(response) => {
                warn!("Backend health check failed: {}", response.status());
                false
            }
            Err(e) => {
                warn!("Backend health check failed: {}", e);
                false
            }
        }
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| GatewayError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Turns a response into an error if its status is not a success.
    async fn check_status(response: Response) -> Result<Response> {
        let status = response.status();
        debug!("API Response: {} {}", status, response.url().path());
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<ApiErrorBody>(&body)
            .ok()
            .and_then(ApiErrorBody::into_detail)
            .unwrap_or_else(|| {
                let body = truncate_error_body(&body);
                if body.is_empty() {
                    format!("HTTP {}", status)
                } else {
                    format!("HTTP {}: {}", status, body)
                }
            });

        warn!("API Response Error: {} {}", status, detail);
        Err(GatewayError::Status {
            status: status.as_u16(),
            detail,
        })
    }
}

#[async_trait]
impl Gateway for HttpGateway {
    async fn submit(&self, document: &SourceDocument) -> Result<JobId> {
        let url = self.endpoint(&["upload"])?;
        info!(
            "Uploading file: {} ({} bytes)",
            document.filename(),
            document.size()
        );
        debug!("API Request: POST {}", url);

        let part = Part::bytes(document.bytes().to_vec())
            .file_name(document.filename().to_string())
            .mime_str(document.mime_type())?;
        let form = Form::new().part("file", part);

        let response = self.client.post(url).multipart(form).send().await?;
        let response = Self::check_status(response).await?;
        let upload: UploadResponse = response.json().await?;

        info!(
            "Upload successful: {} ({}: {})",
            upload.file_id, upload.status, upload.message
        );
        Ok(JobId::new(upload.file_id))
    }

    async fn start(&self, job: &JobId) -> Result<StartOutcome> {
        let url = self.endpoint(&["remove_watermark", job.as_str()])?;
        debug!("API Request: POST {}", url);

        let response = self.client.post(url).send().await?;
        let response = Self::check_status(response).await?;
        let process: ProcessResponse = response.json().await?;

        info!(
            "Start response for {}: {} ({})",
            job, process.status, process.message
        );
        if process.is_immediate() {
            Ok(StartOutcome::Immediate {
                result: self.result_locator(job),
            })
        } else {
            Ok(StartOutcome::Pending)
        }
    }

    async fn poll(&self, job: &JobId) -> Result<PollReport> {
        let url = self.endpoint(&["status", job.as_str()])?;
        debug!("API Request: GET {}", url);

        let response = self.client.get(url).send().await?;
        let response = Self::check_status(response).await?;
        let status: StatusResponse = response.json().await?;

        debug!(
            "Status for {}: {} (progress: {:?})",
            status.file_id, status.status, status.progress
        );
        Ok(status.into_report())
    }

    async fn fetch_result(&self, job: &JobId) -> Result<Vec<u8>> {
        let url = self.download_url(job)?;
        debug!("API Request: GET {}", url);

        let response = self.client.get(url).send().await?;
        let response = Self::check_status(response).await?;
        let bytes = response.bytes().await?;

        info!("Downloaded {} bytes for {}", bytes.len(), job);
        Ok(bytes.to_vec())
    }

    fn result_locator(&self, job: &JobId) -> ResultLocator {
        match self.download_url(job) {
            Ok(url) => ResultLocator::new(url.to_string()),
            Err(_) => ResultLocator::new(format!("/download/{}", job)),
        }
    }
}
