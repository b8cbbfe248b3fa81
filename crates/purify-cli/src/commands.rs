//! Command implementations.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use log::{debug, info, warn};
use purify::config::{apply_env_overrides, load_config, validate_config};
use purify::gateway::{Gateway, GatewayError, HttpGateway, JobId};
use purify::job::ControllerSettings;
use purify::{ClientConfig, JobController, JobFailure, Phase, PurifyError, SourceDocument};
use thiserror::Error;
use tokio::sync::Notify;

use crate::cli::{Cli, Command, ProcessArgs, StatusArgs};
use crate::progress::TerminalObserver;

/// Exit code used when the job was cancelled with Ctrl-C.
const EXIT_INTERRUPTED: u8 = 130;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Purify(#[from] PurifyError),

    #[error("Failed to install Ctrl-C handler: {0}")]
    Signal(#[from] ctrlc::Error),

    #[error("Failed to write '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub async fn run(cli: Cli) -> Result<ExitCode, CliError> {
    let config = resolve_config(&cli)?;
    info!("Using processing service at {}", config.api.base_url);

    match cli.command {
        Command::Process(args) => process(&config, args).await,
        Command::Health => health(&config).await,
        Command::Status(args) => status(&config, args).await,
    }
}

/// Default location of the config file.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("purify").join("config.json"))
}

/// Loads config from `--config`, the default path, or built-in defaults,
/// then applies `PURIFY_API_URL` and `--api-url` in that order.
fn resolve_config(cli: &Cli) -> purify::Result<ClientConfig> {
    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => match default_config_path() {
            Some(path) if path.is_file() => {
                info!("Loading config from {}", path.display());
                load_config(&path)?
            }
            _ => ClientConfig::default(),
        },
    };

    let mut config = apply_env_overrides(config)?;
    if let Some(url) = &cli.api_url {
        config.api.base_url = url.clone();
        validate_config(&config)?;
    }
    Ok(config)
}

fn connect(config: &ClientConfig) -> purify::Result<HttpGateway> {
    Ok(HttpGateway::new(&config.api)?)
}

/// `cleaned_<name>` next to the input.
fn default_output_path(input: &Path, filename: &str) -> PathBuf {
    input.with_file_name(format!("cleaned_{}", filename))
}

/// Fetches the finished artifact unless an interrupt arrives first.
///
/// Returns `None` when interrupted.
async fn download(
    controller: &JobController,
    interrupted: &Notify,
) -> purify::Result<Option<Vec<u8>>> {
    tokio::select! {
        biased;
        _ = interrupted.notified() => Ok(None),
        bytes = controller.fetch_result() => Ok(Some(bytes?)),
    }
}

async fn process(config: &ClientConfig, args: ProcessArgs) -> Result<ExitCode, CliError> {
    let document = SourceDocument::from_path(&args.file)
        .await
        .map_err(PurifyError::from)?;
    if let Err(rejection) = document.validate(&config.upload) {
        let failure = JobFailure::from(&rejection);
        warn!("Rejected {}: {}", document.filename(), failure);
        eprintln!("{}", failure);
        return Ok(ExitCode::FAILURE);
    }

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&args.file, document.filename()));

    let gateway = Arc::new(connect(config)?);
    let observer = Arc::new(if args.no_progress {
        TerminalObserver::hidden()
    } else {
        TerminalObserver::new()
    });
    let controller = JobController::with_observer(
        gateway,
        ControllerSettings::from_config(config),
        observer,
    );

    // Ctrl-C cancels a running job and aborts a download in progress.
    let interrupted = Arc::new(Notify::new());
    let handler_controller = controller.clone();
    let handler_interrupted = Arc::clone(&interrupted);
    ctrlc::set_handler(move || {
        if let Err(e) = handler_controller.cancel() {
            debug!("Interrupt outside a running job: {}", e);
        }
        handler_interrupted.notify_one();
    })?;

    controller
        .submit_document(document)
        .map_err(PurifyError::from)?;
    let snapshot = controller.wait_until_settled().await;

    match snapshot.phase {
        Phase::Completed => {
            let Some(bytes) = download(&controller, &interrupted).await? else {
                eprintln!("Cancelled");
                return Ok(ExitCode::from(EXIT_INTERRUPTED));
            };
            tokio::fs::write(&output, &bytes)
                .await
                .map_err(|source| CliError::Write {
                    path: output.clone(),
                    source,
                })?;
            info!("Saved {} bytes to {}", bytes.len(), output.display());
            println!("{}", output.display());
            Ok(ExitCode::SUCCESS)
        }
        Phase::Error => {
            if let Some(failure) = snapshot.failure {
                eprintln!("{}", failure);
            }
            Ok(ExitCode::FAILURE)
        }
        _ => {
            eprintln!("Cancelled");
            Ok(ExitCode::from(EXIT_INTERRUPTED))
        }
    }
}

async fn health(config: &ClientConfig) -> Result<ExitCode, CliError> {
    let gateway = connect(config)?;
    if gateway.health_check().await {
        println!("{} is reachable", gateway.base_url());
        Ok(ExitCode::SUCCESS)
    } else {
        eprintln!("{}", GatewayError::Unreachable);
        Ok(ExitCode::FAILURE)
    }
}

async fn status(config: &ClientConfig, args: StatusArgs) -> Result<ExitCode, CliError> {
    let gateway = connect(config)?;
    let job = JobId::new(args.file_id);
    let report = gateway.poll(&job).await.map_err(PurifyError::from)?;

    if args.json {
        let value = serde_json::json!({
            "file_id": job.as_str(),
            "status": report.status,
            "progress": report.progress,
            "message": report.message,
        });
        println!("{}", value);
    } else {
        let progress = report
            .progress
            .map(|p| format!(" {}%", p))
            .unwrap_or_default();
        let message = report
            .message
            .map(|m| format!(" - {}", m))
            .unwrap_or_default();
        println!("{}: {:?}{}{}", job, report.status, progress, message);
    }
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use clap::Parser;
    use purify::gateway::{PollReport, ResultLocator, StartOutcome};
    use purify::ControllerError;
    use std::time::Duration;

    /// Finishes every job during `start`; downloads optionally never answer.
    struct ImmediateGateway {
        stall_download: bool,
    }

    #[async_trait]
    impl Gateway for ImmediateGateway {
        async fn submit(&self, _document: &SourceDocument) -> Result<JobId, GatewayError> {
            Ok(JobId::new("job-1"))
        }

        async fn start(&self, job: &JobId) -> Result<StartOutcome, GatewayError> {
            Ok(StartOutcome::Immediate {
                result: self.result_locator(job),
            })
        }

        async fn poll(&self, _job: &JobId) -> Result<PollReport, GatewayError> {
            Ok(PollReport::pending(None))
        }

        async fn fetch_result(&self, _job: &JobId) -> Result<Vec<u8>, GatewayError> {
            if self.stall_download {
                std::future::pending().await
            } else {
                Ok(b"%PDF-clean".to_vec())
            }
        }

        fn result_locator(&self, job: &JobId) -> ResultLocator {
            ResultLocator::new(format!("/download/{}", job))
        }
    }

    async fn completed_controller(stall_download: bool) -> JobController {
        let settings = ControllerSettings {
            step_delays: Vec::new(),
            ..ControllerSettings::default()
        };
        let controller =
            JobController::new(Arc::new(ImmediateGateway { stall_download }), settings);
        controller
            .submit_document(SourceDocument::new("deck.pdf", b"%PDF-1.7".to_vec()))
            .unwrap();
        assert_eq!(controller.wait_until_settled().await.phase, Phase::Completed);
        controller
    }

    #[tokio::test]
    async fn test_interrupt_aborts_download() {
        let controller = completed_controller(true).await;
        let interrupted = Arc::new(Notify::new());

        let handler_controller = controller.clone();
        let handler_interrupted = Arc::clone(&interrupted);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            // What the Ctrl-C handler does once the job has completed.
            assert!(matches!(
                handler_controller.cancel(),
                Err(ControllerError::InvalidPhase { .. })
            ));
            handler_interrupted.notify_one();
        });

        let outcome = tokio::time::timeout(
            Duration::from_secs(5),
            download(&controller, &interrupted),
        )
        .await
        .expect("download should stop on interrupt")
        .unwrap();
        assert!(outcome.is_none());
        assert_eq!(controller.snapshot().phase, Phase::Completed);
    }

    #[tokio::test]
    async fn test_download_without_interrupt_returns_bytes() {
        let controller = completed_controller(false).await;
        let interrupted = Notify::new();

        let bytes = download(&controller, &interrupted).await.unwrap();
        assert_eq!(bytes, Some(b"%PDF-clean".to_vec()));
    }

    #[test]
    fn test_default_output_path_is_next_to_input() {
        assert_eq!(
            default_output_path(Path::new("/tmp/docs/deck.pdf"), "deck.pdf"),
            PathBuf::from("/tmp/docs/cleaned_deck.pdf")
        );
        assert_eq!(
            default_output_path(Path::new("deck.pdf"), "deck.pdf"),
            PathBuf::from("cleaned_deck.pdf")
        );
    }

    #[test]
    fn test_config_from_explicit_path_and_flag() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "version": "1.0", "polling": { "interval_ms": 500 } }"#)
            .unwrap();

        let cli = Cli::try_parse_from([
            "purify",
            "--config",
            path.to_str().unwrap(),
            "--api-url",
            "https://purify.example.com",
            "health",
        ])
        .unwrap();

        let config = resolve_config(&cli).unwrap();
        assert_eq!(config.polling.interval_ms, 500);
        assert_eq!(config.api.base_url, "https://purify.example.com");
    }

    #[test]
    fn test_invalid_api_url_flag_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "version": "1.0" }"#).unwrap();

        let cli = Cli::try_parse_from([
            "purify",
            "--config",
            path.to_str().unwrap(),
            "--api-url",
            "localhost",
            "health",
        ])
        .unwrap();

        assert!(matches!(
            resolve_config(&cli),
            Err(PurifyError::Config(_))
        ));
    }

    #[test]
    fn test_library_failure_renders_through_purify_error() {
        let err = CliError::from(PurifyError::from(GatewayError::Unreachable));
        assert!(matches!(err, CliError::Purify(PurifyError::Gateway(_))));
        assert_eq!(
            format!("Error: {}", err),
            "Error: Transport error: Cannot connect to server. Please check if the backend is running."
        );
    }
}
