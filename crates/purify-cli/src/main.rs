mod cli;
mod commands;
mod progress;

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

use cli::Cli;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli);

    tracing::debug!("Starting purify v{}", env!("CARGO_PKG_VERSION"));

    match commands::run(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {}", err);
            ExitCode::FAILURE
        }
    }
}

/// Routes `log` records into tracing and installs the subscriber.
///
/// `RUST_LOG` takes precedence over `-v`.
fn init_tracing(cli: &Cli) {
    if let Err(e) = tracing_log::LogTracer::init() {
        eprintln!("Failed to forward log records to tracing: {}", e);
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_directive()));
    let json = cli
        .json_logs
        .then(|| fmt::layer().json().with_writer(std::io::stderr));
    let human = (!cli.json_logs).then(|| {
        fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
    });

    let subscriber = Registry::default().with(filter).with(json).with(human);
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        tracing::warn!("Tracing subscriber already set; skipping re-initialization.");
    }
}
