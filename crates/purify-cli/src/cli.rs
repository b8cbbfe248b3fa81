use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

/// Remove branded watermarks from PDF files using the PurifyPDF service.
#[derive(Debug, Parser)]
#[command(name = "purify", version, about)]
pub struct Cli {
    /// Path to a JSON config file. Defaults to <config dir>/purify/config.json.
    #[arg(short, long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Base URL of the processing service. Overrides config and PURIFY_API_URL.
    #[arg(long, global = true, value_name = "URL")]
    pub api_url: Option<String>,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Upload a PDF, wait for processing and save the cleaned file.
    Process(ProcessArgs),
    /// Check whether the processing service is reachable.
    Health,
    /// Query the processing status of an uploaded file once.
    Status(StatusArgs),
}

#[derive(Debug, Args)]
pub struct ProcessArgs {
    /// PDF file to clean.
    pub file: PathBuf,

    /// Where to write the cleaned PDF. Defaults to cleaned_<name> next to the input.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Disable the progress bar.
    #[arg(long)]
    pub no_progress: bool,
}

#[derive(Debug, Args)]
pub struct StatusArgs {
    /// File id returned by the upload.
    pub file_id: String,

    /// Print the raw report as JSON.
    #[arg(long)]
    pub json: bool,
}

impl Cli {
    /// Log filter directive for the requested verbosity.
    pub fn log_directive(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}
