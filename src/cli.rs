//! Command-line argument parsing with clap.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::archive::StatRecord;
use crate::config::{Config, ExtractLimits};
use crate::error::SourceError;
use crate::source::CaptureFiles;

/// Decode file and log captures saved from a container runtime.
#[derive(Parser, Debug, Clone)]
#[command(name = "ctrpeek")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output format.
    #[arg(short, long, value_enum, env = "CTRPEEK_FORMAT", default_value_t = Format::Text)]
    pub format: Format,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Format {
    /// Human-readable output.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Print the single file a copy capture holds.
    File(CopyArgs),

    /// List every entry a copy capture holds.
    Files(CopyArgs),

    /// Print a multiplexed log capture.
    Logs(LogsArgs),
}

/// A tar capture of `PATH` copied out of `CONTAINER`.
#[derive(Args, Debug, Clone)]
pub struct CopyArgs {
    /// Container the capture was taken from.
    #[arg(short, long)]
    pub container: String,

    /// Path inside the container the capture was taken of.
    #[arg(short, long)]
    pub path: String,

    /// Saved tar stream (`.tar`, `.tar.gz`, `.tar.bz2`); `-` reads stdin.
    #[arg(long, value_name = "FILE")]
    pub capture: PathBuf,

    /// Path-stat header the runtime sent with the stream (base64 JSON).
    #[arg(long, value_name = "HEADER")]
    pub stat: Option<String>,

    /// Lift the file and extension-header size limits (trusted captures only).
    #[arg(long)]
    pub no_limits: bool,
}

impl CopyArgs {
    /// Source replaying this capture.
    pub fn source(&self) -> Result<CaptureFiles, SourceError> {
        let mut source = CaptureFiles::new().with_archive(&self.capture);
        if let Some(header) = &self.stat {
            source = source.with_stat(StatRecord::from_header(header)?);
        }
        Ok(source)
    }

    pub fn config(&self) -> Config {
        let limits = if self.no_limits {
            ExtractLimits::permissive()
        } else {
            ExtractLimits::default()
        };
        Config {
            limits,
            ..Default::default()
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct LogsArgs {
    /// Container the capture was taken from.
    #[arg(short, long)]
    pub container: String,

    /// Saved log stream; `-` reads stdin.
    #[arg(long, value_name = "FILE")]
    pub capture: PathBuf,

    /// The capture was taken without timestamps.
    #[arg(long)]
    pub no_timestamps: bool,
}

impl LogsArgs {
    pub fn source(&self) -> CaptureFiles {
        CaptureFiles::new().with_logs(&self.capture)
    }
}
