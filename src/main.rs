use anyhow::Context;
use colored::*;
use std::io::{self, Write};
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use ctrpeek::cli::{Cli, Commands};
use ctrpeek::output;
use ctrpeek::{ContainerReader, FetchError, FetchFailure, Fetched};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if is_broken_pipe(&e) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {e:#}", "Error:".red().bold());
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let format = cli.format;
    let mut stdout = io::stdout().lock();
    let mut stderr = io::stderr();

    match cli.command {
        Commands::File(args) => {
            let reader = ContainerReader::with_config(Arc::new(args.source()?), args.config());
            let fetched = reader.read_file(&args.container, &args.path).await;
            let (record, stat) = settle(&mut stderr, fetched)?
                .with_context(|| format!("reading {} from {}", args.path, args.capture.display()))?;
            output::write_file(&mut stdout, format, &record, &stat)?;
        }
        Commands::Files(args) => {
            let reader = ContainerReader::with_config(Arc::new(args.source()?), args.config());
            let fetched = reader.read_files(&args.container, &args.path).await;
            let result = settle(&mut stderr, fetched)?
                .with_context(|| format!("listing {} from {}", args.path, args.capture.display()))?;
            output::write_files(&mut stdout, format, &result)?;
        }
        Commands::Logs(args) => {
            let reader = ContainerReader::new(Arc::new(args.source()));
            let fetched = reader.read_logs(&args.container, Some(!args.no_timestamps)).await;
            let records = settle(&mut stderr, fetched)?
                .with_context(|| format!("decoding logs from {}", args.capture.display()))?;
            output::write_logs(&mut stdout, format, &records)?;
        }
    }

    stdout.flush()?;
    Ok(())
}

/// Print cleanup warnings whether or not the read succeeded, so they land
/// ahead of any error report.
fn settle<T, W: Write>(
    stderr: &mut W,
    fetched: Result<Fetched<T>, FetchFailure>,
) -> io::Result<Result<T, FetchError>> {
    match fetched {
        Ok(fetched) => {
            output::write_warnings(stderr, &fetched.warnings)?;
            Ok(Ok(fetched.value))
        }
        Err(failure) => {
            let (error, warnings) = failure.into_parts();
            output::write_warnings(stderr, &warnings)?;
            Ok(Err(error))
        }
    }
}

/// Output piped to a command like `head` that exits early
fn is_broken_pipe(err: &anyhow::Error) -> bool {
    err.downcast_ref::<io::Error>()
        .is_some_and(|e| e.kind() == io::ErrorKind::BrokenPipe)
}
