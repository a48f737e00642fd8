//! CLI entry point for the converter tool.

use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use converter_core::config::{FileConfig, load_default_file_config, load_file_config};
use converter_core::{
    ClientConfig, ConversionKind, ConversionResult, CsrfSource, DownloadExecutor, DownloadTarget,
    FileSet, HtmlMode, HttpTransport, Job, JobController, JobError, JobState, SelectedFile,
};
use reqwest::cookie::Jar;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

mod cli;
mod progress;

use cli::Args;
use progress::spawn_progress_ui;

/// Summary printed with `--json`.
#[derive(Debug, Serialize)]
struct JobSummary<'a> {
    seq: u64,
    kind: &'static str,
    state: JobState,
    #[serde(skip_serializing_if = "Option::is_none")]
    task_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<&'a ConversionResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    target: Option<&'a DownloadTarget>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a JobError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    saved_path: Option<PathBuf>,
}

impl<'a> JobSummary<'a> {
    fn new(job: &'a Job, saved_path: Option<PathBuf>) -> Self {
        Self {
            seq: job.seq,
            kind: job.kind.as_str(),
            state: job.state,
            task_id: job.task_id.as_deref(),
            result: job.result.as_ref(),
            target: job.target.as_ref(),
            error: job.error.as_ref(),
            saved_path,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");

    let file_config = load_config(&args)?;
    let config = client_config(&args, &file_config)?;
    let kind = apply_kind_options(args.kind, &args, &file_config);
    let output_dir = args
        .output_dir
        .clone()
        .or_else(|| file_config.output_dir.clone())
        .unwrap_or_else(|| PathBuf::from("."));

    let mut selected = Vec::with_capacity(args.files.len());
    for path in &args.files {
        let file = SelectedFile::from_path(path)
            .await
            .with_context(|| format!("Cannot read input file {}", path.display()))?;
        selected.push(file);
    }
    let files = FileSet::new(selected);

    let jar = Arc::new(Jar::default());
    let transport = HttpTransport::with_cookie_jar(config.timeouts, Arc::clone(&jar))
        .context("Failed to build HTTP client")?;
    let csrf = match args.csrf_token.clone().or_else(|| file_config.csrf_token.clone()) {
        Some(token) => CsrfSource::Token(token),
        None => {
            prime_csrf_cookie(&transport, &config.origin).await;
            CsrfSource::Cookie {
                jar: Arc::clone(&jar),
                name: config.csrf_cookie_name.clone(),
            }
        }
    };

    info!(
        kind = %kind,
        files = files.len(),
        bytes = files.total_bytes(),
        origin = %config.origin,
        "Converter starting"
    );

    let controller = JobController::new(kind, Arc::new(transport), config.clone(), csrf);
    let use_spinner = !args.quiet && !args.json && io::stderr().is_terminal();
    let (spinner, stop) = spawn_progress_ui(use_spinner, controller.subscribe(), kind.to_string());

    let handle = match controller.submit(files).await {
        Ok(handle) => handle,
        Err(error) => {
            stop.cancel();
            if let Some(spinner) = spinner {
                spinner.await.ok();
            }
            bail!("{error}");
        }
    };

    let job = tokio::select! {
        job = handle.wait() => job,
        Ok(()) = tokio::signal::ctrl_c() => {
            warn!("Interrupted, cancelling conversion");
            handle.cancel();
            handle.wait().await
        }
    };

    stop.cancel();
    if let Some(spinner) = spinner {
        spinner.await.ok();
    }
    controller.dispose().await;

    let target = match (job.state, job.target.as_ref()) {
        (JobState::Completed, Some(target)) => target,
        _ => {
            if args.json {
                print_json(&JobSummary::new(&job, None))?;
            }
            match &job.error {
                Some(error) => bail!("{error}"),
                None => bail!("Conversion ended in state {}", job.state),
            }
        }
    };

    info!(url = %target.url, filename = %target.filename, "Conversion complete");

    if args.no_download {
        if args.json {
            print_json(&JobSummary::new(&job, None))?;
        } else {
            println!("{}", target.url);
        }
        return Ok(());
    }

    let executor = DownloadExecutor::with_cookie_jar(&output_dir, config.timeouts, jar)
        .context("Failed to build HTTP client")?;
    let saved = executor
        .download(target, None)
        .await
        .context("Failed to download converted file")?;

    info!(path = %saved.path.display(), bytes = saved.bytes, "Saved converted file");
    if args.json {
        print_json(&JobSummary::new(&job, Some(saved.path)))?;
    } else {
        println!("{}", saved.path.display());
    }

    Ok(())
}

/// Visits the service root so its anti-forgery cookie lands in the jar.
///
/// Failure is not fatal: the upload then goes out without the header and the
/// service decides.
async fn prime_csrf_cookie(transport: &HttpTransport, origin: &str) {
    let url = format!("{}/", origin.trim_end_matches('/'));
    match transport.prime_cookies(&url, &CancellationToken::new()).await {
        Ok(status) => debug!(url = %url, status, "fetched service cookies"),
        Err(error) => warn!(url = %url, error = %error, "could not fetch service cookies"),
    }
}

/// Reads the config file named on the command line, else the default one.
fn load_config(args: &Args) -> Result<FileConfig> {
    if let Some(path) = &args.config {
        return load_file_config(path)
            .with_context(|| format!("Failed to load config {}", path.display()));
    }
    let loaded = load_default_file_config().context("Failed to load config")?;
    if let Some(path) = &loaded.path {
        debug!(path = %path.display(), found = loaded.config.is_some(), "config file lookup");
    }
    Ok(loaded.config.unwrap_or_default())
}

/// Builds the client config: defaults, then file values, then flags.
fn client_config(args: &Args, file: &FileConfig) -> Result<ClientConfig> {
    let mut config = ClientConfig::default();
    config.apply_file(file);
    if let Some(origin) = &args.origin {
        config.origin.clone_from(origin);
    }
    if let Some(ms) = args.poll_interval_ms {
        config.poll_interval = Duration::from_millis(ms);
    }
    if let Some(secs) = args.timeout_secs {
        config.job_timeout = Duration::from_secs(secs);
    }
    config.origin = config.origin.trim_end_matches('/').to_string();
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Fills in kind options the slug alone does not carry.
fn apply_kind_options(kind: ConversionKind, args: &Args, file: &FileConfig) -> ConversionKind {
    match kind {
        ConversionKind::PdfToHtml { .. } => ConversionKind::PdfToHtml {
            mode: args.html_mode.or(file.html_mode).unwrap_or(HtmlMode::Formatted),
        },
        ConversionKind::PdfToWord { .. } => ConversionKind::PdfToWord {
            preserve_graphics: !args.no_preserve_graphics
                && file.preserve_graphics.unwrap_or(true),
        },
        other => other,
    }
}

fn print_json(summary: &JobSummary<'_>) -> Result<()> {
    let rendered = serde_json::to_string_pretty(summary).context("Failed to render summary")?;
    println!("{rendered}");
    Ok(())
}
