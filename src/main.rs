//! CLI entry point for the playlist grabber tool.

use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Local, Utc};
use clap::Parser;
use playlist_grabber_core::extractor::YtDlp;
use playlist_grabber_core::output::{
    LinkListOptions, generate_output_filename, write_json_report, write_link_file,
};
use playlist_grabber_core::resolve::{Orchestrator, ProgressObserver, ReportSummary};
use playlist_grabber_core::{PlaylistSource, validate_playlist_url};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

mod app_config;
mod cli;
mod progress;

use app_config::{default_log_level, effective_settings, load_default_file_config};
use cli::Args;
use progress::BarObserver;

/// How a run ended, mapped to the process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunStatus {
    /// Every entry resolved or was skipped.
    Complete,
    /// Some entries failed, but a link file was written.
    Partial,
    /// Nothing resolved; no file was written.
    NothingResolved,
    /// The user interrupted the run.
    Cancelled,
}

impl RunStatus {
    fn from_summary(summary: &ReportSummary, cancelled: bool) -> Self {
        if cancelled {
            Self::Cancelled
        } else if summary.resolved == 0 {
            Self::NothingResolved
        } else if summary.failed > 0 {
            Self::Partial
        } else {
            Self::Complete
        }
    }

    fn exit_code(self) -> ExitCode {
        match self {
            Self::Complete => ExitCode::SUCCESS,
            Self::Partial => ExitCode::from(2),
            Self::NothingResolved => ExitCode::from(1),
            Self::Cancelled => ExitCode::from(130),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Config verbosity feeds the log level, so load it before tracing and
    // report a load failure once logging is up.
    let loaded = load_default_file_config();
    let file_config = loaded
        .as_ref()
        .map(|loaded| loaded.config.clone())
        .unwrap_or_default();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > config > info
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(default_level_filter(&args, &file_config))
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let loaded = match loaded {
        Ok(loaded) => loaded,
        Err(err) => {
            error!(error = %format!("{err:#}"), "invalid configuration file");
            return ExitCode::from(1);
        }
    };
    debug!(?args, "CLI arguments parsed");
    debug!(
        path = ?loaded.path,
        loaded_from_file = loaded.loaded_from_file,
        "configuration resolved"
    );

    match run(args, &loaded.config).await {
        Ok(status) => status.exit_code(),
        Err(err) => {
            error!(error = %format!("{err:#}"), "playlist grabber failed");
            ExitCode::from(1)
        }
    }
}

fn default_level_filter(args: &Args, file_config: &app_config::FileConfig) -> String {
    // Keep dependency noise down; our own crates follow the chosen level.
    let level = default_log_level(args, file_config);
    format!("warn,playlist_grabber={level},playlist_grabber_core={level}")
}

async fn run(args: Args, file_config: &app_config::FileConfig) -> Result<RunStatus> {
    let settings = effective_settings(&args, file_config);
    let url = validate_playlist_url(&args.playlist_url)?;

    let extractor = Arc::new(
        settings
            .yt_dlp
            .clone()
            .map_or_else(YtDlp::default, YtDlp::new),
    );
    // Validate before the (slow) playlist fetch so bad flags fail fast.
    let orchestrator = Orchestrator::new(extractor.clone(), settings.run.clone())
        .context("invalid run configuration")?;

    info!(url = %url, "fetching playlist");
    let mut playlist = extractor
        .fetch(url.as_str())
        .await
        .context("could not fetch playlist")?;
    for id in playlist.apply_overrides(&settings.overrides) {
        warn!(id = %id, "quality override does not match any video in the playlist");
    }
    info!(
        title = %playlist.title,
        videos = playlist.len(),
        strategy = %orchestrator.config().strategy(),
        quality = %orchestrator.config().quality(),
        "playlist fetched"
    );

    let cancel = CancellationToken::new();
    spawn_ctrl_c_handler(cancel.clone());

    let show_bar = !args.quiet && io::stderr().is_terminal();
    let bar = Arc::new(BarObserver::new(playlist.len(), show_bar));
    let observer: Arc<dyn ProgressObserver> = bar.clone();
    let report = orchestrator
        .run_playlist(&playlist, Some(observer), cancel.clone())
        .await?;
    bar.finish();

    let summary = report.summary;
    let status = RunStatus::from_summary(&summary, cancel.is_cancelled());

    for item in report.failed_items() {
        warn!(
            position = item.entry.position + 1,
            id = %item.entry.id,
            title = %item.entry.title,
            outcome = ?item.outcome,
            "video could not be resolved"
        );
    }

    if let Some(json_path) = &settings.json {
        write_json_report(json_path, &report, &playlist.title, Utc::now())?;
        info!(path = %json_path.display(), "JSON report written");
    }

    if summary.resolved == 0 {
        error!(
            total = summary.total,
            skipped = summary.skipped,
            failed = summary.failed,
            "no URLs resolved; nothing written"
        );
        return Ok(status);
    }

    let now = Local::now();
    let output_path = settings.output.clone().unwrap_or_else(|| {
        let name = PathBuf::from(generate_output_filename(&playlist.title, &now));
        match &settings.output_dir {
            Some(dir) => dir.join(name),
            None => name,
        }
    });
    let written = write_link_file(
        &output_path,
        &report,
        &playlist.title,
        &now,
        LinkListOptions {
            name_fragment: settings.name_fragment,
        },
    )?;

    info!(
        resolved = summary.resolved,
        skipped = summary.skipped,
        failed = summary.failed,
        cancelled = summary.cancelled,
        total = summary.total,
        "resolution complete"
    );
    info!(path = %output_path.display(), urls = written, "link file written");
    if !args.quiet {
        println!("{}", output_path.display());
    }

    Ok(status)
}

fn spawn_ctrl_c_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if watch_interrupts(tokio::signal::ctrl_c, &cancel).await {
            warn!("second interrupt received; exiting immediately");
            std::process::exit(130);
        }
    });
}

/// Cancels the run on the first interrupt. Returns true when a second
/// interrupt arrives and the process should stop without waiting.
async fn watch_interrupts<F, Fut>(mut next_interrupt: F, cancel: &CancellationToken) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = io::Result<()>>,
{
    if next_interrupt().await.is_err() {
        return false;
    }
    warn!("interrupt received; finishing in-flight requests (Ctrl-C again to exit now)");
    cancel.cancel();
    next_interrupt().await.is_ok()
}
