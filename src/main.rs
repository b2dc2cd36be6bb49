mod core;
mod input;
mod playback;
mod settings;

use anyhow::{Context, Result};
use clap::Parser;
use playback::{Coordinator, PlaybackOutcome, StdoutSink};
use settings::Settings;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Replay recorded worker messages as a synchronized timeline
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    /// Records file (JSON lines, JSON array or CSV)
    records: PathBuf,

    /// Settings file (defaults to the user config directory)
    #[clap(short, long, value_parser)]
    config: Option<PathBuf>,

    /// Number of workers
    #[clap(short, long)]
    workers: Option<usize>,

    /// Multiplier applied to every record interval
    #[clap(short, long)]
    scale: Option<u32>,

    /// Milliseconds to wait before releasing the start barrier
    #[clap(long)]
    grace_ms: Option<u64>,

    /// Exit once every worker is done instead of waiting for the full interval sum
    #[clap(long)]
    until_complete: bool,

    /// Write the effective settings back to the settings file
    #[clap(long)]
    save_settings: bool,

    /// Enable verbose logging (can be specified multiple times)
    #[clap(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn settings_path(&self) -> Option<PathBuf> {
        self.config.clone().or_else(Settings::config_path)
    }

    /// Settings file values with command line overrides applied
    fn settings(&self) -> Result<Settings> {
        let mut settings = match self.settings_path() {
            Some(path) => Settings::load(&path)?,
            None => Settings::default(),
        };

        if let Some(workers) = self.workers {
            settings.worker_count = workers;
        }
        if let Some(scale) = self.scale {
            settings.pacing_scale_factor = scale;
        }
        if let Some(grace_ms) = self.grace_ms {
            settings.start_barrier_grace_ms = grace_ms;
        }
        if self.until_complete {
            settings.return_on_completion = true;
        }

        Ok(settings)
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // Logs go to stderr, the timeline owns stdout
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let settings = cli.settings()?;
    if cli.save_settings {
        let path = cli.settings_path().context("No settings location available")?;
        settings.save(&path)?;
        info!("Saved settings to {}", path.display());
    }

    let records = input::load_file(&cli.records)?;

    let coordinator = Coordinator::new(settings.playback_config(), Arc::new(StdoutSink))?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Interrupt received, stopping playback");
                on_interrupt.cancel();
            }
            Err(e) => warn!("Unable to listen for interrupt: {}", e),
        }
    });

    let outcome = coordinator
        .run(&records, cancel)
        .await
        .with_context(|| format!("Playback of {} failed", cli.records.display()))?;

    if outcome == PlaybackOutcome::Cancelled {
        info!("Playback cancelled");
    }
    for (slot, entry) in coordinator.board().snapshot().iter().enumerate() {
        debug!(
            "Slot {}: last sender {}, last message {:?}",
            slot + 1,
            entry.last_sender,
            entry.last_message
        );
    }

    Ok(())
}
