mod app;
mod config;
mod renderer;

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

use anyhow::{Context as _, Result};
use clap::Parser;
use storyboard_core::{FetchResponse, InMemorySource, Session, Storyboard};
use storyboard_protocol::FetchRequest;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::app::{App, TuiSink};
use crate::config::TuiConfig;

#[derive(Parser, Debug)]
#[command(name = "storyboard", version, about = "Browse a storyboard dataset in the terminal")]
struct Cli {
    /// Dataset JSON (phenomena/events format or serialized frames).
    dataset: PathBuf,

    /// Viewer config JSON.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write logs here. Nothing is logged without it.
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Override the simulated fetch latency.
    #[arg(long)]
    latency_ms: Option<u64>,
}

/// Logs go to a file since the terminal is taken by the UI. Filtered by the
/// `STORYBOARD_LOG` variable.
fn init_tracing(log_file: Option<&Path>) -> Result<()> {
    let Some(path) = log_file else {
        return Ok(());
    };
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("STORYBOARD_LOG")
                .unwrap_or_else(|_| "storyboard_core=debug,storyboard=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .init();
    Ok(())
}

/// Serve fetches from the full dataset on a background thread, one level at a
/// time, after `latency`.
fn spawn_fetch_worker(
    source: InMemorySource,
    requests: Receiver<FetchRequest>,
    responses: Sender<FetchResponse>,
    latency: Duration,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        for request in requests {
            thread::sleep(latency);
            tracing::debug!(address = %request.ticket.address, "serving fetch");
            if responses.send(source.respond(&request)).is_err() {
                break;
            }
        }
    })
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_file.as_deref())?;

    let mut config = TuiConfig::load(cli.config.as_deref())?;
    if let Some(latency_ms) = cli.latency_ms {
        config.fetch_latency_ms = latency_ms;
    }

    let data =
        std::fs::read(&cli.dataset).with_context(|| format!("reading {}", cli.dataset.display()))?;
    let frames = storyboard_core::parsers::parse_auto(&data)?;
    let source = InMemorySource::new(frames);
    tracing::info!(
        dataset = %cli.dataset.display(),
        roots = source.top_level().len(),
        "dataset loaded"
    );

    let (request_tx, request_rx) = mpsc::channel();
    let (response_tx, response_rx) = mpsc::channel();
    let storyboard = Storyboard::new(source.top_level(), config.storyboard.clone());
    let worker = spawn_fetch_worker(
        source,
        request_rx,
        response_tx,
        Duration::from_millis(config.fetch_latency_ms),
    );

    let mut session = Session::new(storyboard, request_tx, TuiSink::default());
    session.present();
    let mut app = App::new(session);
    renderer::run_tui(&mut app, &response_rx, &config)?;

    // Dropping the session closes the request channel and stops the worker.
    drop(app);
    if worker.join().is_err() {
        tracing::warn!("fetch worker panicked");
    }
    Ok(())
}
