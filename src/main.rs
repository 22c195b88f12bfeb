//! Binary entrypoint for photo-browser.
//!
//! Wires the controller, scroll monitor and terminal presenter together; all
//! logic lives in the library crate.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use photo_browser::api::UnsplashClient;
use photo_browser::config::Configuration;
use photo_browser::events::{Intent, ScrollMetrics};
use photo_browser::feed::FeedSnapshot;
use photo_browser::tasks::{controller, presenter, scroll::ScrollMonitor};
use tokio::io::BufReader;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::Level;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "photo-browser",
    version,
    about = "Browse a photo feed with infinite scroll and search"
)]
struct Args {
    /// Path to YAML config (defaults are used when omitted)
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,
    /// Submit this search right after the initial feed load
    #[arg(short, long, value_name = "QUERY")]
    query: Option<String>,
    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbosity: u8) -> Result<()> {
    let level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"))
        .add_directive(
            format!("photo_browser={level}")
                .parse()
                .context("building log directive")?,
        );
    // stdout belongs to the grid
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .compact()
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let Args {
        config,
        query,
        verbose,
    } = Args::parse();
    init_tracing(verbose)?;

    let cfg = match &config {
        Some(path) => Configuration::from_yaml_file(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?,
        None => Configuration::default(),
    }
    .validated()
    .context("invalid configuration values")?;
    tracing::debug!("configuration: {cfg:#?}");
    if let Some(timeout) = cfg.request_timeout {
        tracing::info!(timeout = %humantime::format_duration(timeout), "request timeout set");
    }

    let api = Arc::new(UnsplashClient::new(&cfg)?);

    // Channels (small/bounded)
    let (intents_tx, intents_rx) = mpsc::channel::<Intent>(32); // Presenter/Scroll -> Controller
    let (metrics_tx, metrics_rx) = mpsc::channel::<ScrollMetrics>(32); // Presenter -> Scroll
    let (state_tx, state_rx) = watch::channel(FeedSnapshot::default()); // Controller -> Presenter

    let cancel = CancellationToken::new();

    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::warn!("ctrl-c handler failed: {err}");
                return;
            }
            tracing::info!("ctrl-c received; initiating shutdown");
            cancel.cancel();
        });
    }

    let mut tasks = JoinSet::new();

    // Controller
    tasks.spawn({
        let cancel = cancel.clone();
        async move {
            controller::run(api, intents_rx, state_tx, query, cancel)
                .await
                .context("controller task failed")
        }
    });

    // Scroll monitor, detached when the presenter returns
    let scroll_guard =
        ScrollMonitor::new(&cfg.scroll).attach(metrics_rx, intents_tx.clone(), &cancel);

    // Presenter on the main task
    if let Err(e) = presenter::run(
        BufReader::new(tokio::io::stdin()),
        io::stdout(),
        state_rx,
        intents_tx,
        metrics_tx,
        cfg.viewport.clone(),
        cancel.clone(),
    )
    .await
    .context("presenter failed")
    {
        tracing::error!("{e:?}");
    }

    scroll_guard.detach().await;
    cancel.cancel();

    while let Some(res) = tasks.join_next().await {
        match res {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!("task error: {e:?}"),
            Err(e) => tracing::error!("join error: {e}"),
        }
    }

    Ok(())
}
