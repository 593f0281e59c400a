#![forbid(unsafe_code)]

//! `compose-pilot`: containerized composition launcher binary.
//!
//! Bootstraps configuration, starts the supervisor (command queue, container
//! reconciler, manifest catalog), and renders the core's event stream as
//! terminal output until a shutdown signal arrives. Richer frontends attach
//! to the same event channel through the library crate.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use compose_pilot::events::UiEvent;
use compose_pilot::{AppError, Config, Result, Supervisor};

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "compose-pilot", about = "Containerized composition launcher", version, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file; built-in defaults apply when
    /// omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Force development mode: bundled manifest and template fixtures
    /// instead of remote retrieval.
    #[arg(long)]
    dev: bool,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.log_format)?;
    info!("compose-pilot bootstrap");

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))?
        .block_on(run(args))
}

async fn run(args: Cli) -> Result<()> {
    let config = Config::load(args.config.as_deref(), args.dev)?;
    info!(
        dev_mode = config.dev_mode,
        engine = %config.engine_binary,
        "configuration loaded"
    );

    let (supervisor, events) = Supervisor::start(config)?;
    let renderer = tokio::spawn(render_events(events));

    shutdown_signal().await;
    info!("shutdown signal received");

    supervisor.shutdown().await;
    // All event senders are gone once the supervisor is down, so the
    // renderer drains the channel and exits.
    let _ = renderer.await;
    info!("compose-pilot shut down");

    Ok(())
}

/// Render the core's event stream as plain terminal output.
async fn render_events(mut events: UnboundedReceiver<UiEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            UiEvent::Log(line) => println!("{line}"),
            UiEvent::Error(message) => eprintln!("ERROR: {message}"),
            UiEvent::Status(summary) => println!("{}", summary.headline()),
            UiEvent::Containers { records, .. } => {
                for record in &records {
                    println!("  {} | {} | {}", record.name, record.image, record.status);
                }
            }
            UiEvent::Catalog(pairs) => {
                println!("Available pairings:");
                for pair in &pairs {
                    println!("  {}", pair.label());
                }
            }
            UiEvent::Busy(_) => {}
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(err) => {
                tracing::warn!(%err, "failed to register SIGTERM handler, using ctrl-c only");
                let _ = ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(err) = ctrl_c.await {
            tracing::error!(%err, "ctrl-c signal handler failed");
        }
    }
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(env_filter);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
