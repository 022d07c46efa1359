//! sectormaild - responder daemon for the sector mailbox protocol
//!
//! CLI entry point: run the responder, inspect a mailbox, provision one.

use std::fs;
use std::path::PathBuf;

use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result};
use tracing::{debug, info, warn};

use sectormaild::cli::{get_log_path, Cli, Command};
use sectormaild::config::Config;
use sectormaild::protocol::{provision, Channel, Status};
use sectormaild::create_backend;
use sectormaild::responder::Responder;

fn setup_logging(cli_log_level: Option<&str>) -> Result<()> {
    let log_path = get_log_path();
    if let Some(parent) = log_path.parent() {
        fs::create_dir_all(parent).context("Failed to create log directory")?;
    }

    let level = if let Some(s) = cli_log_level {
        match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        }
    } else {
        tracing::Level::INFO
    };

    let log_file = fs::File::create(&log_path).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Command::Run {
            mailbox,
            poll_interval_ms,
        } => cmd_run(config, mailbox, poll_interval_ms).await,
        Command::Inspect { mailbox, watch } => cmd_inspect(&config, mailbox, watch).await,
        Command::Init { mailbox, sectors } => cmd_init(&config, mailbox, sectors),
    }
}

/// Run the responder loop until interrupted
async fn cmd_run(mut config: Config, mailbox: Option<PathBuf>, poll_interval_ms: Option<u64>) -> Result<()> {
    debug!(?mailbox, ?poll_interval_ms, "cmd_run: called");

    if let Some(path) = mailbox {
        config.mailbox.path = path;
    }
    if let Some(ms) = poll_interval_ms {
        config.mailbox.poll_interval_ms = ms;
    }

    // Fail fast on broken config (zero interval, missing API key)
    config.validate().context("Invalid configuration")?;

    if !config.mailbox.path.exists() {
        // Not fatal: the file is provisioned externally and may appear
        // later; the loop logs and backs off until it does
        warn!(path = %config.mailbox.path.display(), "Mailbox file does not exist yet");
        println!(
            "Note: mailbox file {} does not exist yet (create it with `smd init`)",
            config.mailbox.path.display()
        );
    }

    let backend = create_backend(&config.backend).context("Failed to create response backend")?;
    info!(backend = backend.name(), "Backend initialized");

    let channel = Channel::new(&config.mailbox.path);
    let mut responder = Responder::new(channel, backend, config.mailbox.clone());

    // Shutdown channel fed by the signal handlers
    let (shutdown_tx, shutdown_rx) = tokio::sync::mpsc::channel::<()>(1);

    let responder_handle = tokio::spawn(async move { responder.run(shutdown_rx).await });

    info!("Responder running. Press Ctrl+C to stop.");

    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;

        tokio::select! {
            _ = sigint.recv() => {
                debug!("main: SIGINT received, initiating shutdown");
                warn!("SIGINT received");
            }
            _ = sigterm.recv() => {
                debug!("main: SIGTERM received, initiating shutdown");
                warn!("SIGTERM received");
            }
        }
        let _ = shutdown_tx.send(()).await;
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        debug!("main: ctrl_c received, initiating shutdown");
        let _ = shutdown_tx.send(()).await;
    }

    // Wait for the current iteration to finish; nothing to roll back
    let _ = responder_handle.await;
    info!("Shutdown complete");
    Ok(())
}

/// Print the three protocol sectors, once or continuously
async fn cmd_inspect(config: &Config, mailbox: Option<PathBuf>, watch: bool) -> Result<()> {
    debug!(?mailbox, watch, "cmd_inspect: called");
    let path = mailbox.unwrap_or_else(|| config.mailbox.path.clone());
    let channel = Channel::new(&path);

    if !watch {
        print_state(&channel).context(format!("Failed to read mailbox {}", path.display()))?;
        return Ok(());
    }

    println!("Watching {} (Ctrl+C to stop)", path.display());
    let mut last_request = String::new();
    let mut last_response = String::new();
    let mut last_status: Option<Status> = None;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!("\nStopped watching.");
                return Ok(());
            }
            _ = tokio::time::sleep(config.mailbox.poll_interval()) => {}
        }

        let (request, response, status) = match read_all(&channel) {
            Ok(state) => state,
            Err(e) => {
                warn!(error = %e, "cmd_inspect: read failed");
                println!("! read error: {e}");
                tokio::time::sleep(config.mailbox.error_backoff()).await;
                continue;
            }
        };

        if request != last_request && !request.trim().is_empty() {
            println!("{} {}", "request: ".bold(), request);
            last_request = request;
        }
        if last_status.as_ref() != Some(&status) {
            println!(
                "{} {} -> {}",
                "status:  ".bold(),
                last_status.map(|s| s.to_string()).unwrap_or_else(|| "?".to_string()),
                colorize_status(&status)
            );
            last_status = Some(status);
        }
        if response != last_response && !response.trim().is_empty() {
            println!("{} {}", "response:".bold(), response);
            last_response = response;
        }
    }
}

/// Provision a zeroed mailbox file
fn cmd_init(config: &Config, mailbox: Option<PathBuf>, sectors: u32) -> Result<()> {
    debug!(?mailbox, sectors, "cmd_init: called");
    let path = mailbox.unwrap_or_else(|| config.mailbox.path.clone());

    let len = provision(&path, sectors).context(format!("Failed to provision {}", path.display()))?;
    println!("Provisioned {} ({} bytes)", path.display(), len);
    Ok(())
}

fn read_all(channel: &Channel) -> Result<(String, String, Status), mailbox::MailboxError> {
    Ok((channel.read_request()?, channel.read_response()?, channel.read_status()?))
}

fn print_state(channel: &Channel) -> Result<(), mailbox::MailboxError> {
    let (request, response, status) = read_all(channel)?;
    println!("Mailbox: {}", channel.path().display());
    println!("  sector 0 (request):  '{}'", request);
    println!("  sector 1 (response): '{}'", response);
    println!("  sector 2 (status):   {}", colorize_status(&status));
    Ok(())
}

fn colorize_status(status: &Status) -> String {
    let text = status.to_string();
    match status {
        Status::Idle => text.as_str().green().to_string(),
        Status::RequestSent => text.as_str().yellow().to_string(),
        Status::ResponseReady => text.as_str().cyan().to_string(),
        Status::Unknown(_) => text.as_str().red().to_string(),
    }
}
