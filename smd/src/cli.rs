//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// sectormaild - host-side responder for the sector mailbox protocol
#[derive(Parser)]
#[command(
    name = "smd",
    about = "Responder daemon for the shared-file sector mailbox protocol",
    version
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the responder in the foreground (exits on interrupt)
    Run {
        /// Mailbox file (overrides config)
        #[arg(short, long)]
        mailbox: Option<PathBuf>,

        /// Polling interval in milliseconds (overrides config)
        #[arg(long)]
        poll_interval_ms: Option<u64>,
    },

    /// Print the current request, response and status sectors
    Inspect {
        /// Mailbox file (overrides config)
        #[arg(short, long)]
        mailbox: Option<PathBuf>,

        /// Keep watching and report changes until interrupted
        #[arg(short, long)]
        watch: bool,
    },

    /// Provision a zeroed mailbox file
    Init {
        /// Mailbox file (overrides config)
        #[arg(short, long)]
        mailbox: Option<PathBuf>,

        /// Number of sectors to provision (minimum 3)
        #[arg(short, long, default_value = "3")]
        sectors: u32,
    },
}

/// Path of the daemon log file
pub fn get_log_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("sectormail")
        .join("logs")
        .join("sectormaild.log")
}
