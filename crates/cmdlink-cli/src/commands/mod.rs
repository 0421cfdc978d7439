//! CLI command definitions and handlers.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Load configuration with graceful fallback to defaults.
///
/// Every command loads its settings through here. A missing or unreadable
/// config file is logged and replaced by defaults.
pub fn load_config() -> cmdlink_core::config::Config {
    cmdlink_core::config::Config::load().unwrap_or_else(|e| {
        tracing::warn!("Ignoring config file: {e}");
        cmdlink_core::config::Config::default()
    })
}

pub mod config;
pub mod listen;
pub mod parse;
pub mod send;

/// cmdlink - send command batches over a framed link and execute them
#[derive(Parser)]
#[command(name = "cmdlink")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand)]
pub enum Command {
    /// Accept transfers and execute each one as a command batch
    Listen(ListenArgs),

    /// Transfer a command file to a listening receiver
    Send(SendArgs),

    /// Parse a command file locally and show the result
    Parse(ParseArgs),

    /// Manage configuration
    Config(ConfigArgs),
}

/// Arguments for the listen command
#[derive(Parser)]
pub struct ListenArgs {
    /// Address to bind (defaults to link.listen_addr)
    #[arg(short, long)]
    pub addr: Option<String>,

    /// Exit after the first connection closes
    #[arg(long)]
    pub once: bool,

    /// Abandon a stalled transfer after this long (e.g., 30s, 2m)
    #[arg(long)]
    pub idle_timeout: Option<String>,

    /// Print batch reports as JSON
    #[arg(long)]
    pub json: bool,

    /// Don't print batch reports
    #[arg(short, long)]
    pub quiet: bool,
}

/// Arguments for the send command
#[derive(Parser)]
pub struct SendArgs {
    /// Command file to transfer
    #[arg(required = true)]
    pub file: PathBuf,

    /// Receiver address (defaults to link.listen_addr)
    #[arg(short, long)]
    pub addr: Option<String>,

    /// Largest frame on the link, checksum included
    #[arg(short, long)]
    pub chunk_size: Option<usize>,

    /// Whole-transfer restarts before giving up
    #[arg(long)]
    pub retries: Option<u32>,

    /// Minimal output
    #[arg(short, long)]
    pub quiet: bool,
}

/// Arguments for the parse command
#[derive(Parser)]
pub struct ParseArgs {
    /// Command file to parse
    #[arg(required = true)]
    pub file: PathBuf,

    /// Run the commands through the demo handlers
    #[arg(short, long)]
    pub execute: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the config command
#[derive(Parser)]
pub struct ConfigArgs {
    /// Config subcommand
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Config subcommands
#[derive(Subcommand)]
pub enum ConfigAction {
    /// Get a configuration value
    Get {
        /// Configuration key (e.g., link.chunk_size)
        key: String,
    },

    /// Set a configuration value
    Set {
        /// Configuration key
        key: String,

        /// Value to set
        value: String,
    },

    /// Show all configuration
    Show,

    /// Show the configuration file path
    Path,

    /// Reset to defaults
    Reset,
}
