//! cmdlink CLI - chunked command transfer over a framed link
//!
//! `cmdlink` pushes a text file of commands to a receiver, which verifies
//! each chunk, reassembles the payload and executes it line by line.
//!
//! ## Quick Start
//!
//! ```bash
//! # Receive and execute batches
//! cmdlink listen
//!
//! # Send a batch (in another terminal)
//! cmdlink send ./moves.txt
//! ```

#![allow(clippy::doc_markdown)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::unused_async)]

use anyhow::Result;
use clap::Parser;

mod commands;
mod framing;
mod handlers;
pub mod ui;

use commands::{Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let cli = Cli::parse();

    match cli.command {
        Command::Listen(args) => commands::listen::run(args).await,
        Command::Send(args) => commands::send::run(args).await,
        Command::Parse(args) => commands::parse::run(args).await,
        Command::Config(args) => commands::config::run(args).await,
    }
}

fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,cmdlink=info,cmdlink_core=info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).without_time())
        .with(filter)
        .init();
}
