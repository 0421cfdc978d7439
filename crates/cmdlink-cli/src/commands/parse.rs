//! Parse command implementation.
//!
//! Runs a command file through the same parser the receiver uses, so a batch
//! can be checked before it is sent.

use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};

use cmdlink_core::command::{parse_commands, BatchReport};

use super::ParseArgs;
use crate::{handlers, ui};

/// Run the parse command.
pub async fn run(args: ParseArgs) -> Result<()> {
    let report = load_batch(&args.file, args.execute)?;
    ui::print_report(&report, args.json)
}

/// Parse a command file and optionally execute it against the demo handlers.
pub fn load_batch(path: &Path, execute: bool) -> Result<BatchReport> {
    let data =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;

    let started = Instant::now();
    let mut commands = parse_commands(&data);
    if execute {
        handlers::demo_dispatcher().execute_all(&mut commands);
    }

    Ok(BatchReport {
        commands,
        payload_size: data.len(),
        elapsed: started.elapsed(),
    })
}
