//! Output helpers for the cmdlink CLI.

use cmdlink_core::command::{BatchReport, Command, ExecutionStatus};

const RULE_WIDTH: usize = 44;

/// Print a batch report as text or JSON.
pub fn print_report(report: &BatchReport, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    println!();
    println!(
        "Batch ({}, {} ms)",
        format_size(report.payload_size),
        report.elapsed.as_millis()
    );
    println!("{}", "─".repeat(RULE_WIDTH));
    for command in &report.commands {
        println!("  {}", format_command(command));
    }
    println!("{}", "─".repeat(RULE_WIDTH));
    println!("  {}", report.summary());
    println!();
    Ok(())
}

/// One report line: status marker, name, parameters and any failure.
pub fn format_command(command: &Command) -> String {
    let marker = match command.status {
        ExecutionStatus::Executed => "ok ",
        ExecutionStatus::Error => "ERR",
        ExecutionStatus::NotExecuted => " - ",
    };
    let mut line = format!(
        "{} {} {}",
        marker,
        command.name,
        format_parameters(&command.parameters)
    );
    if let Some(error) = &command.error {
        line.push_str("  ");
        line.push_str(error);
    }
    line
}

fn format_parameters(parameters: &[f64]) -> String {
    let inner = parameters
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    format!("[{}]", inner)
}

/// Format a byte count with a binary unit.
#[allow(clippy::cast_precision_loss)]
pub fn format_size(bytes: usize) -> String {
    const KIB: usize = 1024;
    const MIB: usize = KIB * 1024;

    if bytes >= MIB {
        format!("{:.1} MiB", bytes as f64 / MIB as f64)
    } else if bytes >= KIB {
        format!("{:.1} KiB", bytes as f64 / KIB as f64)
    } else {
        format!("{} B", bytes)
    }
}
