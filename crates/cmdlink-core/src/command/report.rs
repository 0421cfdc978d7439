//! Post-dispatch inspection of a batch.

use std::fmt;
use std::time::Duration;

use serde::Serialize;

use super::{Command, ExecutionStatus};

/// Outcome of one executed batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchReport {
    /// Commands in execution order, with their final status
    pub commands: Vec<Command>,
    /// Size of the payload the batch was parsed from
    pub payload_size: usize,
    /// Wall time spent parsing and dispatching
    #[serde(with = "millis")]
    pub elapsed: Duration,
}

/// Counts of command outcomes in a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    /// Commands in the batch
    pub total: usize,
    /// Commands whose handler returned normally
    pub executed: usize,
    /// Commands that failed or had no handler
    pub failed: usize,
}

impl BatchReport {
    /// Commands that ended in [`ExecutionStatus::Error`].
    pub fn failures(&self) -> impl Iterator<Item = &Command> {
        self.commands
            .iter()
            .filter(|c| c.status == ExecutionStatus::Error)
    }

    /// Count outcomes.
    pub fn summary(&self) -> BatchSummary {
        let executed = self
            .commands
            .iter()
            .filter(|c| c.status == ExecutionStatus::Executed)
            .count();
        let failed = self.failures().count();
        BatchSummary {
            total: self.commands.len(),
            executed,
            failed,
        }
    }

    /// Whether every command executed.
    pub fn is_success(&self) -> bool {
        self.failures().next().is_none()
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} commands: {} executed, {} failed",
            self.total, self.executed, self.failed
        )
    }
}

mod millis {
    use std::time::Duration;

    use serde::Serializer;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> BatchReport {
        let mut ok = Command::new("A0", vec![1.0]);
        ok.status = ExecutionStatus::Executed;
        let mut bad = Command::new("ZZ", vec![]);
        bad.status = ExecutionStatus::Error;
        bad.error = Some("No callback registered for command: ZZ".into());

        BatchReport {
            commands: vec![ok, bad],
            payload_size: 10,
            elapsed: Duration::from_millis(3),
        }
    }

    #[test]
    fn test_summary_counts() {
        let summary = report().summary();
        assert_eq!(
            summary,
            BatchSummary {
                total: 2,
                executed: 1,
                failed: 1
            }
        );
        assert_eq!(summary.to_string(), "2 commands: 1 executed, 1 failed");
    }

    #[test]
    fn test_failures() {
        let report = report();
        let names: Vec<&str> = report.failures().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["ZZ"]);
        assert!(!report.is_success());
        assert!(BatchReport::default().is_success());
    }

    #[test]
    fn test_json_shape() {
        let json = serde_json::to_value(report()).expect("serialize");
        assert_eq!(json["commands"][0]["status"], "executed");
        assert!(json["commands"][0].get("error").is_none());
        assert_eq!(json["commands"][1]["status"], "error");
        assert_eq!(json["elapsed"], 3);
    }
}
