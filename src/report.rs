//! Run report
//!
//! Per-step outcomes of one provisioning run plus the overall status. The
//! report is the only thing the executor hands back; the TUI renders it and
//! `main` logs it as JSON.

use crate::engine::chroot_script::WARNING_PREFIX;
use crate::error::ProvisionError;
use serde::{Serialize, Serializer};
use std::fmt;
use std::time::Duration;

/// What happened to one step
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StepOutcome {
    Succeeded,
    /// The idempotency probe held
    Skipped { probe: String },
    Failed { exit_code: Option<i32>, stderr: String },
    TimedOut { stderr: String },
}

impl StepOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. } | Self::TimedOut { .. })
    }

    pub fn stderr(&self) -> Option<&str> {
        match self {
            Self::Failed { stderr, .. } | Self::TimedOut { stderr } => Some(stderr),
            _ => None,
        }
    }
}

impl fmt::Display for StepOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Succeeded => write!(f, "ok"),
            Self::Skipped { .. } => write!(f, "skipped"),
            Self::Failed { exit_code: Some(code), .. } => write!(f, "failed (exit {})", code),
            Self::Failed { exit_code: None, .. } => write!(f, "failed (signal)"),
            Self::TimedOut { .. } => write!(f, "timed out"),
        }
    }
}

/// One executed (or skipped) step
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepRecord {
    pub step_id: String,
    pub description: String,
    pub fatal: bool,
    #[serde(flatten)]
    pub outcome: StepOutcome,
    #[serde(rename = "elapsed_ms", serialize_with = "as_millis")]
    pub elapsed: Duration,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

fn as_millis<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

/// Overall result of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunStatus {
    Succeeded,
    /// Every fatal step succeeded, but an optional step failed or warned
    SucceededWithWarnings,
    Failed,
    Cancelled,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Succeeded => write!(f, "Installation succeeded"),
            Self::SucceededWithWarnings => write!(f, "Installation succeeded with warnings"),
            Self::Failed => write!(f, "Installation failed"),
            Self::Cancelled => write!(f, "Installation cancelled"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub records: Vec<StepRecord>,
    /// First fatal failure, if any
    pub failed_step: Option<String>,
    pub status: RunStatus,
}

impl RunReport {
    /// Derive the status from the records.
    pub fn new(records: Vec<StepRecord>, failed_step: Option<String>, cancelled: bool) -> Self {
        let status = if failed_step.is_some() {
            RunStatus::Failed
        } else if cancelled {
            RunStatus::Cancelled
        } else if records
            .iter()
            .any(|r| r.outcome.is_failure() || !r.warnings.is_empty())
        {
            RunStatus::SucceededWithWarnings
        } else {
            RunStatus::Succeeded
        };
        Self {
            records,
            failed_step,
            status,
        }
    }

    pub fn record(&self, step_id: &str) -> Option<&StepRecord> {
        self.records.iter().find(|r| r.step_id == step_id)
    }

    /// The record of the fatal failure
    pub fn failure(&self) -> Option<&StepRecord> {
        self.failed_step.as_deref().and_then(|id| self.record(id))
    }

    /// The fatal failure as an execution error
    pub fn error(&self) -> Option<ProvisionError> {
        let record = self.failure()?;
        let exit_code = match &record.outcome {
            StepOutcome::Failed { exit_code, .. } => *exit_code,
            _ => None,
        };
        Some(ProvisionError::execution(
            record.step_id.clone(),
            exit_code,
            record.outcome.stderr().unwrap_or_default(),
        ))
    }

    /// Every warning from every step, prefixed with its step id
    pub fn warnings(&self) -> Vec<String> {
        let mut out = Vec::new();
        for record in &self.records {
            for w in &record.warnings {
                out.push(format!("{}: {}", record.step_id, w));
            }
            if record.outcome.is_failure() && !record.fatal {
                out.push(format!("{}: {}", record.step_id, record.outcome));
            }
        }
        out
    }

    pub fn to_json(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Lines of `stderr` carrying the warning prefix, prefix removed.
pub fn parse_warnings(stderr: &str) -> Vec<String> {
    stderr
        .lines()
        .filter_map(|l| l.trim_start().strip_prefix(WARNING_PREFIX))
        .map(|w| w.trim().to_string())
        .filter(|w| !w.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, fatal: bool, outcome: StepOutcome) -> StepRecord {
        StepRecord {
            step_id: id.to_string(),
            description: id.to_string(),
            fatal,
            outcome,
            elapsed: Duration::from_millis(5),
            warnings: vec![],
        }
    }

    #[test]
    fn test_status_succeeded() {
        let report = RunReport::new(vec![record("a", true, StepOutcome::Succeeded)], None, false);
        assert_eq!(report.status, RunStatus::Succeeded);
        assert!(report.error().is_none());
    }

    #[test]
    fn test_non_fatal_failure_is_warning() {
        let report = RunReport::new(
            vec![
                record("a", false, StepOutcome::Failed { exit_code: Some(1), stderr: "no".into() }),
                record("b", true, StepOutcome::Succeeded),
            ],
            None,
            false,
        );
        assert_eq!(report.status, RunStatus::SucceededWithWarnings);
        assert_eq!(report.warnings(), vec!["a: failed (exit 1)".to_string()]);
    }

    #[test]
    fn test_fatal_failure_wins() {
        let report = RunReport::new(
            vec![record("disk-mklabel", true, StepOutcome::Failed { exit_code: Some(1), stderr: "busy\n".into() })],
            Some("disk-mklabel".to_string()),
            false,
        );
        assert_eq!(report.status, RunStatus::Failed);
        let err = report.error().expect("fatal failure"); // test: failed_step is set
        assert!(err.to_string().contains("disk-mklabel"));
        assert!(err.to_string().contains("busy"));
    }

    #[test]
    fn test_cancelled() {
        let report = RunReport::new(vec![], None, true);
        assert_eq!(report.status, RunStatus::Cancelled);
    }

    #[test]
    fn test_parse_warnings() {
        let stderr = "pacman noise\narchprov-warning: failed to install spotify\n  archprov-warning:   \nerror\n";
        assert_eq!(parse_warnings(stderr), vec!["failed to install spotify".to_string()]);
    }

    #[test]
    fn test_json_shape() {
        let mut r = record("swap-on", false, StepOutcome::Skipped { probe: "swap active".into() });
        r.warnings.push("w".into());
        let json = RunReport::new(vec![r], None, false).to_json().unwrap();
        assert!(json.contains("\"outcome\":\"skipped\""));
        assert!(json.contains("\"elapsed_ms\":5"));
        assert!(json.contains("\"status\":\"SucceededWithWarnings\""));
    }
}
