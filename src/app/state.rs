//! Application state types
//!
//! Progress of the provisioning run as seen by the UI. It is rebuilt purely
//! from `RunEvent`s, so the worker thread never touches UI state.

use crate::engine::ProvisioningPlan;
use crate::executor::RunEvent;
use crate::report::{RunReport, StepOutcome};

/// One row of the step list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRow {
    pub step_id: String,
    pub description: String,
    pub outcome: Option<StepOutcome>,
}

/// Live view of a provisioning run
#[derive(Debug, Clone, Default)]
pub struct RunProgress {
    pub steps: Vec<StepRow>,
    /// Index of the step currently executing
    pub active: Option<usize>,
    pub report: Option<RunReport>,
    /// Set when the run could not start at all (plan or spawn error)
    pub start_error: Option<String>,
    pub cancel_requested: bool,
}

impl RunProgress {
    pub fn from_plan(plan: &ProvisioningPlan) -> Self {
        Self {
            steps: plan
                .steps
                .iter()
                .map(|s| StepRow {
                    step_id: s.id.clone(),
                    description: s.description.clone(),
                    outcome: None,
                })
                .collect(),
            ..Self::default()
        }
    }

    pub fn start_failed(message: impl Into<String>) -> Self {
        Self {
            start_error: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn apply(&mut self, event: RunEvent) {
        match event {
            RunEvent::StepStarted { index, .. } => self.active = Some(index),
            RunEvent::StepFinished { index, record } => {
                if let Some(row) = self.steps.get_mut(index) {
                    row.outcome = Some(record.outcome);
                }
                self.active = None;
            }
            RunEvent::Finished(report) => {
                self.active = None;
                self.report = Some(report);
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.report.is_some() || self.start_error.is_some()
    }

    pub fn finished_count(&self) -> usize {
        self.steps.iter().filter(|s| s.outcome.is_some()).count()
    }

    /// Completion percentage for the gauge
    pub fn percent(&self) -> u16 {
        if self.steps.is_empty() {
            return if self.is_finished() { 100 } else { 0 };
        }
        ((self.finished_count() * 100) / self.steps.len()) as u16
    }

    /// Description of the executing step, for the gauge label
    pub fn active_description(&self) -> Option<&str> {
        self.active
            .and_then(|i| self.steps.get(i))
            .map(|row| row.description.as_str())
    }
}
