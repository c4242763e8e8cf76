//! Step executor
//!
//! Runs a `ProvisioningPlan` strictly in order:
//!
//! 1. cancellation is checked before each step, never during one
//! 2. a step whose probe holds is recorded as skipped
//! 3. otherwise the step runs through the `CommandRunner`
//! 4. a failed fatal step stops the run; later steps get no record at all
//! 5. a failed non-fatal step is recorded and the run continues
//!
//! Committed steps are never rolled back.

use crate::command_runner::{CommandRunner, Invocation};
use crate::engine::ProvisioningPlan;
use crate::report::{parse_warnings, RunReport, StepOutcome, StepRecord};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Shared cancellation flag, honored between steps
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Progress notifications emitted while a plan runs
#[derive(Debug, Clone)]
pub enum RunEvent {
    StepStarted {
        index: usize,
        total: usize,
        step_id: String,
        description: String,
    },
    StepFinished {
        index: usize,
        record: StepRecord,
    },
    Finished(RunReport),
}

pub struct StepExecutor<'a> {
    runner: &'a dyn CommandRunner,
    cancel: CancelToken,
}

impl<'a> StepExecutor<'a> {
    pub fn new(runner: &'a dyn CommandRunner, cancel: CancelToken) -> Self {
        Self { runner, cancel }
    }

    /// Execute `plan` without progress reporting.
    pub fn execute(&self, plan: &ProvisioningPlan) -> RunReport {
        self.execute_with(plan, |_| {})
    }

    /// Execute `plan`, calling `on_event` before and after every step. The
    /// final `Finished` event is left to the caller.
    pub fn execute_with(&self, plan: &ProvisioningPlan, mut on_event: impl FnMut(RunEvent)) -> RunReport {
        let total = plan.steps.len();
        let mut records = Vec::with_capacity(total);
        let mut failed_step = None;
        let mut cancelled = false;

        tracing::info!(steps = total, disk = %plan.target.disk.display(), "starting provisioning run");

        for (index, step) in plan.steps.iter().enumerate() {
            if self.cancel.is_cancelled() {
                tracing::warn!(next_step = %step.id, "run cancelled before step");
                cancelled = true;
                break;
            }

            on_event(RunEvent::StepStarted {
                index,
                total,
                step_id: step.id.clone(),
                description: step.description.clone(),
            });

            let started = Instant::now();
            let skip_probe = step.skip_if.as_ref().filter(|probe| self.runner.probe(probe));
            let (outcome, warnings) = match skip_probe {
                Some(probe) => {
                    tracing::info!(step = %step.id, probe = %probe, "skipped, already applied");
                    (StepOutcome::Skipped { probe: probe.to_string() }, vec![])
                }
                None => self.run_step(plan, index),
            };

            let record = StepRecord {
                step_id: step.id.clone(),
                description: step.description.clone(),
                fatal: step.fatal,
                outcome,
                elapsed: started.elapsed(),
                warnings,
            };
            let halt = step.fatal && record.outcome.is_failure();
            if record.outcome.is_failure() {
                if halt {
                    tracing::error!(step = %step.id, outcome = %record.outcome, "fatal step failed, halting");
                } else {
                    tracing::warn!(step = %step.id, outcome = %record.outcome, "optional step failed, continuing");
                }
            }

            on_event(RunEvent::StepFinished {
                index,
                record: record.clone(),
            });
            records.push(record);

            if halt {
                failed_step = Some(step.id.clone());
                break;
            }
        }

        let report = RunReport::new(records, failed_step, cancelled);
        tracing::info!(status = ?report.status, "provisioning run finished");
        report
    }

    fn run_step(&self, plan: &ProvisioningPlan, index: usize) -> (StepOutcome, Vec<String>) {
        let step = &plan.steps[index];
        let invocation = Invocation::for_step(step, &plan.target.root);
        match self.runner.run(&invocation) {
            Ok(output) => {
                let warnings = parse_warnings(&output.stderr);
                let outcome = if output.timed_out {
                    StepOutcome::TimedOut { stderr: output.stderr }
                } else if output.success() {
                    StepOutcome::Succeeded
                } else {
                    StepOutcome::Failed {
                        exit_code: output.exit_code,
                        stderr: output.stderr,
                    }
                };
                (outcome, warnings)
            }
            Err(e) => (
                StepOutcome::Failed {
                    exit_code: None,
                    stderr: format!("{:#}", e),
                },
                vec![],
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command_runner::{CommandOutput, DryRunRunner};
    use crate::engine::{PartitionLayout, Phase, Probe, ProvisioningStep, Target};
    use crate::report::RunStatus;
    use crate::types::{BootloaderTarget, PartitionType};
    use std::collections::HashSet;
    use std::sync::Mutex;

    /// Fails the listed steps, holds the listed probes, records every call
    #[derive(Default)]
    struct ScriptedRunner {
        failing: HashSet<String>,
        holding: Vec<Probe>,
        calls: Mutex<Vec<String>>,
    }

    impl CommandRunner for ScriptedRunner {
        fn run(&self, invocation: &Invocation) -> anyhow::Result<CommandOutput> {
            self.calls.lock().unwrap().push(invocation.step_id.clone());
            if self.failing.contains(&invocation.step_id) {
                Ok(CommandOutput {
                    stderr: "boom\n".to_string(),
                    exit_code: Some(2),
                    ..CommandOutput::default()
                })
            } else {
                Ok(CommandOutput {
                    exit_code: Some(0),
                    ..CommandOutput::default()
                })
            }
        }

        fn probe(&self, probe: &Probe) -> bool {
            self.holding.contains(probe)
        }
    }

    fn plan(steps: Vec<ProvisioningStep>) -> ProvisioningPlan {
        ProvisioningPlan {
            steps,
            target: Target::default(),
            layout: PartitionLayout::for_type(PartitionType::Gpt),
            bootloader: BootloaderTarget::I386Pc,
        }
    }

    fn step(id: &str, fatal: bool) -> ProvisioningStep {
        let s = ProvisioningStep::exec(id, id, Phase::Disk, "true", &[]);
        if fatal { s.fatal() } else { s }
    }

    #[test]
    fn test_all_steps_succeed() {
        let runner = ScriptedRunner::default();
        let report = StepExecutor::new(&runner, CancelToken::new())
            .execute(&plan(vec![step("a", true), step("b", false)]));
        assert_eq!(report.status, RunStatus::Succeeded);
        assert_eq!(report.records.len(), 2);
    }

    #[test]
    fn test_fatal_failure_halts() {
        let runner = ScriptedRunner {
            failing: ["b".to_string()].into_iter().collect(),
            ..ScriptedRunner::default()
        };
        let report = StepExecutor::new(&runner, CancelToken::new())
            .execute(&plan(vec![step("a", true), step("b", true), step("c", true)]));
        assert_eq!(report.status, RunStatus::Failed);
        assert_eq!(report.failed_step.as_deref(), Some("b"));
        assert!(report.record("c").is_none());
        assert_eq!(*runner.calls.lock().unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn test_non_fatal_failure_continues() {
        let runner = ScriptedRunner {
            failing: ["a".to_string()].into_iter().collect(),
            ..ScriptedRunner::default()
        };
        let report = StepExecutor::new(&runner, CancelToken::new())
            .execute(&plan(vec![step("a", false), step("b", true)]));
        assert_eq!(report.status, RunStatus::SucceededWithWarnings);
        assert!(report.failed_step.is_none());
        assert_eq!(report.record("b").unwrap().outcome, StepOutcome::Succeeded);
    }

    #[test]
    fn test_holding_probe_skips_step() {
        let probe = Probe::PathExists("/mnt/swapfile".into());
        let runner = ScriptedRunner {
            holding: vec![probe.clone()],
            ..ScriptedRunner::default()
        };
        let report = StepExecutor::new(&runner, CancelToken::new())
            .execute(&plan(vec![step("a", false).skip_if(probe)]));
        assert!(matches!(report.records[0].outcome, StepOutcome::Skipped { .. }));
        assert!(runner.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_cancel_before_start_runs_nothing() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let report = StepExecutor::new(&DryRunRunner, cancel).execute(&plan(vec![step("a", true)]));
        assert_eq!(report.status, RunStatus::Cancelled);
        assert!(report.records.is_empty());
    }

    #[test]
    fn test_cancel_between_steps() {
        let cancel = CancelToken::new();
        let trigger = cancel.clone();
        let executor = StepExecutor::new(&DryRunRunner, cancel);
        let report = executor.execute_with(&plan(vec![step("a", true), step("b", true)]), |event| {
            if let RunEvent::StepFinished { index: 0, .. } = event {
                trigger.cancel();
            }
        });
        assert_eq!(report.status, RunStatus::Cancelled);
        assert_eq!(report.records.len(), 1);
    }

    #[test]
    fn test_events_bracket_each_step() {
        let mut events = Vec::new();
        StepExecutor::new(&DryRunRunner, CancelToken::new())
            .execute_with(&plan(vec![step("a", true), step("b", true)]), |e| events.push(e));
        assert_eq!(events.len(), 4);
        assert!(matches!(&events[0], RunEvent::StepStarted { index: 0, total: 2, .. }));
        assert!(matches!(&events[3], RunEvent::StepFinished { index: 1, .. }));
    }
}
