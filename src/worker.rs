//! Background provisioning worker
//!
//! The TUI thread must keep polling input while a run takes tens of minutes,
//! so the executor runs on a dedicated thread and streams `RunEvent`s back
//! over an mpsc channel. Only one run may be active per process.

use crate::command_runner::CommandRunner;
use crate::engine::ProvisioningPlan;
use crate::error::{ProvisionError, Result};
use crate::executor::{CancelToken, RunEvent, StepExecutor};
use crate::report::RunReport;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

static RUN_ACTIVE: AtomicBool = AtomicBool::new(false);

/// Clears the active flag when the worker thread ends, however it ends.
struct ActiveRun;

impl ActiveRun {
    fn acquire() -> Result<Self> {
        RUN_ACTIVE
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map(|_| ActiveRun)
            .map_err(|_| ProvisionError::state("A provisioning run is already in progress"))
    }
}

impl Drop for ActiveRun {
    fn drop(&mut self) {
        RUN_ACTIVE.store(false, Ordering::SeqCst);
    }
}

/// Whether a run is currently executing in this process
pub fn run_active() -> bool {
    RUN_ACTIVE.load(Ordering::SeqCst)
}

/// Handle to a running provisioning worker
pub struct RunHandle {
    events: Receiver<RunEvent>,
    cancel: CancelToken,
    thread: Option<JoinHandle<()>>,
}

impl RunHandle {
    /// Request cancellation. Takes effect before the next step starts.
    pub fn cancel(&self) {
        tracing::info!("cancellation requested");
        self.cancel.cancel();
    }

    /// Drain pending events without blocking.
    pub fn poll_events(&self) -> Vec<RunEvent> {
        let mut events = Vec::new();
        loop {
            match self.events.try_recv() {
                Ok(event) => events.push(event),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        events
    }

    /// Block until the run finishes and return its report. Returns `None` if
    /// the worker died without reporting.
    pub fn wait(mut self) -> Option<RunReport> {
        let mut report = None;
        for event in self.events.iter() {
            if let RunEvent::Finished(r) = event {
                report = Some(r);
            }
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
        report
    }
}

/// Start executing `plan` on a background thread.
///
/// # Errors
///
/// `State` if another run is active, `Io` if the thread cannot be spawned.
pub fn spawn_run(plan: ProvisioningPlan, runner: Arc<dyn CommandRunner>) -> Result<RunHandle> {
    let active = ActiveRun::acquire()?;
    let (tx, rx) = mpsc::channel();
    let cancel = CancelToken::new();
    let worker_cancel = cancel.clone();

    let thread = thread::Builder::new()
        .name("provisioner".to_string())
        .spawn(move || {
            let _active = active;
            let executor = StepExecutor::new(runner.as_ref(), worker_cancel);
            let report = executor.execute_with(&plan, |event| {
                // Receiver gone means the UI exited; keep running to a step boundary
                let _ = tx.send(event);
            });

            match report.to_json() {
                Ok(json) => tracing::info!(report = %json, "run report"),
                Err(e) => tracing::warn!(error = %e, "could not serialize run report"),
            }
            let _ = tx.send(RunEvent::Finished(report));
        })?;

    Ok(RunHandle {
        events: rx,
        cancel,
        thread: Some(thread),
    })
}
