//! Command execution seam
//!
//! `CommandRunner` is the only way provisioning steps reach the system. The
//! executor talks to the trait; `SystemRunner` spawns real processes and
//! `DryRunRunner` only logs what would run.
//!
//! # Process lifecycle
//!
//! `SystemRunner` spawns every command in a new process group and registers
//! it under its step id. The deadline covers the leader's exit and the close
//! of its output pipes, so a background process left holding stdout counts
//! too. When the deadline passes the whole group gets SIGTERM, then SIGKILL,
//! and the output is flagged as timed out.

use crate::engine::{Probe, ProvisioningStep, StepAction};
use crate::process_guard::{register_child, terminate_group, unregister_child, CommandProcessGroup};
use crate::types::ExecutionContext;
use anyhow::{Context, Result};
use std::io::{Read, Write};
use std::path::Path;
use std::process::{Child, ChildStderr, ChildStdout, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

/// Default bound on a single command
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(3600);

/// Grace period between SIGTERM and SIGKILL on timeout
const TIMEOUT_GRACE_PERIOD: Duration = Duration::from_secs(5);

/// Bound on a probe command such as `mountpoint -q`
const PROBE_TIMEOUT: Duration = Duration::from_secs(30);

/// How long output readers get once the group has been stopped
const DRAIN_GRACE: Duration = Duration::from_secs(1);

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// A fully resolved process invocation
#[derive(Clone, PartialEq, Eq)]
pub struct Invocation {
    pub step_id: String,
    pub program: String,
    pub args: Vec<String>,
    pub stdin: Option<String>,
}

impl Invocation {
    /// Resolve a step into the process that runs it.
    ///
    /// - host `Exec`: the program itself
    /// - host `Script`: `/bin/bash -s` with the body on stdin
    /// - chroot: `arch-chroot <root> /bin/bash -s` with the body on stdin
    pub fn for_step(step: &ProvisioningStep, root: &Path) -> Self {
        let root = root.to_string_lossy().into_owned();
        let (program, args, stdin) = match (&step.context, &step.action) {
            (ExecutionContext::Host, StepAction::Exec { program, args, stdin }) => {
                (program.clone(), args.clone(), stdin.clone())
            }
            (ExecutionContext::Host, StepAction::Script { body }) => (
                "/bin/bash".to_string(),
                vec!["-s".to_string()],
                Some(body.clone()),
            ),
            (ExecutionContext::Chroot, StepAction::Script { body }) => (
                "arch-chroot".to_string(),
                vec![root, "/bin/bash".to_string(), "-s".to_string()],
                Some(body.clone()),
            ),
            (ExecutionContext::Chroot, StepAction::Exec { program, args, stdin }) => {
                let mut chroot_args = vec![root, program.clone()];
                chroot_args.extend(args.iter().cloned());
                ("arch-chroot".to_string(), chroot_args, stdin.clone())
            }
        };
        Self {
            step_id: step.id.clone(),
            program,
            args,
            stdin,
        }
    }

    pub fn command_line(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }
}

// stdin may hold passwords
impl std::fmt::Debug for Invocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Invocation")
            .field("step_id", &self.step_id)
            .field("program", &self.program)
            .field("args", &self.args)
            .field("stdin", &self.stdin.as_ref().map(|s| format!("<{} bytes>", s.len())))
            .finish()
    }
}

/// Captured result of one process
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    /// None if terminated by a signal
    pub exit_code: Option<i32>,
    pub timed_out: bool,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }
}

/// Runs invocations and evaluates idempotency probes.
pub trait CommandRunner: Send + Sync {
    /// Run to completion. `Err` means the process could not be started or
    /// waited on; a non-zero exit is an `Ok` output.
    fn run(&self, invocation: &Invocation) -> Result<CommandOutput>;

    /// Whether the probe currently holds
    fn probe(&self, probe: &Probe) -> bool;
}

// ============================================================================
// System runner
// ============================================================================

/// Runs commands on the live system.
#[derive(Debug, Clone)]
pub struct SystemRunner {
    timeout: Duration,
}

impl SystemRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Default for SystemRunner {
    fn default() -> Self {
        Self::new(DEFAULT_COMMAND_TIMEOUT)
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, invocation: &Invocation) -> Result<CommandOutput> {
        tracing::info!(step = %invocation.step_id, command = %invocation.command_line(), "running");
        let output = run_bounded(invocation, self.timeout)?;
        tracing::info!(
            step = %invocation.step_id,
            exit_code = ?output.exit_code,
            timed_out = output.timed_out,
            "finished"
        );
        Ok(output)
    }

    fn probe(&self, probe: &Probe) -> bool {
        let holds = evaluate_probe(probe, self.timeout.min(PROBE_TIMEOUT));
        tracing::debug!(probe = %probe, holds, "evaluated probe");
        holds
    }
}

/// Run `invocation` in its own process group and wait for it, and for
/// anything still holding its stdout or stderr, until `timeout` elapses.
/// Past the deadline the whole group is stopped and the output is marked
/// timed out.
pub fn run_bounded(invocation: &Invocation, timeout: Duration) -> Result<CommandOutput> {
    // A timeout too large to add to now means no deadline
    let deadline = Instant::now().checked_add(timeout);

    let mut child = Command::new(&invocation.program)
        .args(&invocation.args)
        .stdin(if invocation.stdin.is_some() { Stdio::piped() } else { Stdio::null() })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .in_new_process_group()
        .spawn()
        .with_context(|| format!("Failed to spawn {}", invocation.program))?;
    let pid = child.id();
    register_child(pid, &invocation.step_id);

    let writer = match (child.stdin.take(), &invocation.stdin) {
        (Some(mut pipe), Some(input)) => {
            let input = input.clone();
            // Dropping the pipe at the end of the thread closes stdin
            Some(thread::spawn(move || pipe.write_all(input.as_bytes())))
        }
        _ => None,
    };
    let mut output = OutputCollector::start(child.stdout.take(), child.stderr.take());

    let status = match wait_for_exit(&mut child, deadline) {
        Ok(status) => status,
        Err(e) => {
            stop_group(&mut child);
            unregister_child(pid);
            return Err(e);
        }
    };

    let mut timed_out = false;
    let status = match status {
        Some(status) => {
            // The leader is gone but a background member may keep the pipes open
            if !output.collect(deadline) {
                tracing::warn!(pid, step = %invocation.step_id, "output still open at deadline, stopping process group");
                timed_out = true;
                terminate_group(pid, TIMEOUT_GRACE_PERIOD);
            }
            Some(status)
        }
        None => {
            tracing::warn!(pid, step = %invocation.step_id, timeout_secs = timeout.as_secs(), "command timed out");
            timed_out = true;
            stop_group(&mut child)
        }
    };
    if timed_out {
        // Readers stuck on a process that left the group are abandoned
        output.collect(Instant::now().checked_add(DRAIN_GRACE));
    }
    unregister_child(pid);

    if let Some(writer) = writer {
        if writer.is_finished() {
            if let Ok(Err(e)) = writer.join() {
                // EPIPE when the program exits without reading all input
                tracing::debug!(step = %invocation.step_id, error = %e, "stdin write incomplete");
            }
        }
    }

    Ok(CommandOutput {
        stdout: output.stdout,
        stderr: output.stderr,
        exit_code: status.and_then(|s| s.code()),
        timed_out,
    })
}

/// `None` when the deadline passed first
fn wait_for_exit(child: &mut Child, deadline: Option<Instant>) -> Result<Option<ExitStatus>> {
    loop {
        if let Some(status) = child.try_wait().context("Failed to poll child process")? {
            return Ok(Some(status));
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Terminate the child's group and reap the leader.
fn stop_group(child: &mut Child) -> Option<ExitStatus> {
    terminate_group(child.id(), TIMEOUT_GRACE_PERIOD);
    let _ = child.kill();
    child.wait().ok()
}

enum Stream {
    Stdout,
    Stderr,
}

/// Reads stdout and stderr on their own threads; each thread reports once
/// its pipe reaches EOF.
struct OutputCollector {
    done: Receiver<(Stream, String)>,
    pending: usize,
    stdout: String,
    stderr: String,
}

impl OutputCollector {
    fn start(stdout: Option<ChildStdout>, stderr: Option<ChildStderr>) -> Self {
        let (tx, done) = mpsc::channel();
        let mut pending = 0;
        if let Some(pipe) = stdout {
            spawn_reader(Stream::Stdout, pipe, tx.clone());
            pending += 1;
        }
        if let Some(pipe) = stderr {
            spawn_reader(Stream::Stderr, pipe, tx);
            pending += 1;
        }
        Self {
            done,
            pending,
            stdout: String::new(),
            stderr: String::new(),
        }
    }

    /// Wait for both pipes to close. Returns false if `deadline` came first.
    fn collect(&mut self, deadline: Option<Instant>) -> bool {
        while self.pending > 0 {
            let received = match deadline {
                Some(d) => self.done.recv_timeout(d.saturating_duration_since(Instant::now())),
                None => self.done.recv().map_err(|_| RecvTimeoutError::Disconnected),
            };
            match received {
                Ok((Stream::Stdout, text)) => self.stdout = text,
                Ok((Stream::Stderr, text)) => self.stderr = text,
                Err(RecvTimeoutError::Timeout) => return false,
                // A reader thread died; nothing more will arrive
                Err(RecvTimeoutError::Disconnected) => {
                    self.pending = 0;
                    break;
                }
            }
            self.pending -= 1;
        }
        true
    }
}

fn spawn_reader<R: Read + Send + 'static>(stream: Stream, mut source: R, done: Sender<(Stream, String)>) {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = source.read_to_end(&mut buf);
        let _ = done.send((stream, String::from_utf8_lossy(&buf).into_owned()));
    });
}

/// Evaluate a probe against the live system. Command probes share the
/// bounded wait of step commands.
pub fn evaluate_probe(probe: &Probe, timeout: Duration) -> bool {
    match probe {
        Probe::PathExists(path) => path.exists(),
        Probe::FileContainsLine { path, line } => std::fs::read_to_string(path)
            .map(|contents| contains_line(&contents, line))
            .unwrap_or(false),
        Probe::IsMountPoint(path) => command_succeeds(
            "mountpoint",
            &["-q".to_string(), path.to_string_lossy().into_owned()],
            timeout,
        ),
        Probe::SwapActive(path) => std::fs::read_to_string("/proc/swaps")
            .map(|swaps| swaps_contains(&swaps, path))
            .unwrap_or(false),
        Probe::CommandSucceeds { program, args } => command_succeeds(program, args, timeout),
    }
}

fn command_succeeds(program: &str, args: &[String], timeout: Duration) -> bool {
    let invocation = Invocation {
        step_id: format!("probe-{}", program),
        program: program.to_string(),
        args: args.to_vec(),
        stdin: None,
    };
    match run_bounded(&invocation, timeout) {
        Ok(output) => output.success(),
        Err(e) => {
            tracing::debug!(program, error = %e, "probe command could not run");
            false
        }
    }
}

/// Exact line match, ignoring trailing whitespace
pub fn contains_line(contents: &str, line: &str) -> bool {
    contents.lines().any(|l| l.trim_end() == line)
}

/// Whether `/proc/swaps` content lists `path`. The first line is a header.
pub fn swaps_contains(swaps: &str, path: &Path) -> bool {
    swaps
        .lines()
        .skip(1)
        .filter_map(|l| l.split_whitespace().next())
        .any(|name| Path::new(name) == path)
}

// ============================================================================
// Dry-run runner
// ============================================================================

/// Logs each invocation and reports success without touching the system.
/// Probes never hold, so every step is "run".
#[derive(Debug, Default, Clone)]
pub struct DryRunRunner;

impl CommandRunner for DryRunRunner {
    fn run(&self, invocation: &Invocation) -> Result<CommandOutput> {
        tracing::info!(step = %invocation.step_id, command = %invocation.command_line(), "dry-run");
        Ok(CommandOutput {
            stdout: format!("dry-run: {}\n", invocation.command_line()),
            exit_code: Some(0),
            ..CommandOutput::default()
        })
    }

    fn probe(&self, _probe: &Probe) -> bool {
        false
    }
}
