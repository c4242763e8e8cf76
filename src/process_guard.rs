//! Lifetime of the external commands a run spawns
//!
//! A step may be halfway through `parted` or `mkfs` when the wizard exits or
//! crashes. A partitioning tool left running against the target disk is
//! worse than a failed run, so each step's command lives in its own process
//! group, is recorded here under its step id while it runs, and is torn down
//! when the `ProcessGuard` drops or the process receives SIGINT, SIGTERM or
//! SIGHUP.

use nix::libc;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};
use std::time::{Duration, Instant};

/// SIGTERM to SIGKILL delay when the application shuts down
pub const SHUTDOWN_GRACE_PERIOD: Duration = Duration::from_secs(5);

/// SIGTERM to SIGKILL delay when a signal interrupts us
pub const SIGNAL_GRACE_PERIOD: Duration = Duration::from_secs(3);

/// How long SIGKILLed members get to disappear
const KILL_SETTLE: Duration = Duration::from_secs(2);

const LIVENESS_POLL: Duration = Duration::from_millis(100);

/// Process groups of running steps, keyed by group leader pid
#[derive(Debug, Default)]
pub struct ChildRegistry {
    groups: HashMap<u32, String>,
    shut_down: bool,
}

impl ChildRegistry {
    pub fn track(&mut self, pid: u32, step_id: &str) {
        tracing::debug!(pid, step = step_id, "tracking step process group");
        self.groups.insert(pid, step_id.to_string());
    }

    pub fn release(&mut self, pid: u32) -> Option<String> {
        self.groups.remove(&pid)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Step ids of every tracked group, sorted
    pub fn running_steps(&self) -> Vec<&str> {
        let mut steps: Vec<&str> = self.groups.values().map(String::as_str).collect();
        steps.sort_unstable();
        steps
    }

    /// Terminate every tracked group. Only the first call does anything;
    /// groups tracked afterwards are left to their runner.
    pub fn shutdown(&mut self, grace_period: Duration) {
        if std::mem::replace(&mut self.shut_down, true) {
            return;
        }
        for (pid, step_id) in self.groups.drain() {
            tracing::warn!(pid, step = %step_id, "terminating step still running at shutdown");
            terminate_group(pid, grace_period);
        }
    }
}

fn registry() -> &'static Mutex<ChildRegistry> {
    static REGISTRY: OnceLock<Mutex<ChildRegistry>> = OnceLock::new();
    REGISTRY.get_or_init(Mutex::default)
}

/// Record `pid` as the group running `step_id`. A poisoned registry only
/// costs tracking; the command still runs.
pub fn register_child(pid: u32, step_id: &str) {
    match registry().lock() {
        Ok(mut r) => r.track(pid, step_id),
        Err(_) => tracing::warn!(pid, step = step_id, "child registry poisoned, group not tracked"),
    }
}

pub fn unregister_child(pid: u32) {
    if let Ok(mut r) = registry().lock() {
        r.release(pid);
    }
}

fn shutdown_registry(grace_period: Duration) {
    if let Ok(mut r) = registry().lock() {
        r.shutdown(grace_period);
    }
}

/// SIGTERM every member of the group led by `pgid`, then SIGKILL whatever
/// is left after `grace_period`. Waits on the members, not the leader: a
/// leader that already exited may leave children behind in the group.
pub fn terminate_group(pgid: u32, grace_period: Duration) {
    if !signal_group(pgid, Signal::SIGTERM) {
        return;
    }
    if wait_for_empty_group(pgid, grace_period) {
        return;
    }

    tracing::warn!(pgid, survivors = ?group_members(pgid), "process group ignored SIGTERM, sending SIGKILL");
    signal_group(pgid, Signal::SIGKILL);
    if !wait_for_empty_group(pgid, KILL_SETTLE) {
        tracing::error!(pgid, survivors = ?group_members(pgid), "process group survived SIGKILL");
    }
}

fn wait_for_empty_group(pgid: u32, timeout: Duration) -> bool {
    let deadline = Instant::now().checked_add(timeout);
    loop {
        if !group_alive(pgid) {
            return true;
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            return false;
        }
        std::thread::sleep(LIVENESS_POLL);
    }
}

/// Negative pid addresses the whole group, so tools started by a bash step
/// see the signal too. Returns whether anything was signalled.
fn signal_group(pgid: u32, sig: Signal) -> bool {
    match signal::kill(Pid::from_raw(-(pgid as i32)), sig) {
        Ok(()) => true,
        Err(e) => {
            tracing::debug!(pgid, signal = %sig, error = %e, "nothing to signal");
            false
        }
    }
}

fn group_alive(pgid: u32) -> bool {
    match std::fs::read_dir("/proc") {
        Ok(_) => !group_members(pgid).is_empty(),
        // Without /proc, zombies cannot be told apart; ask the kernel
        Err(_) => signal::kill(Pid::from_raw(-(pgid as i32)), None).is_ok(),
    }
}

/// Live (non-zombie) processes whose process group is `pgid`
pub fn group_members(pgid: u32) -> Vec<u32> {
    let Ok(entries) = std::fs::read_dir("/proc") else {
        return Vec::new();
    };
    let mut members: Vec<u32> = entries
        .filter_map(|entry| entry.ok()?.file_name().to_str()?.parse().ok())
        .filter(|&pid| matches!(proc_stat(pid), Some(stat) if stat.pgrp == pgid && !stat.is_zombie()))
        .collect();
    members.sort_unstable();
    members
}

struct ProcStat {
    state: String,
    pgrp: u32,
}

impl ProcStat {
    fn is_zombie(&self) -> bool {
        matches!(self.state.as_str(), "Z" | "X")
    }
}

/// `/proc/<pid>/stat` is "pid (comm) state ppid pgrp ..."; comm may contain
/// spaces and parentheses, so fields are split after the last `)`.
fn proc_stat(pid: u32) -> Option<ProcStat> {
    let stat = std::fs::read_to_string(format!("/proc/{}/stat", pid)).ok()?;
    let mut fields = stat.rsplit_once(')')?.1.split_whitespace();
    let state = fields.next()?.to_string();
    let _ppid = fields.next()?;
    let pgrp = fields.next()?.parse().ok()?;
    Some(ProcStat { state, pgrp })
}

/// Exists and is not a zombie.
pub fn is_process_alive(pid: u32) -> bool {
    if signal::kill(Pid::from_raw(pid as i32), None).is_err() {
        return false;
    }
    proc_stat(pid).map(|stat| !stat.is_zombie()).unwrap_or(true)
}

/// Terminates every tracked step process when dropped. The `App` owns one
/// for its whole lifetime.
#[derive(Default)]
pub struct ProcessGuard {
    _private: (),
}

impl ProcessGuard {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Drop for ProcessGuard {
    fn drop(&mut self) {
        shutdown_registry(SHUTDOWN_GRACE_PERIOD);
    }
}

/// Handle SIGINT/SIGTERM/SIGHUP on a background thread: stop tracked step
/// processes, then exit with 128 + signal number.
pub fn init_signal_handlers() -> std::io::Result<()> {
    use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM, SIGHUP])?;
    std::thread::Builder::new()
        .name("signal-handler".to_string())
        .spawn(move || {
            if let Some(raw) = signals.forever().next() {
                let name = Signal::try_from(raw).map(Signal::as_str).unwrap_or("unknown");
                tracing::info!(signal = name, "interrupted, stopping running steps");
                shutdown_registry(SIGNAL_GRACE_PERIOD);
                std::process::exit(128 + raw);
            }
        })?;
    Ok(())
}

/// Isolate a `Command` in its own process group that dies with us.
pub trait CommandProcessGroup {
    fn in_new_process_group(&mut self) -> &mut Self;
}

impl CommandProcessGroup for std::process::Command {
    fn in_new_process_group(&mut self) -> &mut Self {
        use std::os::unix::process::CommandExt;
        // SAFETY: setpgid and prctl are async-signal-safe
        unsafe {
            self.pre_exec(|| {
                nix::unistd::setpgid(Pid::from_raw(0), Pid::from_raw(0)).map_err(std::io::Error::other)?;
                if libc::prctl(libc::PR_SET_PDEATHSIG, libc::SIGTERM) == -1 {
                    return Err(std::io::Error::last_os_error());
                }
                Ok(())
            });
        }
        self
    }
}
