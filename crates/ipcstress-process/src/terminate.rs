//! Process termination primitives.
//!
//! Termination is two-staged: SIGTERM first, SIGKILL after the grace
//! period. Callers on cleanup paths swallow every error here, since a
//! stop must never itself fail a run.

use std::time::{Duration, Instant};

use ipcstress_common::{ProcessError, ProcessResult, TERMINATE_GRACE};

use crate::check::process_exists;

/// Ask a process to stop (SIGTERM).
pub fn terminate_gracefully(pid: u32) -> ProcessResult<()> {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    kill(Pid::from_raw(pid as i32), Signal::SIGTERM)
        .map_err(|e| ProcessError::stop_failed(pid, e.to_string()))
}

/// Force kill a process (SIGKILL).
pub fn force_kill(pid: u32) -> ProcessResult<()> {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    kill(Pid::from_raw(pid as i32), Signal::SIGKILL)
        .map_err(|e| ProcessError::stop_failed(pid, e.to_string()))
}

/// Best-effort blocking stop by PID alone: SIGTERM, poll for exit during
/// the grace period, then SIGKILL. Used on cleanup paths that hold no
/// child handle (signal handler, exit guard); the owner-handle variant
/// that also reaps the child lives on `ManagedProcess`.
pub fn terminate_blocking(pid: u32) {
    let _ = terminate_gracefully(pid);

    let deadline = Instant::now() + TERMINATE_GRACE;
    loop {
        match process_exists(pid) {
            Ok(true) => {}
            _ => return,
        }
        if Instant::now() >= deadline {
            break;
        }
        std::thread::sleep(Duration::from_millis(50));
    }

    let _ = force_kill(pid);
}
