//! Process supervision: managed child handles and the crash-safe
//! process registry.
//!
//! The supervisor owns launching and stopping children. Every launched
//! process is registered (pid + label) before `launch` returns, and the
//! registry's `drain_all` terminates whatever is still tracked. Draining
//! is idempotent and safe to invoke concurrently from a signal handler,
//! an exit guard, and the normal completion path, all under the same
//! lock that guards registration.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use ipcstress_common::{ProcessError, ProcessResult, Role, TERMINATE_GRACE};
use parking_lot::Mutex;
use tokio::process::{Child, ChildStderr, ChildStdout};
use tracing::{debug, info, warn};

use crate::execute::spawn_piped;
use crate::terminate::{force_kill, terminate_blocking, terminate_gracefully};

/// A child process launched and tracked by the supervisor.
///
/// Owns the OS child handle exclusively; other components reference the
/// process only by pid or by the output streams taken from it.
pub struct ManagedProcess {
    pub role: Role,
    pub label: String,
    pub pid: u32,
    pub command_line: String,
    pub launched_at: DateTime<Utc>,
    child: Child,
}

impl ManagedProcess {
    /// Non-blocking exit check. Children reaped by a signal report -1.
    pub fn poll(&mut self) -> Option<i32> {
        match self.child.try_wait() {
            Ok(Some(status)) => Some(status.code().unwrap_or(-1)),
            Ok(None) => None,
            // Already reaped elsewhere; treat as exited.
            Err(_) => Some(-1),
        }
    }

    /// Take the piped output streams for the multiplexer. Each stream can
    /// be taken once.
    pub fn take_output(&mut self) -> (Option<ChildStdout>, Option<ChildStderr>) {
        (self.child.stdout.take(), self.child.stderr.take())
    }

    /// Stop this child: SIGTERM, wait out the grace period, SIGKILL if it
    /// is still running, and reap it. Never fails; every error along the
    /// way is swallowed.
    pub async fn terminate(&mut self) {
        if self.poll().is_some() {
            return;
        }
        debug!(label = %self.label, pid = self.pid, "terminating child");
        let _ = terminate_gracefully(self.pid);

        let deadline = Instant::now() + TERMINATE_GRACE;
        while Instant::now() < deadline {
            if self.poll().is_some() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        warn!(label = %self.label, pid = self.pid, "graceful stop timed out, force killing");
        let _ = force_kill(self.pid);
        let _ = self.child.wait().await;
    }
}

struct TrackedProcess {
    pid: u32,
    label: String,
}

/// Process-wide registry of launched children, guarded by one lock.
///
/// The lock is held only for registration, unregistration, and the drain
/// snapshot, never across a blocking wait.
#[derive(Clone, Default)]
pub struct ProcessRegistry {
    inner: Arc<Mutex<Vec<TrackedProcess>>>,
}

impl ProcessRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn register(&self, pid: u32, label: &str) {
        self.inner.lock().push(TrackedProcess {
            pid,
            label: label.to_string(),
        });
    }

    /// Drop a single entry once its process is confirmed exited or
    /// terminated.
    pub fn unregister(&self, pid: u32) {
        self.inner.lock().retain(|t| t.pid != pid);
    }

    /// Number of processes currently tracked.
    pub fn tracked(&self) -> usize {
        self.inner.lock().len()
    }

    /// Terminate every process still tracked and clear the registry.
    ///
    /// The tracked set is swapped out under the lock and terminated
    /// outside it, so concurrent callers each drain a disjoint (possibly
    /// empty) snapshot. Calling this on an empty registry is a no-op.
    pub fn drain_all(&self) {
        let drained = {
            let mut tracked = self.inner.lock();
            std::mem::take(&mut *tracked)
        };
        for entry in drained {
            info!(label = %entry.label, pid = entry.pid, "draining tracked process");
            terminate_blocking(entry.pid);
        }
    }
}

/// Launches and stops children, keeping the registry current.
#[derive(Clone, Default)]
pub struct ProcessSupervisor {
    registry: ProcessRegistry,
}

impl ProcessSupervisor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle to the registry, for signal handlers and exit guards.
    pub fn registry(&self) -> ProcessRegistry {
        self.registry.clone()
    }

    /// Launch a child with piped output and register it before returning.
    ///
    /// `index`/`count` disambiguate the display label when several
    /// processes share a role.
    pub fn launch(
        &self,
        role: Role,
        index: usize,
        count: usize,
        program: &Path,
        args: &[String],
        workdir: &Path,
    ) -> ProcessResult<ManagedProcess> {
        let label = role.label(index, count);
        let child = spawn_piped(program, args, workdir)?;
        let pid = child.id().ok_or_else(|| {
            ProcessError::spawn_failed(
                program.display().to_string(),
                "process exited before it could be tracked",
            )
        })?;
        self.registry.register(pid, &label);

        let command_line = format!("{} {}", program.display(), args.join(" "));
        info!(label = %label, pid, command = %command_line, "launched child process");

        Ok(ManagedProcess {
            role,
            label,
            pid,
            command_line,
            launched_at: Utc::now(),
            child,
        })
    }

    /// Stop a child and drop it from the registry.
    pub async fn terminate(&self, process: &mut ManagedProcess) {
        process.terminate().await;
        self.registry.unregister(process.pid);
        let uptime = Utc::now().signed_duration_since(process.launched_at);
        debug!(
            label = %process.label,
            pid = process.pid,
            uptime_ms = uptime.num_milliseconds(),
            "child stopped"
        );
    }

    /// Drop an already-exited child from the registry without signaling.
    pub fn reap(&self, process: &ManagedProcess) {
        self.registry.unregister(process.pid);
    }
}
