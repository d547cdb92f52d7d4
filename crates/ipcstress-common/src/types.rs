//! Core domain types and run-wide constants.

use std::fmt;
use std::time::Duration;

/// Maximum request count per download client invocation. The client
/// enforces the same ceiling on its own, so larger runs are issued as a
/// sequence of batches.
pub const MAX_CLIENT_REQUEST_COUNT: u64 = 1000;

/// Grace period between SIGTERM and SIGKILL when stopping a child.
pub const TERMINATE_GRACE: Duration = Duration::from_secs(2);

/// Interval between child status polls in the benchmark control loop.
pub const SCHEDULER_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Delay after launching cache/proxy before issuing requests, so the
/// services can bind their listening ports.
pub const SERVICE_STARTUP_DELAY: Duration = Duration::from_millis(250);

/// Timeout on the output queue after which the printer re-checks whether
/// any stream is still open.
pub const OUTPUT_QUEUE_POLL: Duration = Duration::from_millis(100);

/// Functional identity of a supervised child process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Cache,
    Proxy,
    Download,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Cache => "CACHE",
            Role::Proxy => "PROXY",
            Role::Download => "DOWNLOAD",
        }
    }

    /// Display label for a process, disambiguated by index when several
    /// processes share the role (`PROXY0`, `PROXY1`, ...).
    pub fn label(&self, index: usize, count: usize) -> String {
        if count > 1 {
            format!("{}{}", self.as_str(), index)
        } else {
            self.as_str().to_string()
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal result of a benchmark run. The numeric exit code is the
/// externally observable contract for callers scripting the tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Success,
    CacheDied,
    ProxyDied,
    BothDied,
}

impl RunOutcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            RunOutcome::Success => 0,
            RunOutcome::CacheDied => 1,
            RunOutcome::ProxyDied => 2,
            RunOutcome::BothDied => 3,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Success)
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunOutcome::Success => write!(f, "success"),
            RunOutcome::CacheDied => write!(f, "cache died"),
            RunOutcome::ProxyDied => write!(f, "proxy died"),
            RunOutcome::BothDied => write!(f, "cache and proxy died"),
        }
    }
}
