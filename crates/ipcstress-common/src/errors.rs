//! Error types for the ipcstress orchestrator.

use thiserror::Error;

/// Result type alias for process operations.
pub type ProcessResult<T> = std::result::Result<T, ProcessError>;

/// Result type alias for orchestrator operations.
pub type StressResult<T> = std::result::Result<T, StressError>;

/// Process-level error type.
///
/// Only `SpawnFailed` is fatal to a run; the others are recovered locally
/// by their callers (a missing accounting record skips one CPU delta, a
/// failed stop escalates to a forced kill).
#[derive(Debug, Error, Clone)]
pub enum ProcessError {
    #[error("Process spawn failed: {program} - {reason}")]
    SpawnFailed { program: String, reason: String },

    #[error("Process stop failed: pid {pid} - {reason}")]
    StopFailed { pid: u32, reason: String },

    #[error("Process check failed: pid {pid} - {reason}")]
    CheckFailed { pid: u32, reason: String },

    #[error("CPU accounting unavailable for pid {pid}")]
    AccountingUnavailable { pid: u32 },

    #[error("Invalid CPU accounting record for pid {pid}: {reason}")]
    InvalidStat { pid: u32, reason: String },
}

impl ProcessError {
    pub fn spawn_failed(program: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SpawnFailed {
            program: program.into(),
            reason: reason.into(),
        }
    }

    pub fn stop_failed(pid: u32, reason: impl Into<String>) -> Self {
        Self::StopFailed {
            pid,
            reason: reason.into(),
        }
    }

    pub fn check_failed(pid: u32, reason: impl Into<String>) -> Self {
        Self::CheckFailed {
            pid,
            reason: reason.into(),
        }
    }

    pub fn accounting_unavailable(pid: u32) -> Self {
        Self::AccountingUnavailable { pid }
    }

    pub fn invalid_stat(pid: u32, reason: impl Into<String>) -> Self {
        Self::InvalidStat {
            pid,
            reason: reason.into(),
        }
    }
}

/// Top-level error type for workload generation, verification, and the
/// benchmark run itself.
#[derive(Debug, Error)]
pub enum StressError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error("Manifest error in {path}: {reason}")]
    Manifest { path: String, reason: String },

    #[error("Workload error: {0}")]
    Workload(String),
}

impl StressError {
    pub fn manifest(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Manifest {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn workload(reason: impl Into<String>) -> Self {
        Self::Workload(reason.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_error_construction() {
        let error = ProcessError::spawn_failed("./cache/simplecached", "No such file");
        assert!(matches!(error, ProcessError::SpawnFailed { .. }));
        assert!(format!("{}", error).contains("spawn failed"));

        let error = ProcessError::accounting_unavailable(42);
        assert_eq!(
            format!("{}", error),
            "CPU accounting unavailable for pid 42"
        );
    }

    #[test]
    fn test_stress_error_from_process_error() {
        let error: StressError = ProcessError::stop_failed(1, "ESRCH").into();
        assert!(matches!(error, StressError::Process(_)));
    }
}
