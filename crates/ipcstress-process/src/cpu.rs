//! CPU time accounting.
//!
//! Reads a process's accumulated user/kernel CPU ticks from
//! `/proc/<pid>/stat` and converts tick deltas to seconds using the
//! platform clock-tick rate.

use std::ops::AddAssign;

use ipcstress_common::{ProcessError, ProcessResult};

/// Accumulated CPU ticks of one process at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CpuSample {
    pub user_ticks: u64,
    pub kernel_ticks: u64,
}

/// Seconds of CPU time consumed between two samples of the same process.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CpuDelta {
    pub user_seconds: f64,
    pub kernel_seconds: f64,
}

impl CpuSample {
    /// Compute the delta from `self` to a later sample of the same
    /// process, scaled by the clock-tick rate. Pure; never fails.
    pub fn delta(&self, later: &CpuSample, ticks_per_second: u64) -> CpuDelta {
        let tps = ticks_per_second.max(1) as f64;
        CpuDelta {
            user_seconds: later.user_ticks.saturating_sub(self.user_ticks) as f64 / tps,
            kernel_seconds: later.kernel_ticks.saturating_sub(self.kernel_ticks) as f64 / tps,
        }
    }
}

impl CpuDelta {
    pub fn total_seconds(&self) -> f64 {
        self.user_seconds + self.kernel_seconds
    }
}

impl AddAssign for CpuDelta {
    fn add_assign(&mut self, other: CpuDelta) {
        self.user_seconds += other.user_seconds;
        self.kernel_seconds += other.kernel_seconds;
    }
}

/// Clock ticks per second, fetched once per run.
pub fn ticks_per_second() -> u64 {
    let ticks = unsafe { libc::sysconf(libc::_SC_CLK_TCK) };
    if ticks > 0 {
        ticks as u64
    } else {
        100
    }
}

/// Read the current CPU sample for a PID.
///
/// Fails with `AccountingUnavailable` once the process has exited and its
/// record was reclaimed; callers skip that delta and continue.
pub fn sample(pid: u32) -> ProcessResult<CpuSample> {
    let content = std::fs::read_to_string(format!("/proc/{pid}/stat"))
        .map_err(|_| ProcessError::accounting_unavailable(pid))?;
    parse_stat_line(&content).ok_or_else(|| ProcessError::invalid_stat(pid, "short stat record"))
}

/// Extract utime/stime (fields 14 and 15) from a stat record. Fields are
/// located relative to the closing paren of the comm field, so command
/// names containing spaces cannot shift them.
fn parse_stat_line(line: &str) -> Option<CpuSample> {
    let (_, rest) = line.rsplit_once(')')?;
    let mut fields = rest.split_whitespace();
    // The field after the comm paren is the state (field 3); utime is
    // field 14, eleven fields further on.
    let user_ticks = fields.nth(11)?.parse().ok()?;
    let kernel_ticks = fields.next()?.parse().ok()?;
    Some(CpuSample {
        user_ticks,
        kernel_ticks,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_stat_line() {
        let line = "1234 (simplecached) S 1 1234 1234 0 -1 4194560 \
                    1189 0 0 0 37 11 0 0 20 0 4 0 1893 22413312 1325 \
                    18446744073709551615 1 1 0 0 0 0 0 4096 0 0 0 0 17 3 0 0 0 0 0";
        let sample = parse_stat_line(line).unwrap();
        assert_eq!(sample.user_ticks, 37);
        assert_eq!(sample.kernel_ticks, 11);
    }

    #[test]
    fn test_parse_stat_line_comm_with_spaces() {
        // Parenthesized comm fields may contain spaces and parens.
        let line = "77 (tmux: server (1)) S 1 77 77 0 -1 4194304 \
                    0 0 0 0 5 7 0 0 20 0 1 0 100 0 0 0";
        let sample = parse_stat_line(line).unwrap();
        assert_eq!(sample.user_ticks, 5);
        assert_eq!(sample.kernel_ticks, 7);
    }

    #[test]
    fn test_parse_stat_line_rejects_short_record() {
        assert!(parse_stat_line("1 (x) S 1 2 3").is_none());
    }

    #[test]
    fn test_delta_is_pure_subtraction_and_scale() {
        let prev = CpuSample {
            user_ticks: 100,
            kernel_ticks: 40,
        };
        let curr = CpuSample {
            user_ticks: 150,
            kernel_ticks: 90,
        };
        let delta = prev.delta(&curr, 100);
        assert_eq!(delta.user_seconds, 0.5);
        assert_eq!(delta.kernel_seconds, 0.5);
        assert_eq!(delta.total_seconds(), 1.0);
    }

    #[test]
    fn test_delta_never_goes_negative() {
        let prev = CpuSample {
            user_ticks: 50,
            kernel_ticks: 50,
        };
        let delta = prev.delta(&CpuSample::default(), 100);
        assert_eq!(delta.user_seconds, 0.0);
        assert_eq!(delta.kernel_seconds, 0.0);
    }

    #[test]
    fn test_sample_own_process() {
        let sample = sample(std::process::id()).unwrap();
        // Ticks only ever accumulate; just prove the record parses.
        assert!(sample.user_ticks < u64::MAX);
    }

    #[test]
    fn test_sample_reclaimed_pid_fails() {
        // PID 0 has no /proc entry.
        assert!(matches!(
            sample(0),
            Err(ProcessError::AccountingUnavailable { pid: 0 })
        ));
    }

    #[test]
    fn test_ticks_per_second_is_positive() {
        assert!(ticks_per_second() > 0);
    }
}
