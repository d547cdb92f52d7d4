//! Per-batch results and the run-level accumulator.

use ipcstress_process::CpuDelta;

/// Measurements for one completed download batch. Proxy CPU time is the
/// sum over all proxy targets.
#[derive(Debug, Clone, Default)]
pub struct BatchStats {
    /// Requests issued in this batch.
    pub actual_count: u64,
    /// Requests completed across the run including this batch.
    pub completed_after: u64,
    pub elapsed_seconds: f64,
    pub cache: CpuDelta,
    pub proxy: CpuDelta,
}

/// Accumulated measurements across the whole run, folded once per batch
/// and finalized into the printed summary.
#[derive(Debug, Clone, Default)]
pub struct RunTotals {
    pub elapsed_seconds: f64,
    pub cache: CpuDelta,
    pub proxy: CpuDelta,
    pub requests_completed: u64,
}

impl RunTotals {
    pub fn fold(&mut self, batch: &BatchStats) {
        self.elapsed_seconds += batch.elapsed_seconds;
        self.cache += batch.cache;
        self.proxy += batch.proxy;
        self.requests_completed += batch.actual_count;
    }
}

/// Total bytes moved by a batch, derivable only when the request count
/// divides evenly across the distinct workload sizes (the download
/// client does not promise an even file distribution otherwise).
pub fn bytes_transferred(actual_count: u64, workload_sizes: &[u64]) -> Option<u64> {
    if workload_sizes.is_empty() {
        return None;
    }
    let count = workload_sizes.len() as u64;
    if actual_count % count != 0 {
        return None;
    }
    Some((actual_count / count) * workload_sizes.iter().sum::<u64>())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fold_accumulates() {
        let mut totals = RunTotals::default();
        let batch = BatchStats {
            actual_count: 1000,
            completed_after: 1000,
            elapsed_seconds: 2.5,
            cache: CpuDelta {
                user_seconds: 0.5,
                kernel_seconds: 0.25,
            },
            proxy: CpuDelta {
                user_seconds: 1.0,
                kernel_seconds: 0.75,
            },
        };
        totals.fold(&batch);
        totals.fold(&BatchStats {
            actual_count: 500,
            completed_after: 1500,
            elapsed_seconds: 1.5,
            ..batch.clone()
        });

        assert_eq!(totals.requests_completed, 1500);
        assert_eq!(totals.elapsed_seconds, 4.0);
        assert_eq!(totals.cache.user_seconds, 1.0);
        assert_eq!(totals.proxy.kernel_seconds, 1.5);
    }

    #[test]
    fn test_bytes_only_on_even_multiples() {
        let sizes = [0u64, 64, 128];
        assert_eq!(bytes_transferred(3, &sizes), Some(192));
        assert_eq!(bytes_transferred(6, &sizes), Some(384));
        assert_eq!(bytes_transferred(4, &sizes), None);
        assert_eq!(bytes_transferred(110, &sizes), None);
    }

    #[test]
    fn test_bytes_with_no_sizes() {
        assert_eq!(bytes_transferred(10, &[]), None);
    }
}
