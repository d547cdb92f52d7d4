//! Console report lines for batches and the run summary.

use ipcstress_process::CpuDelta;

use crate::totals::{bytes_transferred, BatchStats, RunTotals};

fn pct(seconds: f64, elapsed: f64) -> f64 {
    if elapsed > 0.0 {
        100.0 * seconds / elapsed
    } else {
        0.0
    }
}

fn cpu_fragment(name: &str, delta: &CpuDelta, elapsed: f64) -> String {
    format!(
        "{name}: {}s {:.2}% user, {}s {:.2}% kernel, {}s {:.2}% total",
        delta.user_seconds,
        pct(delta.user_seconds, elapsed),
        delta.kernel_seconds,
        pct(delta.kernel_seconds, elapsed),
        delta.total_seconds(),
        pct(delta.total_seconds(), elapsed),
    )
}

fn proxy_name(proxy_count: usize) -> String {
    if proxy_count > 1 {
        format!("proxies({proxy_count})")
    } else {
        "proxy".to_string()
    }
}

/// Per-batch statistics line.
pub fn batch_line(
    stats: &BatchStats,
    requested_total: u64,
    proxy_count: usize,
    workload_sizes: &[u64],
) -> String {
    let elapsed = stats.elapsed_seconds;
    let rps = if elapsed > 0.0 {
        stats.actual_count as f64 / elapsed
    } else {
        0.0
    };

    let mut line = format!(
        "{}/{} in {:.2}s, {:.2} rps, ",
        stats.completed_after, requested_total, elapsed, rps
    );
    if let Some(nbytes) = bytes_transferred(stats.actual_count, workload_sizes) {
        let bps = if elapsed > 0.0 {
            nbytes as f64 / elapsed
        } else {
            0.0
        };
        line.push_str(&format!("{bps:.0} bps, "));
    }
    line.push_str(&cpu_fragment("cache", &stats.cache, elapsed));
    line.push_str(", ");
    line.push_str(&cpu_fragment(&proxy_name(proxy_count), &stats.proxy, elapsed));
    line
}

/// Run-level summary line, same derivation rule as per-batch.
pub fn summary_line(totals: &RunTotals, proxy_count: usize, workload_sizes: &[u64]) -> String {
    let elapsed = totals.elapsed_seconds;
    let rps = if elapsed > 0.0 {
        totals.requests_completed as f64 / elapsed
    } else {
        0.0
    };

    let mut line = format!("Summary: {elapsed:.2}s, {rps:.2} rps, ");
    if let Some(nbytes) = bytes_transferred(totals.requests_completed, workload_sizes) {
        let bps = if elapsed > 0.0 {
            nbytes as f64 / elapsed
        } else {
            0.0
        };
        line.push_str(&format!("{bps:.0} bps, "));
    }
    line.push_str(&cpu_fragment("cache", &totals.cache, elapsed));
    line.push_str(", ");
    line.push_str(&cpu_fragment(&proxy_name(proxy_count), &totals.proxy, elapsed));
    line
}
