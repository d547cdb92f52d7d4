//! The benchmark control loop.
//!
//! One control task drives the pipeline: launch cache and proxies, issue
//! download batches capped at the client's per-invocation ceiling, poll
//! child liveness once per second, sample CPU deltas at batch boundaries,
//! and fold everything into the run totals. A cache or proxy dying
//! mid-run halts the benchmark with the matching outcome; there is no
//! retry.

use std::time::Instant;

use ipcstress_common::{
    ProcessResult, Role, RunOutcome, StressResult, MAX_CLIENT_REQUEST_COUNT,
    SCHEDULER_POLL_INTERVAL, SERVICE_STARTUP_DELAY,
};
use ipcstress_output::OutputMultiplexer;
use ipcstress_process::{cpu, CpuDelta, CpuSample, ManagedProcess, ProcessSupervisor};
use tracing::debug;

use crate::config::StressConfig;
use crate::distribute::split_evenly;
use crate::report;
use crate::totals::{BatchStats, RunTotals};

/// Final result of one benchmark run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub totals: RunTotals,
}

/// In-flight batch bookkeeping.
struct Batch {
    actual_count: u64,
    started: Instant,
}

pub struct BenchmarkScheduler {
    config: StressConfig,
    supervisor: ProcessSupervisor,
}

impl BenchmarkScheduler {
    pub fn new(config: StressConfig, supervisor: ProcessSupervisor) -> Self {
        Self { config, supervisor }
    }

    /// Run the benchmark to completion. Whatever happens, every child
    /// this run launched has been stopped by the time this returns.
    pub async fn run(&self) -> StressResult<RunReport> {
        let result = self.run_pipeline().await;
        self.supervisor.registry().drain_all();
        result
    }

    async fn run_pipeline(&self) -> StressResult<RunReport> {
        let ticks = cpu::ticks_per_second();
        let mut mux = OutputMultiplexer::new();

        let mut cache = self.launch_cache()?;
        mux.attach(&mut cache);

        let mut proxies = Vec::with_capacity(self.config.proxy_count);
        for index in 0..self.config.proxy_count {
            let mut proxy = self.launch_proxy(index)?;
            mux.attach(&mut proxy);
            proxies.push(proxy);
        }
        mux.start_printer();

        // Let the services bind their ports before the first request.
        tokio::time::sleep(SERVICE_STARTUP_DELAY).await;

        let mut cache_prev: Option<CpuSample> = None;
        let mut proxy_prev: Vec<Option<CpuSample>> = vec![None; proxies.len()];
        advance_sample(&mut cache_prev, cache.pid, ticks);
        for (prev, proxy) in proxy_prev.iter_mut().zip(&proxies) {
            advance_sample(prev, proxy.pid, ticks);
        }

        let mut remaining = self.config.request_count;
        let mut completed: u64 = 0;
        let mut totals = RunTotals::default();
        let mut downloads: Vec<ManagedProcess> = Vec::new();
        let mut batch: Option<Batch> = None;

        let outcome = loop {
            let downloads_done = downloads.iter_mut().all(|d| d.poll().is_some());

            if downloads_done {
                if let Some(finished) = batch.take() {
                    for download in downloads.drain(..) {
                        self.supervisor.reap(&download);
                    }

                    let elapsed = finished.started.elapsed().as_secs_f64();
                    let cache_delta = advance_sample(&mut cache_prev, cache.pid, ticks);
                    let mut proxy_delta = CpuDelta::default();
                    for (prev, proxy) in proxy_prev.iter_mut().zip(&proxies) {
                        proxy_delta += advance_sample(prev, proxy.pid, ticks);
                    }

                    completed += finished.actual_count;
                    let stats = BatchStats {
                        actual_count: finished.actual_count,
                        completed_after: completed,
                        elapsed_seconds: elapsed,
                        cache: cache_delta,
                        proxy: proxy_delta,
                    };
                    println!(
                        "{}",
                        report::batch_line(
                            &stats,
                            self.config.request_count,
                            self.config.proxy_count,
                            &self.config.workload_sizes,
                        )
                    );
                    totals.fold(&stats);
                }

                if remaining == 0 {
                    break RunOutcome::Success;
                }

                let actual = remaining.min(MAX_CLIENT_REQUEST_COUNT);
                remaining -= actual;
                downloads = self.launch_downloads(actual, &mux)?;
                batch = Some(Batch {
                    actual_count: actual,
                    started: Instant::now(),
                });
            }

            let cache_exit = cache.poll();
            let proxy_exits: Vec<Option<i32>> = proxies.iter_mut().map(|p| p.poll()).collect();
            let all_proxies_exited = proxy_exits.iter().all(|e| e.is_some());
            let any_proxy_exited = proxy_exits.iter().any(|e| e.is_some());

            if let Some(code) = cache_exit {
                if all_proxies_exited {
                    if self.config.proxy_count > 1 {
                        println!("Both cache exited ({code}) and all proxies exited");
                    } else {
                        let proxy_code = proxy_exits.first().copied().flatten().unwrap_or(-1);
                        println!("Both cache exited ({code}) and proxy ({proxy_code}) exited");
                    }
                    break RunOutcome::BothDied;
                }
                println!("Cache exited ({code})");
                break RunOutcome::CacheDied;
            }
            if any_proxy_exited {
                if self.config.proxy_count > 1 {
                    let exited: Vec<usize> = proxy_exits
                        .iter()
                        .enumerate()
                        .filter_map(|(i, e)| e.map(|_| i))
                        .collect();
                    println!("Proxies {exited:?} exited");
                } else {
                    let code = proxy_exits.first().copied().flatten().unwrap_or(-1);
                    println!("Proxy exited ({code})");
                }
                break RunOutcome::ProxyDied;
            }

            tokio::time::sleep(SCHEDULER_POLL_INTERVAL).await;
        };

        // Stop everything still running: the graceful stop of the
        // finalizing path, and cleanup of the remaining children on the
        // failure paths. Already-exited children are just unregistered.
        for download in downloads.iter_mut() {
            self.supervisor.terminate(download).await;
        }
        for proxy in proxies.iter_mut() {
            self.supervisor.terminate(proxy).await;
        }
        self.supervisor.terminate(&mut cache).await;

        if outcome.is_success() && totals.elapsed_seconds > 0.0 {
            println!(
                "{}",
                report::summary_line(&totals, self.config.proxy_count, &self.config.workload_sizes)
            );
        }

        mux.wait_printer().await;

        Ok(RunReport { outcome, totals })
    }

    fn launch_cache(&self) -> ProcessResult<ManagedProcess> {
        let args = vec![
            "-c".to_string(),
            format!("./{}", self.config.locals_file),
            "-t".to_string(),
            self.config.cache_thread_count.to_string(),
        ];
        self.supervisor.launch(
            Role::Cache,
            0,
            1,
            &self.config.cache_bin,
            &args,
            &self.config.workdir,
        )
    }

    fn launch_proxy(&self, index: usize) -> ProcessResult<ManagedProcess> {
        let args = vec![
            "-n".to_string(),
            self.config.proxy_segment_count.to_string(),
            "-p".to_string(),
            self.config.port_for(index).to_string(),
            "-t".to_string(),
            self.config.proxy_thread_count.to_string(),
            "-z".to_string(),
            self.config.proxy_segment_size.to_string(),
        ];
        self.supervisor.launch(
            Role::Proxy,
            index,
            self.config.proxy_count,
            &self.config.proxy_bin,
            &args,
            &self.config.workdir,
        )
    }

    /// Launch the download client(s) for one batch, spreading requests
    /// and threads across the proxy targets. Targets assigned zero
    /// requests get no process.
    fn launch_downloads(
        &self,
        actual_count: u64,
        mux: &OutputMultiplexer,
    ) -> ProcessResult<Vec<ManagedProcess>> {
        let requests = split_evenly(actual_count, self.config.proxy_count);
        let threads = split_evenly(
            u64::from(self.config.download_thread_count),
            self.config.proxy_count,
        );

        let mut launched = Vec::new();
        for (index, &count) in requests.iter().enumerate() {
            if count == 0 {
                continue;
            }
            let args = vec![
                "-p".to_string(),
                self.config.port_for(index).to_string(),
                "-t".to_string(),
                threads[index].to_string(),
                "-w".to_string(),
                format!("./{}", self.config.workload_file),
                "-r".to_string(),
                count.to_string(),
            ];
            let mut download = self.supervisor.launch(
                Role::Download,
                index,
                self.config.proxy_count,
                &self.config.download_bin,
                &args,
                &self.config.workdir,
            )?;
            mux.attach(&mut download);
            launched.push(download);
        }
        Ok(launched)
    }
}

/// Take a fresh CPU sample for `pid` and return the delta against the
/// previous one. A reclaimed accounting record is not an error: the delta
/// is simply skipped for this boundary.
fn advance_sample(prev: &mut Option<CpuSample>, pid: u32, ticks_per_second: u64) -> CpuDelta {
    match cpu::sample(pid) {
        Ok(current) => {
            let delta = prev
                .map(|p| p.delta(&current, ticks_per_second))
                .unwrap_or_default();
            *prev = Some(current);
            delta
        }
        Err(e) => {
            debug!(pid, error = %e, "CPU sample unavailable, skipping delta");
            CpuDelta::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_sizing_exhausts_in_ceil_batches() {
        for remaining_start in [1u64, 999, 1000, 1001, 2500, 10_000] {
            let mut remaining = remaining_start;
            let mut batches = 0;
            while remaining > 0 {
                let actual = remaining.min(MAX_CLIENT_REQUEST_COUNT);
                assert_eq!(actual, remaining.min(1000));
                remaining -= actual;
                batches += 1;
            }
            assert_eq!(remaining, 0);
            assert_eq!(batches, remaining_start.div_ceil(1000));
        }
    }

    #[test]
    fn test_advance_sample_skips_reclaimed_record() {
        // PID 0 has no stat record; the delta must be zero and the call
        // must not fail.
        let mut prev = Some(CpuSample {
            user_ticks: 10,
            kernel_ticks: 10,
        });
        let delta = advance_sample(&mut prev, 0, 100);
        assert_eq!(delta, CpuDelta::default());
    }

    #[test]
    fn test_advance_sample_establishes_baseline() {
        let pid = std::process::id();
        let mut prev = None;
        let first = advance_sample(&mut prev, pid, 100);
        assert_eq!(first, CpuDelta::default());
        assert!(prev.is_some());
    }
}
