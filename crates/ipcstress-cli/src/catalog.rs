//! The named-test catalog.
//!
//! Each test generates its workload, runs the scheduler with a fixed (or
//! swept) parameter set, and verifies results after every successful
//! run. A sweep stops at the first non-zero outcome or failed
//! verification. Verification failures are narrated but do not change
//! the exit code; only a cache/proxy death does.

use std::path::PathBuf;

use ipcstress_bench::{BenchmarkScheduler, StressConfig};
use ipcstress_common::{RunOutcome, StressResult};
use ipcstress_process::ProcessSupervisor;
use ipcstress_workload::{
    generate, small_file_sizes, standard_sizes, verify, LOCALS_FILENAME, WORKLOAD_FILENAME,
};

/// Smallest shared-memory segment the proxy accepts.
const MIN_SEG_SIZE: u64 = 824;

/// Names accepted as the positional test argument.
pub const TEST_NAMES: &[&str] = &[
    "base",
    "debug",
    "parameter",
    "stress",
    "soak",
    "multi_proxy",
    "multi_proxy_stress",
    "small_files_multi_proxy",
    "single_segment",
];

/// Paths to the three pipeline executables.
#[derive(Debug, Clone)]
pub struct PipelineBinaries {
    pub cache: PathBuf,
    pub proxy: PathBuf,
    pub download: PathBuf,
}

/// Everything a named test needs to run.
pub struct TestContext {
    pub workdir: PathBuf,
    pub binaries: PipelineBinaries,
    pub supervisor: ProcessSupervisor,
}

impl TestContext {
    pub fn new(workdir: PathBuf, binaries: PipelineBinaries, supervisor: ProcessSupervisor) -> Self {
        Self {
            workdir,
            binaries,
            supervisor,
        }
    }

    fn config(&self, workload_sizes: Vec<u64>, base_port: u16) -> StressConfig {
        StressConfig {
            workdir: self.workdir.clone(),
            cache_bin: self.binaries.cache.clone(),
            proxy_bin: self.binaries.proxy.clone(),
            download_bin: self.binaries.download.clone(),
            locals_file: LOCALS_FILENAME.to_string(),
            workload_file: WORKLOAD_FILENAME.to_string(),
            workload_sizes,
            cache_thread_count: 1,
            proxy_thread_count: 1,
            proxy_segment_count: 1,
            proxy_segment_size: 1024,
            download_thread_count: 1,
            request_count: 0,
            base_port,
            proxy_count: 1,
        }
    }

    /// Run one parameter combination and, on success, verify results.
    /// Returns the outcome plus whether verification passed.
    async fn run_and_verify(&self, config: StressConfig) -> StressResult<(RunOutcome, bool)> {
        println!("{}", config.describe());
        let scheduler = BenchmarkScheduler::new(config, self.supervisor.clone());
        let report = scheduler.run().await?;
        if !report.outcome.is_success() {
            return Ok((report.outcome, false));
        }
        let verification = verify(&self.workdir)?;
        if !verification.is_verified() {
            println!(
                "Verification failed for {} file(s)",
                verification.mismatched().len()
            );
        }
        Ok((report.outcome, verification.is_verified()))
    }
}

/// Run a named test. Returns `None` for an unknown name so the caller
/// can print the catalog.
pub async fn run_named(name: &str, ctx: &TestContext) -> StressResult<Option<RunOutcome>> {
    let outcome = match name {
        "base" => run_base(ctx).await?,
        "debug" => run_debug(ctx).await?,
        "parameter" => run_parameter(ctx).await?,
        "stress" => run_stress(ctx).await?,
        "soak" => run_soak(ctx).await?,
        "multi_proxy" => run_multi_proxy(ctx).await?,
        "multi_proxy_stress" => run_multi_proxy_stress(ctx).await?,
        "small_files_multi_proxy" => run_small_files_multi_proxy(ctx).await?,
        "single_segment" => run_single_segment(ctx).await?,
        _ => return Ok(None),
    };
    Ok(Some(outcome))
}

/// Base level of testing: single thread everywhere, one segment.
async fn run_base(ctx: &TestContext) -> StressResult<RunOutcome> {
    generate(&ctx.workdir, &standard_sizes())?;

    let mut config = ctx.config(standard_sizes(), 12345);
    config.request_count = 110;
    let (outcome, _) = ctx.run_and_verify(config).await?;
    Ok(outcome)
}

/// Debug test with just the first few workload files.
async fn run_debug(ctx: &TestContext) -> StressResult<RunOutcome> {
    let sizes: Vec<u64> = standard_sizes().into_iter().take(4).collect();
    generate(&ctx.workdir, &sizes)?;

    let mut config = ctx.config(sizes, 10823);
    config.request_count = 4;
    let (outcome, _) = ctx.run_and_verify(config).await?;
    Ok(outcome)
}

/// Sweep a wide range of thread counts, segment counts, and segment
/// sizes.
async fn run_parameter(ctx: &TestContext) -> StressResult<RunOutcome> {
    generate(&ctx.workdir, &standard_sizes())?;

    for cache_threads in (1..101).step_by(10) {
        for proxy_threads in (cache_threads..101).step_by(10) {
            for segment_count in (1..101).step_by(10) {
                let mut segment_size = MIN_SEG_SIZE;
                while segment_size <= 1_048_576 {
                    let mut config = ctx.config(standard_sizes(), 10823);
                    config.cache_thread_count = cache_threads;
                    config.proxy_thread_count = proxy_threads;
                    config.proxy_segment_count = segment_count;
                    config.proxy_segment_size = segment_size;
                    config.download_thread_count = proxy_threads;
                    config.request_count = 10;

                    let (outcome, verified) = ctx.run_and_verify(config).await?;
                    if !outcome.is_success() || !verified {
                        return Ok(outcome);
                    }
                    segment_size *= 4;
                }
            }
        }
    }
    Ok(RunOutcome::Success)
}

/// Stress test with fixed segment geometry and a thread sweep.
async fn run_stress(ctx: &TestContext) -> StressResult<RunOutcome> {
    generate(&ctx.workdir, &standard_sizes())?;

    for cache_threads in (20..101).step_by(10) {
        for proxy_threads in (cache_threads..101).step_by(10) {
            let mut config = ctx.config(standard_sizes(), 10823);
            config.cache_thread_count = cache_threads;
            config.proxy_thread_count = proxy_threads;
            config.proxy_segment_count = 50;
            config.proxy_segment_size = 1_048_576;
            config.download_thread_count = proxy_threads;
            config.request_count = 10;

            let (outcome, verified) = ctx.run_and_verify(config).await?;
            if !outcome.is_success() || !verified {
                return Ok(outcome);
            }
        }
    }
    Ok(RunOutcome::Success)
}

/// Soak test: a million requests with everything fixed.
async fn run_soak(ctx: &TestContext) -> StressResult<RunOutcome> {
    generate(&ctx.workdir, &standard_sizes())?;

    let mut config = ctx.config(standard_sizes(), 10823);
    config.cache_thread_count = 100;
    config.proxy_thread_count = 100;
    config.proxy_segment_count = 50;
    config.proxy_segment_size = 1_048_576;
    config.download_thread_count = 100;
    config.request_count = 1_000_000;

    let (outcome, _) = ctx.run_and_verify(config).await?;
    Ok(outcome)
}

/// Several proxies sharing one cache.
async fn run_multi_proxy(ctx: &TestContext) -> StressResult<RunOutcome> {
    generate(&ctx.workdir, &standard_sizes())?;

    let mut config = ctx.config(standard_sizes(), 10823);
    config.cache_thread_count = 8;
    config.proxy_thread_count = 6;
    config.proxy_segment_count = 16;
    config.proxy_segment_size = 8192;
    config.download_thread_count = 12;
    config.request_count = 220;
    config.proxy_count = 3;

    print_multi_proxy_banner(&config);
    let (outcome, _) = ctx.run_and_verify(config).await?;
    Ok(outcome)
}

/// Many proxies, threads, and segments at once.
async fn run_multi_proxy_stress(ctx: &TestContext) -> StressResult<RunOutcome> {
    generate(&ctx.workdir, &standard_sizes())?;

    let mut config = ctx.config(standard_sizes(), 10823);
    config.cache_thread_count = 20;
    config.proxy_thread_count = 15;
    config.proxy_segment_count = 32;
    config.proxy_segment_size = 16384;
    config.download_thread_count = 25;
    config.request_count = 550;
    config.proxy_count = 5;

    print_multi_proxy_banner(&config);
    let (outcome, _) = ctx.run_and_verify(config).await?;
    Ok(outcome)
}

/// Multi-proxy run over the all-small workload: high concurrency, many
/// transfers, little data.
async fn run_small_files_multi_proxy(ctx: &TestContext) -> StressResult<RunOutcome> {
    generate(&ctx.workdir, &small_file_sizes())?;

    let mut config = ctx.config(small_file_sizes(), 10823);
    config.cache_thread_count = 10;
    config.proxy_thread_count = 8;
    config.proxy_segment_count = 12;
    config.proxy_segment_size = 2048;
    config.download_thread_count = 16;
    config.request_count = 330;
    config.proxy_count = 4;

    print_multi_proxy_banner(&config);
    let (outcome, _) = ctx.run_and_verify(config).await?;
    Ok(outcome)
}

/// Many threads contending on a single minimum-size segment.
async fn run_single_segment(ctx: &TestContext) -> StressResult<RunOutcome> {
    generate(&ctx.workdir, &standard_sizes())?;

    let mut config = ctx.config(standard_sizes(), 10823);
    config.cache_thread_count = 1;
    config.proxy_thread_count = 11;
    config.proxy_segment_count = 1;
    config.proxy_segment_size = MIN_SEG_SIZE;
    config.download_thread_count = 11;
    config.request_count = 11;

    let (outcome, _) = ctx.run_and_verify(config).await?;
    Ok(outcome)
}

fn print_multi_proxy_banner(config: &StressConfig) {
    println!(
        "Total threads: Cache={}, Proxies={}x{}={}, Downloads={}",
        config.cache_thread_count,
        config.proxy_count,
        config.proxy_thread_count,
        config.proxy_count as u32 * config.proxy_thread_count,
        config.download_thread_count
    );
    println!(
        "Shared memory: {} segments of {} bytes each = {} total bytes per proxy",
        config.proxy_segment_count,
        config.proxy_segment_size,
        u64::from(config.proxy_segment_count) * config.proxy_segment_size
    );
}
