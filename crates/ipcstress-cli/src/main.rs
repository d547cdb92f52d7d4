//! `ipcstress` - drive the cache/proxy/download pipeline through a named
//! stress test and report throughput and CPU consumption.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, ValueEnum};
use ipcstress_cli::{run_named, PipelineBinaries, TestContext, TEST_NAMES};
use ipcstress_process::{ProcessRegistry, ProcessSupervisor};
use tracing::{error, Level};

#[derive(Debug, Clone, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[derive(Parser, Debug)]
#[command(
    name = "ipcstress",
    about = "Stress test and benchmark driver for the cache/proxy/download IPC pipeline"
)]
struct Args {
    /// Working directory for workload data and child processes
    workdir: PathBuf,

    /// Named test to run (an unknown name lists the catalog)
    #[arg(default_value = "base")]
    test: String,

    /// Cache service executable
    #[arg(long, default_value = "./cache/simplecached")]
    cache_bin: PathBuf,

    /// Proxy service executable
    #[arg(long, default_value = "./cache/webproxy")]
    proxy_bin: PathBuf,

    /// Download client executable
    #[arg(long, default_value = "./cache/gfclient_download")]
    download_bin: PathBuf,

    /// Log level for orchestrator diagnostics
    #[arg(long, value_enum, default_value = "warn")]
    log_level: LogLevel,
}

/// Drains the registry when dropped, so children are cleaned up even on
/// a panic path. Draining twice is a no-op.
struct DrainGuard(ProcessRegistry);

impl Drop for DrainGuard {
    fn drop(&mut self) {
        self.0.drain_all();
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(&args.log_level);

    let supervisor = ProcessSupervisor::new();
    spawn_signal_handler(supervisor.registry());
    let _guard = DrainGuard(supervisor.registry());

    let code = match run(&args, &supervisor).await {
        Ok(code) => code,
        Err(e) => {
            error!(error = %e, "run aborted");
            eprintln!("ipcstress: {e:#}");
            1
        }
    };

    supervisor.registry().drain_all();
    std::process::exit(code);
}

async fn run(args: &Args, supervisor: &ProcessSupervisor) -> anyhow::Result<i32> {
    std::fs::create_dir_all(&args.workdir)
        .with_context(|| format!("cannot create work directory {}", args.workdir.display()))?;
    let workdir = args
        .workdir
        .canonicalize()
        .with_context(|| format!("cannot resolve work directory {}", args.workdir.display()))?;

    // Children run with the work directory as cwd; binary paths given
    // relative to the invocation directory must survive that change.
    let binaries = PipelineBinaries {
        cache: absolutize(&args.cache_bin)?,
        proxy: absolutize(&args.proxy_bin)?,
        download: absolutize(&args.download_bin)?,
    };

    let ctx = TestContext::new(workdir, binaries, supervisor.clone());
    match run_named(&args.test, &ctx).await? {
        Some(outcome) => {
            if !outcome.is_success() {
                println!("Run halted: {outcome}");
            }
            Ok(outcome.exit_code())
        }
        None => {
            println!(
                "Test '{}' not found. Available tests: {}",
                args.test,
                TEST_NAMES.join(", ")
            );
            Ok(0)
        }
    }
}

fn absolutize(path: &Path) -> anyhow::Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()
            .context("cannot resolve current directory")?
            .join(path))
    }
}

fn init_logging(level: &LogLevel) {
    let level = match level {
        LogLevel::Off => return,
        LogLevel::Error => Level::ERROR,
        LogLevel::Warn => Level::WARN,
        LogLevel::Info => Level::INFO,
        LogLevel::Debug => Level::DEBUG,
        LogLevel::Trace => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .init();
}

/// Both standard interruption signals drain the registry before exiting,
/// so no child outlives the orchestrator.
fn spawn_signal_handler(registry: ProcessRegistry) {
    tokio::spawn(async move {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(s) => s,
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                return;
            }
        };
        let mut sigint = match signal(SignalKind::interrupt()) {
            Ok(s) => s,
            Err(e) => {
                error!(error = %e, "failed to install SIGINT handler");
                return;
            }
        };

        tokio::select! {
            _ = sigterm.recv() => println!("\nReceived SIGTERM, terminating child processes..."),
            _ = sigint.recv() => println!("\nReceived SIGINT, terminating child processes..."),
        }
        registry.drain_all();
        std::process::exit(0);
    });
}
