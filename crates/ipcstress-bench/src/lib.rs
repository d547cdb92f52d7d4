//! # ipcstress-bench
//!
//! The benchmark engine: drives the cache/proxy/download pipeline through
//! repeated download batches, distributes requests across proxy targets,
//! samples per-process CPU consumption between batches, and reports
//! per-batch and run-level throughput.

pub mod config;
pub mod distribute;
pub mod report;
pub mod scheduler;
pub mod totals;

pub use config::*;
pub use distribute::*;
pub use scheduler::*;
pub use totals::*;
