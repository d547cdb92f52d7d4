//! Stress run configuration.

use std::path::PathBuf;

/// Parameters for one benchmark run.
///
/// `proxy_count` proxies are launched on consecutive ports starting at
/// `base_port`; a single proxy is simply the one-target case of the same
/// flow.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Working directory for all children (manifests are referenced
    /// relative to it).
    pub workdir: PathBuf,

    pub cache_bin: PathBuf,
    pub proxy_bin: PathBuf,
    pub download_bin: PathBuf,

    /// Locals manifest filename inside `workdir`.
    pub locals_file: String,
    /// Workload filename inside `workdir`.
    pub workload_file: String,
    /// Distinct sizes of the generated workload files; used for the
    /// bytes-per-second derivation.
    pub workload_sizes: Vec<u64>,

    pub cache_thread_count: u32,
    pub proxy_thread_count: u32,
    pub proxy_segment_count: u32,
    pub proxy_segment_size: u64,
    pub download_thread_count: u32,
    pub request_count: u64,

    pub base_port: u16,
    pub proxy_count: usize,
}

impl StressConfig {
    /// One-line parameter summary printed before a run.
    pub fn describe(&self) -> String {
        let mut line = format!(
            "cache_thread_count={}, proxy_thread_count={}, \
             proxy_segment_count={}, proxy_segment_size={}, \
             download_thread_count={}, request_count={}",
            self.cache_thread_count,
            self.proxy_thread_count,
            self.proxy_segment_count,
            self.proxy_segment_size,
            self.download_thread_count,
            self.request_count
        );
        if self.proxy_count > 1 {
            line.push_str(&format!(
                ", num_proxies={}, base_port={}",
                self.proxy_count, self.base_port
            ));
        }
        line
    }

    /// Port assigned to proxy target `index`.
    pub fn port_for(&self, index: usize) -> u16 {
        self.base_port.wrapping_add(index as u16)
    }
}
