//! # ipcstress-workload
//!
//! Workload data for the pipeline under test: exact-size random source
//! files with their manifests, and post-run verification that everything
//! survived the round trip unmodified.

pub mod generate;
pub mod manifest;
pub mod verify;

pub use generate::*;
pub use manifest::*;
pub use verify::*;

/// Directory under the work directory holding the generated source files.
pub const WORKLOAD_LOCAL_DIR: &str = "ipcstress_files";

/// URL path prefix for requests; the download client stores results under
/// the same relative directory.
pub const WORKLOAD_URL_DIR: &str = "ipcstress";

/// Locals manifest consumed by the cache service.
pub const LOCALS_FILENAME: &str = "locals-ipcstress.txt";

/// Workload file consumed by the download client.
pub const WORKLOAD_FILENAME: &str = "workload-ipcstress.txt";

/// Hash manifest written next to the generated source files.
pub const SHA1SUM_FILENAME: &str = "sha1sum.txt";

/// Audit hash manifest written into the results directory after a run.
pub const RESULT_SHA1SUM_FILENAME: &str = "sha1sum-result.txt";
