//! Post-run verification: every retrieved file must hash to the value
//! recorded when the workload was generated.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use ipcstress_common::StressResult;
use tracing::info;

use crate::manifest::HashManifest;
use crate::{RESULT_SHA1SUM_FILENAME, SHA1SUM_FILENAME, WORKLOAD_LOCAL_DIR, WORKLOAD_URL_DIR};

/// Filenames whose retrieved content disagrees with the recorded hash.
/// Empty means the run verified.
#[derive(Debug, Clone, Default)]
pub struct VerificationReport {
    mismatched: BTreeSet<String>,
}

impl VerificationReport {
    pub fn is_verified(&self) -> bool {
        self.mismatched.is_empty()
    }

    pub fn mismatched(&self) -> &BTreeSet<String> {
        &self.mismatched
    }
}

/// Hash every file in the results directory, write the audit manifest
/// beside them, and compare each against the reference manifest by
/// basename.
///
/// Reference entries absent from the results directory are not flagged:
/// the workload file deliberately names one path that can never be
/// retrieved. Read-only apart from the audit manifest.
pub fn verify(workdir: &Path) -> StressResult<VerificationReport> {
    let result_dir = workdir.join(WORKLOAD_URL_DIR);
    let reference =
        HashManifest::load(&workdir.join(WORKLOAD_LOCAL_DIR).join(SHA1SUM_FILENAME))?;

    let mut result_files: Vec<PathBuf> = Vec::new();
    if result_dir.is_dir() {
        for entry in std::fs::read_dir(&result_dir)? {
            let path = entry?.path();
            if path.is_file() && path.file_name().and_then(|n| n.to_str())
                != Some(RESULT_SHA1SUM_FILENAME)
            {
                result_files.push(path);
            }
        }
    }
    result_files.sort();

    let results = HashManifest::compute(&result_files)?;
    std::fs::create_dir_all(&result_dir)?;
    results.write(&result_dir.join(RESULT_SHA1SUM_FILENAME))?;

    let mut report = VerificationReport::default();
    for (digest, path) in results.entries() {
        let Some(basename) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if let Some(expected) = reference.digest_for_basename(basename) {
            if expected != digest {
                println!("Hash mismatch: {basename}");
                report.mismatched.insert(basename.to_string());
            }
        }
    }

    info!(
        files = results.entries().len(),
        mismatches = report.mismatched.len(),
        "verification complete"
    );
    Ok(report)
}
