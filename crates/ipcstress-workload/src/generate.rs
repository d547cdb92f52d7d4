//! Workload generation: exact-size random files plus the manifests the
//! cache service and download client consume.

use std::io::Write;
use std::path::{Path, PathBuf};

use ipcstress_common::{StressError, StressResult};
use rand::RngCore;
use tracing::{debug, info};

use crate::manifest::HashManifest;
use crate::{
    LOCALS_FILENAME, SHA1SUM_FILENAME, WORKLOAD_FILENAME, WORKLOAD_LOCAL_DIR, WORKLOAD_URL_DIR,
};

/// Block size granularity of the size table below.
const BLOCK_SIZE: u64 = 8;

/// Standard workload sizes: powers of two plus small block-size
/// multiples, covering zero bytes up to 16 MiB.
pub fn standard_sizes() -> Vec<u64> {
    vec![
        0,
        568,
        525,
        501,
        369,
        1024 + BLOCK_SIZE,
        4096 + 7 * BLOCK_SIZE,
        65536 + 13 * BLOCK_SIZE,
        262144 + 19 * BLOCK_SIZE,
        1048576 + 23 * BLOCK_SIZE,
        4 * 1048576 + 29 * BLOCK_SIZE,
        8 * 1048576 + 31 * BLOCK_SIZE,
        16 * 1048576 + 33 * BLOCK_SIZE,
    ]
}

/// All-small workload (under 1 KiB), for high-concurrency runs dominated
/// by per-request overhead rather than transfer volume.
pub fn small_file_sizes() -> Vec<u64> {
    vec![0, 64, 128, 256, 369, 512, 513, 523, 563, 768, 1023]
}

/// Generate the workload under `workdir`:
///
/// - `ipcstress_files/workload<i>.bin`, exactly `sizes[i]` random bytes
///   (files already present are kept);
/// - `ipcstress_files/sha1sum.txt`, the reference hash manifest;
/// - `locals-ipcstress.txt`, one `<url-path> <local-path>` line per file;
/// - `workload-ipcstress.txt`, one url path per file plus a final entry
///   that deliberately resolves nowhere, to exercise not-found handling.
///
/// Any stale results directory is removed; the download client recreates
/// it.
pub fn generate(workdir: &Path, sizes: &[u64]) -> StressResult<()> {
    if sizes.is_empty() {
        return Err(StressError::workload("no workload sizes given"));
    }
    let workdir = if workdir.is_absolute() {
        workdir.to_path_buf()
    } else {
        std::env::current_dir()?.join(workdir)
    };

    let files_dir = workdir.join(WORKLOAD_LOCAL_DIR);
    std::fs::create_dir_all(&files_dir)?;

    info!(dir = %files_dir.display(), count = sizes.len(), "creating workload data files");
    let mut filenames = Vec::with_capacity(sizes.len());
    for (i, &size) in sizes.iter().enumerate() {
        let path = files_dir.join(format!("workload{i}.bin"));
        if !path.is_file() {
            write_random_file(&path, size)?;
            debug!(file = %path.display(), size, "created workload file");
        }
        filenames.push(path);
    }

    let manifest = HashManifest::compute(&filenames)?;
    manifest.write(&files_dir.join(SHA1SUM_FILENAME))?;

    let mut locals = String::new();
    for (i, path) in filenames.iter().enumerate() {
        locals.push_str(&format!(
            "/{WORKLOAD_URL_DIR}/workload{i}.bin {}\n",
            path.display()
        ));
    }
    std::fs::write(workdir.join(LOCALS_FILENAME), locals)?;

    let mut workload = String::new();
    for i in 0..filenames.len() {
        workload.push_str(&format!("/{WORKLOAD_URL_DIR}/workload{i}.bin\n"));
    }
    workload.push_str(&format!("/{WORKLOAD_URL_DIR}/workload_FNF.bin\n"));
    std::fs::write(workdir.join(WORKLOAD_FILENAME), workload)?;

    // Stale results would verify against the previous run.
    let result_dir = workdir.join(WORKLOAD_URL_DIR);
    if result_dir.exists() {
        std::fs::remove_dir_all(&result_dir)?;
    }

    Ok(())
}

/// Write `size` random bytes to `path`, chunked so large files do not
/// balloon memory.
fn write_random_file(path: &Path, size: u64) -> StressResult<()> {
    let mut file = std::fs::File::create(path)?;
    let mut rng = rand::thread_rng();
    let mut buf = vec![0u8; 8192];
    let mut remaining = size;
    while remaining > 0 {
        let chunk = remaining.min(buf.len() as u64) as usize;
        rng.fill_bytes(&mut buf[..chunk]);
        file.write_all(&buf[..chunk])?;
        remaining -= chunk as u64;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_sizes_are_exact_including_zero() {
        let dir = tempfile::tempdir().unwrap();
        let sizes = [0u64, 1, 64, 8192, 8193];
        generate(dir.path(), &sizes).unwrap();

        for (i, &size) in sizes.iter().enumerate() {
            let path = dir
                .path()
                .join(WORKLOAD_LOCAL_DIR)
                .join(format!("workload{i}.bin"));
            assert_eq!(std::fs::metadata(&path).unwrap().len(), size);
        }
    }

    #[test]
    fn test_existing_files_are_kept() {
        let dir = tempfile::tempdir().unwrap();
        generate(dir.path(), &[16]).unwrap();

        let path = dir.path().join(WORKLOAD_LOCAL_DIR).join("workload0.bin");
        let before = std::fs::read(&path).unwrap();
        generate(dir.path(), &[16]).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), before);
    }

    #[test]
    fn test_manifest_files_have_expected_shape() {
        let dir = tempfile::tempdir().unwrap();
        generate(dir.path(), &[0, 64, 128]).unwrap();

        let locals = std::fs::read_to_string(dir.path().join(LOCALS_FILENAME)).unwrap();
        let locals_lines: Vec<&str> = locals.lines().collect();
        assert_eq!(locals_lines.len(), 3);
        assert!(locals_lines[0].starts_with("/ipcstress/workload0.bin "));
        assert!(locals_lines[2].contains("ipcstress_files"));

        let workload = std::fs::read_to_string(dir.path().join(WORKLOAD_FILENAME)).unwrap();
        let workload_lines: Vec<&str> = workload.lines().collect();
        assert_eq!(workload_lines.len(), 4);
        assert_eq!(workload_lines[1], "/ipcstress/workload1.bin");
        // The final entry must resolve nowhere.
        assert_eq!(workload_lines[3], "/ipcstress/workload_FNF.bin");

        let sha1sum = dir.path().join(WORKLOAD_LOCAL_DIR).join(SHA1SUM_FILENAME);
        assert!(sha1sum.is_file());
    }

    #[test]
    fn test_stale_result_dir_is_removed() {
        let dir = tempfile::tempdir().unwrap();
        let result_dir = dir.path().join(WORKLOAD_URL_DIR);
        std::fs::create_dir_all(&result_dir).unwrap();
        std::fs::write(result_dir.join("stale.bin"), b"old").unwrap();

        generate(dir.path(), &[64]).unwrap();
        assert!(!result_dir.exists());
    }

    #[test]
    fn test_empty_size_table_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        assert!(generate(dir.path(), &[]).is_err());
    }

    #[test]
    fn test_size_tables() {
        assert_eq!(standard_sizes().len(), 13);
        assert_eq!(standard_sizes()[0], 0);
        assert_eq!(standard_sizes()[5], 1032);
        assert!(small_file_sizes().iter().all(|&s| s < 1024));
    }
}
