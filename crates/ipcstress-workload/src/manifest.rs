//! SHA-1 hash manifests in the standard `sha1sum` two-column format.

use std::io::Read;
use std::path::{Path, PathBuf};

use ipcstress_common::{StressError, StressResult};
use sha1::{Digest, Sha1};

/// One `<hex-hash>  <path>` manifest, ordered as written.
#[derive(Debug, Clone, Default)]
pub struct HashManifest {
    entries: Vec<(String, PathBuf)>,
}

impl HashManifest {
    /// Hash the given files in order.
    pub fn compute(paths: &[PathBuf]) -> StressResult<Self> {
        let mut entries = Vec::with_capacity(paths.len());
        for path in paths {
            entries.push((hash_file(path)?, path.clone()));
        }
        Ok(Self { entries })
    }

    /// Parse a manifest file. Malformed lines are rejected rather than
    /// skipped: a damaged manifest must not silently verify.
    pub fn load(path: &Path) -> StressResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut entries = Vec::new();
        for line in content.lines() {
            let line = line.trim_end();
            if line.is_empty() {
                continue;
            }
            let (digest, file) = line.split_once(char::is_whitespace).ok_or_else(|| {
                StressError::manifest(path.display().to_string(), format!("bad line: {line:?}"))
            })?;
            entries.push((digest.to_string(), PathBuf::from(file.trim_start())));
        }
        Ok(Self { entries })
    }

    /// Write in `sha1sum` output format (two spaces between columns).
    pub fn write(&self, path: &Path) -> StressResult<()> {
        let mut out = String::new();
        for (digest, file) in &self.entries {
            out.push_str(&format!("{digest}  {}\n", file.display()));
        }
        std::fs::write(path, out)?;
        Ok(())
    }

    pub fn entries(&self) -> &[(String, PathBuf)] {
        &self.entries
    }

    /// Look up a digest by the path's basename. Manifest entries carry
    /// full paths; comparisons across directories go by basename.
    pub fn digest_for_basename(&self, basename: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, path)| path.file_name().and_then(|n| n.to_str()) == Some(basename))
            .map(|(digest, _)| digest.as_str())
    }
}

/// Streaming SHA-1 of one file, as a lowercase hex string.
pub fn hash_file(path: &Path) -> StressResult<String> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha1::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_file_known_value() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.bin");
        std::fs::write(&path, b"").unwrap();
        // sha1 of the empty input.
        assert_eq!(
            hash_file(&path).unwrap(),
            "da39a3ee5e6b4b0d3255bfef95601890afd80709"
        );

        std::fs::write(&path, b"abc").unwrap();
        assert_eq!(
            hash_file(&path).unwrap(),
            "a9993e364706816aba3e25717850c26c9cd0d89d"
        );
    }

    #[test]
    fn test_write_then_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.bin");
        let b = dir.path().join("b.bin");
        std::fs::write(&a, b"alpha").unwrap();
        std::fs::write(&b, b"beta").unwrap();

        let manifest = HashManifest::compute(&[a.clone(), b.clone()]).unwrap();
        let manifest_path = dir.path().join("sha1sum.txt");
        manifest.write(&manifest_path).unwrap();

        let content = std::fs::read_to_string(&manifest_path).unwrap();
        // Standard two-column format.
        assert!(content
            .lines()
            .all(|l| l.splitn(2, "  ").count() == 2));

        let loaded = HashManifest::load(&manifest_path).unwrap();
        assert_eq!(loaded.entries().len(), 2);
        assert_eq!(
            loaded.digest_for_basename("a.bin"),
            Some(hash_file(&a).unwrap().as_str())
        );
        assert_eq!(loaded.digest_for_basename("missing.bin"), None);
    }

    #[test]
    fn test_load_rejects_malformed_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sha1sum.txt");
        std::fs::write(&path, "nota-valid-line\n").unwrap();
        assert!(HashManifest::load(&path).is_err());
    }
}
