//! Process execution primitives.

use std::path::Path;
use std::process::Stdio;

use ipcstress_common::{ProcessError, ProcessResult};
use tokio::process::{Child, Command};

/// Spawn a child process with both output streams piped back to the
/// orchestrator, running in the given working directory.
pub fn spawn_piped(program: &Path, args: &[String], workdir: &Path) -> ProcessResult<Child> {
    Command::new(program)
        .args(args)
        .current_dir(workdir)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| ProcessError::spawn_failed(program.display().to_string(), e.to_string()))
}
