//! Process existence checking.

use ipcstress_common::{ProcessError, ProcessResult};

/// Check if a process with the given PID exists.
///
/// Uses `kill(pid, 0)`, which sends no signal but checks whether the
/// process is known to the kernel.
///
/// * `Ok(true)` - process exists
/// * `Ok(false)` - process does not exist
/// * `Err(_)` - the check itself failed
pub fn process_exists(pid: u32) -> ProcessResult<bool> {
    use nix::errno::Errno;
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    match kill(Pid::from_raw(pid as i32), None) {
        Ok(()) => Ok(true),
        Err(Errno::ESRCH) => Ok(false),
        // Exists, but owned by someone else.
        Err(Errno::EPERM) => Ok(true),
        Err(e) => Err(ProcessError::check_failed(pid, e.to_string())),
    }
}
