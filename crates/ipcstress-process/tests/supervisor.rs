//! Supervisor and registry behavior against real child processes.

use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::time::Duration;

use ipcstress_common::Role;
use ipcstress_process::{process_exists, ProcessSupervisor};

/// Write an executable shell script into `dir` and return its path.
fn write_script(dir: &std::path::Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path
}

#[tokio::test]
async fn launch_registers_and_terminate_unregisters() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(dir.path(), "long-runner.sh", "sleep 30");

    let supervisor = ProcessSupervisor::new();
    let mut child = supervisor
        .launch(Role::Cache, 0, 1, &script, &[], dir.path())
        .unwrap();

    assert_eq!(supervisor.registry().tracked(), 1);
    assert_eq!(child.role, Role::Cache);
    assert_eq!(child.label, "CACHE");
    assert!(child.command_line.contains("long-runner.sh"));
    assert!(process_exists(child.pid).unwrap());
    assert!(child.poll().is_none());

    supervisor.terminate(&mut child).await;
    assert_eq!(supervisor.registry().tracked(), 0);
    assert!(child.poll().is_some());
}

#[tokio::test]
async fn poll_reports_exit_code() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(dir.path(), "fail-fast.sh", "exit 7");

    let supervisor = ProcessSupervisor::new();
    let mut child = supervisor
        .launch(Role::Download, 0, 1, &script, &[], dir.path())
        .unwrap();

    let mut code = None;
    for _ in 0..100 {
        code = child.poll();
        if code.is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert_eq!(code, Some(7));
    supervisor.reap(&child);
    assert_eq!(supervisor.registry().tracked(), 0);
}

#[tokio::test]
async fn launch_failure_is_fatal_and_propagated() {
    let dir = tempfile::tempdir().unwrap();
    let supervisor = ProcessSupervisor::new();
    let missing = dir.path().join("no-such-binary");

    let result = supervisor.launch(Role::Proxy, 0, 1, &missing, &[], dir.path());
    assert!(result.is_err());
    assert_eq!(supervisor.registry().tracked(), 0);
}

#[tokio::test]
async fn drain_all_terminates_everything_tracked() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(dir.path(), "long-runner.sh", "sleep 30");

    let supervisor = ProcessSupervisor::new();
    let mut a = supervisor
        .launch(Role::Proxy, 0, 2, &script, &[], dir.path())
        .unwrap();
    let mut b = supervisor
        .launch(Role::Proxy, 1, 2, &script, &[], dir.path())
        .unwrap();
    assert_eq!(a.label, "PROXY0");
    assert_eq!(b.label, "PROXY1");
    assert_eq!(supervisor.registry().tracked(), 2);

    let registry = supervisor.registry();
    registry.drain_all();
    assert_eq!(registry.tracked(), 0);

    // Both children were signaled; polling through the handles reaps
    // them and confirms they exited.
    for child in [&mut a, &mut b] {
        let mut exited = false;
        for _ in 0..100 {
            if child.poll().is_some() {
                exited = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        assert!(exited, "{} still running after drain_all", child.label);
    }
}

#[tokio::test]
async fn drain_all_is_idempotent() {
    let supervisor = ProcessSupervisor::new();
    let registry = supervisor.registry();

    // Empty drain is a no-op.
    registry.drain_all();
    registry.drain_all();
    assert_eq!(registry.tracked(), 0);

    let dir = tempfile::tempdir().unwrap();
    let script = write_script(dir.path(), "long-runner.sh", "sleep 30");
    let child = supervisor
        .launch(Role::Cache, 0, 1, &script, &[], dir.path())
        .unwrap();

    registry.drain_all();
    registry.drain_all();
    assert_eq!(registry.tracked(), 0);
    drop(child);
}
