//! Smoke test for the `JobExecutor` queue: submission must record a
//! `Queued` result synchronously, before the worker thread has had any
//! chance to run, so a `GET /mods/{id}/status` right after submission never
//! 404s (the property `src/job/executor.rs` is built to guarantee).

use std::path::PathBuf;

use levelup_core::compiler::CompilerKind;
use levelup_core::config::ToolchainConfig;
use levelup_core::job::{JobExecutor, ModRequest, ModSource};
use levelup_core::result::Status;

#[test]
fn submit_records_queued_status_before_worker_processes_it() {
    let dir = tempfile::tempdir().unwrap();
    let toolchain = ToolchainConfig {
        git: Some(PathBuf::from("/nonexistent/levelup-test-git-binary")),
        ..ToolchainConfig::default()
    };

    let executor = JobExecutor::spawn(toolchain, CompilerKind::Clang, dir.path().to_path_buf(), None);

    let request = ModRequest::new(
        "https://example.com/org/widget.git",
        "add override everywhere",
        ModSource::Builtin { mod_type: "add_override".into(), prototype_changes: Vec::new() },
    )
    .unwrap();

    let id = executor.submit(request);
    let status = executor.status(id);

    assert!(status.is_some());
    assert!(matches!(
        status.unwrap().status,
        Status::Queued | Status::Processing | Status::Error
    ));
}

#[test]
fn unknown_id_has_no_status() {
    let dir = tempfile::tempdir().unwrap();
    let executor = JobExecutor::spawn(ToolchainConfig::default(), CompilerKind::Clang, dir.path().to_path_buf(), None);
    assert!(executor.status(uuid::Uuid::new_v4()).is_none());
}
