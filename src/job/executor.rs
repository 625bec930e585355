//! Single-worker job queue: an mpsc channel feeds one background thread,
//! which owns the compiler driver, oracle, and doxygen parser and updates a
//! concurrent status map the HTTP layer reads from. Grounded in
//! `original_source/core/mod_processor.py`'s `ModProcessor`, restructured
//! from "one call per request" into a queue the way `Waitlist`
//! (`src/internal/pack/waitlist.rs`) uses `DashMap` for concurrent reads
//! without a lock.

use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use dashmap::DashMap;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::compiler::{build_driver, CompilerKind};
use crate::config::ToolchainConfig;
use crate::edits::{Edit, EditGenerator, EditLibrary, PrototypeChangeGenerator};
use crate::engine::AtomicCommitEngine;
use crate::errors::Result;
use crate::git::GitWorkspace;
use crate::job::mod_request::{ModRequest, ModSource};
use crate::oracle::AsmOracle;
use crate::result::ModResult;
use crate::symbol::{DoxygenParser, SymbolParser, SymbolTable};

/// Shared, lock-free view of every job's latest `ModResult`, keyed by mod id.
pub type StatusMap = Arc<DashMap<Uuid, ModResult>>;

/// Submits `ModRequest`s to a single background worker and exposes a
/// `DashMap` of their results. The worker never exits on a job failure: any
/// error from processing a single request becomes an `Error` result and the
/// loop continues to the next one.
pub struct JobExecutor {
    sender: mpsc::Sender<ModRequest>,
    statuses: StatusMap,
}

impl JobExecutor {
    pub fn spawn(
        toolchain: ToolchainConfig,
        compiler_kind: CompilerKind,
        repos_root: PathBuf,
        per_job_timeout: Option<Duration>,
    ) -> Self {
        let (sender, receiver) = mpsc::channel::<ModRequest>();
        let statuses: StatusMap = Arc::new(DashMap::new());
        let worker_statuses = statuses.clone();

        thread::spawn(move || {
            worker_loop(receiver, worker_statuses, toolchain, compiler_kind, repos_root, per_job_timeout);
        });

        Self { sender, statuses }
    }

    /// Record a `Queued` result immediately, then hand the request to the
    /// worker. Returns the mod id the caller polls on.
    pub fn submit(&self, request: ModRequest) -> Uuid {
        let id = request.id;
        self.statuses.insert(id, ModResult::queued(id));
        if self.sender.send(request).is_err() {
            warn!(%id, "worker thread gone, marking job as error");
            self.statuses.insert(id, ModResult::error(id, "worker thread is not running"));
        }
        id
    }

    pub fn status(&self, id: Uuid) -> Option<ModResult> {
        self.statuses.get(&id).map(|r| r.clone())
    }

    /// Number of jobs that have never reached a terminal status.
    pub fn queue_depth(&self) -> usize {
        self.statuses
            .iter()
            .filter(|r| matches!(r.status, crate::result::Status::Queued | crate::result::Status::Processing))
            .count()
    }

    pub fn all_statuses(&self) -> Vec<ModResult> {
        self.statuses.iter().map(|r| r.clone()).collect()
    }
}

fn worker_loop(
    receiver: mpsc::Receiver<ModRequest>,
    statuses: StatusMap,
    toolchain: ToolchainConfig,
    compiler_kind: CompilerKind,
    repos_root: PathBuf,
    per_job_timeout: Option<Duration>,
) {
    info!("job executor worker started");
    for request in receiver.iter() {
        let id = request.id;
        statuses.insert(id, ModResult::processing(id));

        let result = process_one(&request, &toolchain, compiler_kind, &repos_root, per_job_timeout)
            .unwrap_or_else(|e| {
                error!(%id, error = %e, "mod processing failed");
                ModResult::error(id, e.to_string())
            });

        statuses.insert(id, result);
    }
    info!("job executor worker exiting: sender dropped");
}

fn process_one(
    request: &ModRequest,
    toolchain: &ToolchainConfig,
    compiler_kind: CompilerKind,
    repos_root: &std::path::Path,
    _per_job_timeout: Option<Duration>,
) -> Result<ModResult> {
    let repo_dir = repos_root.join(crate::config::sanitize_dirname(&crate::config::repo_name(&request.repo_url)));
    let workspace = GitWorkspace::new(toolchain, request.repo_url.clone(), repo_dir, "");
    workspace.ensure_cloned()?;
    workspace.prepare_work_branch()?;

    let driver = build_driver(compiler_kind, toolchain)?;
    let oracle = AsmOracle::new();

    match &request.source {
        ModSource::Commit { commit_hash } => {
            let atomic_branch = format!("levelup-atomic-{}", request.id);
            workspace.create_atomic_branch(&workspace.work_branch, &atomic_branch)?;
            workspace.cherry_pick(commit_hash)?;
            workspace.squash_and_rebase(&atomic_branch, &workspace.work_branch)?;
            workspace.push(&workspace.work_branch)?;
            Ok(ModResult::from_engine_run(
                request.id,
                request.description.clone(),
                Vec::new(),
                vec![commit_hash.clone()],
                Vec::new(),
            ))
        }
        ModSource::Builtin { mod_type, prototype_changes } => {
            let symbols = build_symbol_table(toolchain, &workspace.repo_path)?;

            // `change_prototype` carries a per-request worklist the registry
            // has no slot for, so it is dispatched here instead of being
            // looked up in the `EditLibrary` like every other builtin.
            if mod_type == "change_prototype" {
                let generator = PrototypeChangeGenerator::new(prototype_changes.clone());
                let edits: Box<dyn Iterator<Item = Result<Edit>>> =
                    generator.generate(&workspace.repo_path, &symbols);
                let engine = AtomicCommitEngine::new(driver.as_ref(), &oracle, &workspace);
                engine.run(request.id, generator.name(), edits)
            } else {
                let library = EditLibrary::with_builtins();
                let generator = library.get(mod_type)?;
                let edits: Box<dyn Iterator<Item = Result<Edit>>> =
                    generator.generate(&workspace.repo_path, &symbols);
                let engine = AtomicCommitEngine::new(driver.as_ref(), &oracle, &workspace);
                engine.run(request.id, generator.name(), edits)
            }
        }
    }
}

fn build_symbol_table(toolchain: &ToolchainConfig, repo_path: &std::path::Path) -> Result<SymbolTable> {
    let parser = DoxygenParser::new(toolchain);
    let symbols = parser.parse(repo_path)?;
    let mut table = SymbolTable::new();
    table.populate(symbols);
    Ok(table)
}
