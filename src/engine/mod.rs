//! The per-edit accept/revert state machine, grounded in
//! `original_source/core/mod_processor.py`'s `_process_builtin_mod`.

use tempfile::tempdir;
use tracing::{info, warn};
use uuid::Uuid;

use crate::compiler::CompilerDriver;
use crate::edits::Edit;
use crate::errors::Result;
use crate::git::GitWorkspace;
use crate::oracle::{AsmOracle, Verdict};
use crate::result::{EditOutcome, ModResult};

/// Drives one mod's atomic-commit cycle: create the scratch branch, feed it
/// edits one at a time, commit the ones the oracle accepts and revert the
/// rest, then squash the accepted ones back onto the work branch.
pub struct AtomicCommitEngine<'a> {
    driver: &'a dyn CompilerDriver,
    oracle: &'a AsmOracle,
    workspace: &'a GitWorkspace,
}

impl<'a> AtomicCommitEngine<'a> {
    pub fn new(driver: &'a dyn CompilerDriver, oracle: &'a AsmOracle, workspace: &'a GitWorkspace) -> Self {
        Self { driver, oracle, workspace }
    }

    pub fn run(
        &self,
        mod_id: Uuid,
        mod_name: &str,
        edits: impl Iterator<Item = Result<Edit>>,
    ) -> Result<ModResult> {
        let atomic_branch = format!("levelup-atomic-{mod_id}");
        self.workspace
            .create_atomic_branch(&self.workspace.work_branch, &atomic_branch)?;

        let outcome = self.process_edits(edits);

        match outcome {
            Ok((validation_results, accepted, rejected)) => {
                if !accepted.is_empty() {
                    info!(count = accepted.len(), "squashing accepted commits onto work branch");
                    self.workspace
                        .squash_and_rebase(&atomic_branch, &self.workspace.work_branch)?;
                    self.workspace.push(&self.workspace.work_branch)?;
                } else {
                    info!("no accepted commits, cleaning up atomic branch");
                    self.workspace.checkout(&self.workspace.work_branch, false)?;
                    self.workspace.delete_branch(&atomic_branch, true)?;
                }
                Ok(ModResult::from_engine_run(
                    mod_id,
                    mod_name,
                    validation_results,
                    accepted,
                    rejected,
                ))
            }
            Err(e) => {
                warn!(error = %e, "atomic commit engine failed, restoring work branch");
                let _ = self.workspace.checkout(&self.workspace.work_branch, false);
                let _ = self.workspace.delete_branch(&atomic_branch, true);
                Err(e)
            }
        }
    }

    fn process_edits(
        &self,
        edits: impl Iterator<Item = Result<Edit>>,
    ) -> Result<(Vec<EditOutcome>, Vec<String>, Vec<String>)> {
        let mut validation_results = Vec::new();
        let mut accepted = Vec::new();
        let mut rejected = Vec::new();

        for edit in edits {
            let edit = edit?;
            let file_display = edit.file.display().to_string();

            let accept = self.validate(&edit)?;

            if accept {
                self.workspace.commit(&edit.commit_message)?;
                info!(message = %edit.commit_message, "accepted and committed");
                accepted.push(edit.commit_message);
                validation_results.push(EditOutcome { file: file_display, valid: true });
            } else {
                std::fs::write(&edit.file, &edit.original_content)?;
                info!(message = %edit.commit_message, "rejected and reverted");
                rejected.push(edit.commit_message);
                validation_results.push(EditOutcome { file: file_display, valid: false });
            }
        }

        Ok((validation_results, accepted, rejected))
    }

    /// Compile the pre-edit content (written to a scratch copy) and the
    /// live post-edit file, then ask the oracle whether they're equivalent.
    fn validate(&self, edit: &Edit) -> Result<bool> {
        let level = edit.oracle_profile.optimization_level();

        let scratch = tempdir()?;
        let extension = edit.file.extension().and_then(|e| e.to_str()).unwrap_or("cpp");
        let baseline_path = scratch
            .path()
            .join(format!("baseline.{extension}"));
        std::fs::write(&baseline_path, &edit.original_content)?;

        let baseline = self.driver.compile_to_asm(&baseline_path, level, &[])?;
        let modified = self.driver.compile_to_asm(&edit.file, level, &[])?;

        Ok(self.oracle.validate(&baseline, &modified) == Verdict::Equivalent)
    }
}
