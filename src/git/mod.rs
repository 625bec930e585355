//! Git workspace automation: every mutating operation shells out to the
//! real `git` binary rather than reimplementing its object/pack format.
//! Grounded in `original_source/core/repo/repo.py`.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tracing::{debug, error, info};

use crate::config::ToolchainConfig;
use crate::errors::{LevelupError, Result};

const WORK_BRANCH: &str = "levelup-work";

/// A cloned repository plus the git binary and post-checkout hook needed
/// to operate on it.
pub struct GitWorkspace {
    git_path: PathBuf,
    pub repo_path: PathBuf,
    pub url: String,
    pub work_branch: String,
    post_checkout: String,
}

impl GitWorkspace {
    pub fn new(
        toolchain: &ToolchainConfig,
        url: impl Into<String>,
        repo_dir: impl Into<PathBuf>,
        post_checkout: impl Into<String>,
    ) -> Self {
        Self {
            git_path: toolchain.git_binary(),
            repo_path: repo_dir.into(),
            url: url.into(),
            work_branch: WORK_BRANCH.to_string(),
            post_checkout: post_checkout.into(),
        }
    }

    fn run(&self, args: &[&str]) -> Result<String> {
        self.run_in(&self.repo_path, args)
    }

    fn run_in(&self, cwd: &Path, args: &[&str]) -> Result<String> {
        debug!(git_path = %self.git_path.display(), ?args, "running git");
        let output = Command::new(&self.git_path)
            .args(args)
            .current_dir(cwd)
            .output()
            .map_err(|e| LevelupError::Workspace(format!("failed to spawn git: {e}")))?;
        self.finish(&format!("git {}", args.join(" ")), output)
    }

    fn finish(&self, command_line: &str, output: Output) -> Result<String> {
        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            error!(%command_line, %stderr, "git command failed");
            return Err(LevelupError::Workspace(format!(
                "{command_line} failed: {stderr}"
            )));
        }
        Ok(stdout)
    }

    fn run_shell(&self, command: &str) -> Result<String> {
        debug!(%command, "running post-checkout hook");
        let output = Command::new("sh")
            .arg("-c")
            .arg(command)
            .current_dir(&self.repo_path)
            .output()
            .map_err(|e| LevelupError::Workspace(format!("failed to spawn shell: {e}")))?;
        self.finish(command, output)
    }

    fn clone(&self) -> Result<()> {
        info!(url = %self.url, path = %self.repo_path.display(), "cloning repository");
        let parent = self.repo_path.parent().unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(parent)?;
        self.run_in(
            parent,
            &["clone", &self.url, &self.repo_path.display().to_string()],
        )?;
        Ok(())
    }

    /// Clone if missing; otherwise check out the default branch and pull.
    /// The default branch is discovered by trying `main` then `master`.
    pub fn ensure_cloned(&self) -> Result<()> {
        if !self.repo_path.exists() {
            return self.clone();
        }
        if self.run(&["checkout", "main"]).is_err() {
            debug!("'main' branch not found, trying 'master'");
            self.run(&["checkout", "master"])?;
        }
        self.run(&["pull"])?;
        Ok(())
    }

    /// Check out `branch`, creating it from the current `HEAD` if it
    /// doesn't already exist locally or on the remote.
    pub fn checkout(&self, branch: &str, create: bool) -> Result<()> {
        if create {
            let branches = self.run(&["branch", "-a"])?;
            if branches.lines().any(|l| l.trim_end().ends_with(branch)) {
                self.run(&["checkout", branch])?;
            } else {
                self.run(&["checkout", "-b", branch])?;
            }
        } else {
            self.run(&["checkout", branch])?;
        }

        if !self.post_checkout.is_empty() {
            self.run_shell(&self.post_checkout)?;
        }
        Ok(())
    }

    /// Check out (creating if necessary) the fixed work branch and run the
    /// post-checkout hook.
    pub fn prepare_work_branch(&self) -> Result<()> {
        let branch = self.work_branch.clone();
        self.checkout(&branch, true)
    }

    /// Create `new_branch` from `base`, checking it out.
    pub fn create_atomic_branch(&self, base: &str, new_branch: &str) -> Result<()> {
        self.run(&["checkout", base])?;
        self.run(&["checkout", "-b", new_branch])?;
        Ok(())
    }

    /// Stage everything and commit. Fails cleanly (a `Workspace` error, not
    /// a panic) if there is nothing to commit.
    pub fn commit(&self, message: &str) -> Result<()> {
        self.run(&["add", "-A"])?;
        self.run(&["commit", "-m", message])?;
        Ok(())
    }

    pub fn reset_hard(&self, reference: &str) -> Result<()> {
        self.run(&["reset", "--hard", reference])?;
        Ok(())
    }

    /// Squash every commit on `atomic_branch` into one, then rebase that
    /// single commit onto `onto_branch`, leaving `onto_branch` checked out
    /// with the squashed commit applied and `atomic_branch` deleted.
    pub fn squash_and_rebase(&self, atomic_branch: &str, onto_branch: &str) -> Result<()> {
        self.run(&["checkout", atomic_branch])?;
        let merge_base = self.run(&["merge-base", onto_branch, atomic_branch])?;
        self.run(&["reset", "--soft", &merge_base])?;
        self.run(&["commit", "-m", &format!("Squash changes from {atomic_branch}")])?;

        self.run(&["checkout", onto_branch])?;
        self.run(&["cherry-pick", atomic_branch])?;
        self.delete_branch(atomic_branch, true)?;
        Ok(())
    }

    pub fn push(&self, branch: &str) -> Result<()> {
        info!(%branch, "pushing branch to origin");
        self.run(&["push", "-u", "origin", branch])?;
        Ok(())
    }

    pub fn delete_branch(&self, name: &str, force: bool) -> Result<()> {
        let flag = if force { "-D" } else { "-d" };
        self.run(&["branch", flag, name])?;
        Ok(())
    }

    /// Cherry-pick a single commit, used only for COMMIT-sourced mods.
    pub fn cherry_pick(&self, commit_hash: &str) -> Result<()> {
        self.run(&["cherry-pick", commit_hash])?;
        Ok(())
    }

    pub fn current_branch(&self) -> Result<String> {
        self.run(&["rev-parse", "--abbrev-ref", "HEAD"])
    }
}
