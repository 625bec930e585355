//! Toolchain resolution and repository configuration persistence.
//!
//! Two independent JSON documents live at the workspace root:
//! `tools.json` (toolchain paths) and `repos.json` (the registered
//! repository list). Both are simple load-whole-file / rewrite-whole-file
//! stores — no partial updates, just a JSON array of objects.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

use crate::errors::{LevelupError, Result};

/// Absolute paths / values for the external tools the engine shells out to.
///
/// Every field is optional: a tool that no requested operation needs may be
/// left unset. Resolving a tool that is needed but unset is a
/// `LevelupError::Config`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolchainConfig {
    #[serde(default)]
    pub git: Option<PathBuf>,
    #[serde(default)]
    pub doxygen: Option<PathBuf>,
    #[serde(default)]
    pub cl: Option<PathBuf>,
    #[serde(default)]
    pub clang: Option<PathBuf>,
    #[serde(default)]
    pub vcvarsall: Option<PathBuf>,
    #[serde(default)]
    pub msvc_arch: Option<String>,
}

impl ToolchainConfig {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(path)?;
        serde_json::from_str(&data).map_err(LevelupError::from)
    }

    /// Resolve the `git` binary: configured path, falling back to `git` on `PATH`.
    pub fn git_binary(&self) -> PathBuf {
        self.git.clone().unwrap_or_else(|| PathBuf::from("git"))
    }

    /// Resolve the `doxygen` binary: configured path, falling back to `doxygen` on `PATH`.
    pub fn doxygen_binary(&self) -> PathBuf {
        self.doxygen
            .clone()
            .unwrap_or_else(|| PathBuf::from("doxygen"))
    }

    /// Resolve a required tool path, returning `Config` if it is unset and has no
    /// sensible `PATH` fallback (currently only `vcvarsall`).
    pub fn require_vcvarsall(&self) -> Result<&Path> {
        self.vcvarsall
            .as_deref()
            .ok_or_else(|| LevelupError::Config("tools.json: `vcvarsall` is not set".into()))
    }
}

/// A single registered repository, persisted in `repos.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryConfig {
    pub id: String,
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub post_checkout: String,
    #[serde(default)]
    pub build_command: Option<String>,
    #[serde(default)]
    pub single_tu_command: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl RepositoryConfig {
    pub fn new(url: impl Into<String>, post_checkout: impl Into<String>) -> Self {
        let url = url.into();
        let name = repo_name(&url);
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            url,
            post_checkout: post_checkout.into(),
            build_command: None,
            single_tu_command: None,
            timestamp: Utc::now(),
        }
    }
}

/// Load-on-start, rewrite-whole-file store for `repos.json`.
pub struct RepositoryStore {
    path: PathBuf,
    repos: Vec<RepositoryConfig>,
}

impl RepositoryStore {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let repos = if path.exists() {
            let data = std::fs::read_to_string(&path)?;
            serde_json::from_str(&data)?
        } else {
            Vec::new()
        };
        Ok(Self { path, repos })
    }

    pub fn all(&self) -> &[RepositoryConfig] {
        &self.repos
    }

    pub fn find_by_url(&self, url: &str) -> Option<&RepositoryConfig> {
        self.repos.iter().find(|r| r.url == url)
    }

    /// Register a repository, or return the existing entry if the URL is already known.
    pub fn register(&mut self, url: &str, post_checkout: &str) -> Result<RepositoryConfig> {
        if let Some(existing) = self.find_by_url(url) {
            return Ok(existing.clone());
        }
        let entry = RepositoryConfig::new(url, post_checkout);
        self.repos.push(entry.clone());
        self.save()?;
        Ok(entry)
    }

    fn save(&self) -> Result<()> {
        let data = serde_json::to_string_pretty(&self.repos)?;
        std::fs::write(&self.path, data)?;
        Ok(())
    }
}

/// Derive a repository's display name from its URL: the last path segment
/// with a trailing `.git` suffix stripped.
pub fn repo_name(url: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    let trimmed = trimmed.strip_suffix(".git").unwrap_or(trimmed);
    trimmed
        .rsplit('/')
        .next()
        .unwrap_or(trimmed)
        .to_string()
}

/// Characters permitted in a sanitized local directory name.
const ALLOWED_CHARS: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789!#()-.=[]{}~";

/// Sanitize a repository name into a safe local directory name: NFD-normalize,
/// then drop any character outside the allowed set.
pub fn sanitize_dirname(name: &str) -> String {
    name.nfd().filter(|c| ALLOWED_CHARS.contains(*c)).collect()
}
