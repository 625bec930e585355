//! The job submission type and its construction-time validation, grounded
//! in `original_source/core/mod_request.py`'s `__post_init__`.

use uuid::Uuid;

use crate::edits::PrototypeChange;
use crate::errors::{LevelupError, Result};

/// Where a mod's changes come from.
#[derive(Debug, Clone)]
pub enum ModSource {
    /// One of the named generators in the `EditLibrary`, resolved by
    /// `mod_type`. `prototype_changes` only applies when `mod_type` is
    /// `"change_prototype"`: the registry has no slot for a generator's
    /// own worklist, so `job::executor::process_one` builds a
    /// `PrototypeChangeGenerator` from this field directly instead of
    /// looking the id up in the `EditLibrary`.
    Builtin {
        mod_type: String,
        prototype_changes: Vec<PrototypeChange>,
    },
    /// A single existing commit, cherry-picked onto the work branch without
    /// going through the oracle (the change is already someone's vetted work,
    /// not a generated edit the engine needs to validate).
    Commit { commit_hash: String },
}

/// A request to run one mod against one repository.
///
/// Validation happens at construction, not at job-processing time: a
/// `ModSource::Builtin` with an empty `mod_type`, or a `ModSource::Commit`
/// with an empty `commit_hash`, is rejected by `ModRequest::new` before it
/// ever reaches the queue.
#[derive(Debug, Clone)]
pub struct ModRequest {
    pub id: Uuid,
    pub repo_url: String,
    pub description: String,
    pub source: ModSource,
}

impl ModRequest {
    pub fn new(repo_url: impl Into<String>, description: impl Into<String>, source: ModSource) -> Result<Self> {
        match &source {
            ModSource::Builtin { mod_type, .. } if mod_type.trim().is_empty() => {
                return Err(LevelupError::Config("mod_type required for builtin source".into()));
            }
            ModSource::Builtin { mod_type, prototype_changes } if mod_type == "change_prototype" && prototype_changes.is_empty() => {
                return Err(LevelupError::Config(
                    "change_prototype requires at least one entry in prototype_changes".into(),
                ));
            }
            ModSource::Commit { commit_hash } if commit_hash.trim().is_empty() => {
                return Err(LevelupError::Config("commit_hash required for commit source".into()));
            }
            _ => {}
        }

        let repo_url = repo_url.into();
        if repo_url.trim().is_empty() {
            return Err(LevelupError::Config("repo_url must not be empty".into()));
        }

        Ok(Self {
            id: Uuid::new_v4(),
            repo_url,
            description: description.into(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_request_requires_nonempty_mod_type() {
        let err = ModRequest::new(
            "https://example.com/org/repo.git",
            "test",
            ModSource::Builtin { mod_type: "".into(), prototype_changes: Vec::new() },
        )
        .unwrap_err();
        assert!(matches!(err, LevelupError::Config(_)));
    }

    #[test]
    fn change_prototype_request_requires_nonempty_worklist() {
        let err = ModRequest::new(
            "https://example.com/org/repo.git",
            "test",
            ModSource::Builtin { mod_type: "change_prototype".into(), prototype_changes: Vec::new() },
        )
        .unwrap_err();
        assert!(matches!(err, LevelupError::Config(_)));
    }

    #[test]
    fn change_prototype_request_with_a_worklist_is_accepted() {
        let req = ModRequest::new(
            "https://example.com/org/repo.git",
            "rename add to sum",
            ModSource::Builtin {
                mod_type: "change_prototype".into(),
                prototype_changes: vec![PrototypeChange::Rename {
                    qualified_name: "ns::add".into(),
                    new_name: "sum".into(),
                }],
            },
        )
        .unwrap();
        assert_eq!(req.repo_url, "https://example.com/org/repo.git");
    }

    #[test]
    fn commit_request_requires_nonempty_hash() {
        let err = ModRequest::new(
            "https://example.com/org/repo.git",
            "test",
            ModSource::Commit { commit_hash: "".into() },
        )
        .unwrap_err();
        assert!(matches!(err, LevelupError::Config(_)));
    }

    #[test]
    fn valid_builtin_request_is_accepted() {
        let req = ModRequest::new(
            "https://example.com/org/repo.git",
            "add override everywhere",
            ModSource::Builtin { mod_type: "add_override".into(), prototype_changes: Vec::new() },
        )
        .unwrap();
        assert_eq!(req.repo_url, "https://example.com/org/repo.git");
    }

    #[test]
    fn empty_repo_url_is_rejected() {
        let err = ModRequest::new("", "test", ModSource::Commit { commit_hash: "abc123".into() }).unwrap_err();
        assert!(matches!(err, LevelupError::Config(_)));
    }
}
