//! Error taxonomy for the LevelUp refactoring engine.
//!
//! This module defines a unified error enumeration used across the
//! compiler driver, git workspace, symbol table, and job executor. It
//! integrates with `thiserror` to provide rich `Display` implementations
//! and error source chaining where applicable.
//!
//! Notes:
//! - `Compilation` and `OracleMismatch` are not fatal to a job: the
//!   `AtomicCommitEngine` absorbs them into a rejected edit outcome.
//! - `Config`, `Workspace`, and `Internal` are fatal: they terminate the
//!   job with a `Status::Error`.

use thiserror::Error;

/// Unified error enumeration for the LevelUp core.
#[derive(Error, Debug)]
pub enum LevelupError {
    /// Missing tool path, malformed `tools.json`, or an unknown mod/validator id.
    #[error("configuration error: {0}")]
    Config(String),

    /// Clone/fetch/checkout/push failure, or a non-zero post-checkout hook.
    #[error("git workspace error: {0}")]
    Workspace(String),

    /// The compiler exited non-zero for a translation unit.
    #[error("compilation failed: {0}")]
    Compilation(String),

    /// The asm oracle found the original and modified listings inequivalent.
    #[error("oracle rejected edit: {0}")]
    OracleMismatch(String),

    /// I/O error from an underlying reader, writer, or subprocess spawn.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON in a persisted config or request body.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed Doxygen XML while parsing symbol metadata.
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Unexpected condition: invariant violation, parser failure, etc.
    #[error("internal error: {0}")]
    Internal(String),
}

impl LevelupError {
    /// True for errors that should abort the whole job with `Status::Error`,
    /// as opposed to being absorbed into a single edit's outcome.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            LevelupError::Compilation(_) | LevelupError::OracleMismatch(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, LevelupError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compilation_and_oracle_errors_are_not_fatal() {
        assert!(!LevelupError::Compilation("cl.exe exited 2".into()).is_fatal());
        assert!(!LevelupError::OracleMismatch("bodies differ".into()).is_fatal());
    }

    #[test]
    fn config_and_workspace_errors_are_fatal() {
        assert!(LevelupError::Config("missing git".into()).is_fatal());
        assert!(LevelupError::Workspace("clone failed".into()).is_fatal());
        assert!(LevelupError::Internal("invariant violated".into()).is_fatal());
    }
}
