//! Edit generators: lazy, deterministic, non-restartable sources of atomic
//! source mutations, keyed by stable string id in an `EditLibrary`.
//!
//! Grounded in `original_source/core/mods/*` — the four generators
//! (qualifier add/remove, prototype change, MS-macro replacement) mirror
//! `add_override_mod.py`, `remove_inline_mod.py`, and
//! `ms_macro_replacement.py`, generalized from their single hardcoded
//! qualifier/keyword to the families named in the component design.

mod library;
mod ms_macro;
mod prototype;
mod qualifier;

pub use library::EditLibrary;
pub use ms_macro::MsMacroReplacementGenerator;
pub use prototype::{PrototypeChange, PrototypeChangeGenerator};
pub use qualifier::{AddQualifierGenerator, RemoveQualifierGenerator};

use std::path::PathBuf;

use crate::errors::Result;
use crate::oracle::OracleProfile;
use crate::symbol::SymbolTable;

/// One atomic, already-applied-to-disk source mutation waiting to be
/// compiled and judged. The generator has already written the new content
/// to `file` by the time it yields an `Edit`; `original_content` is what
/// the caller restores on rejection.
#[derive(Debug, Clone)]
pub struct Edit {
    pub file: PathBuf,
    pub commit_message: String,
    pub oracle_profile: OracleProfile,
    pub success_probability: f32,
    pub original_content: String,
}

/// A source of atomic edits over a repository. Implementations are lazy
/// (an edit's mutation is applied to disk only when the iterator advances
/// to it) and non-restartable: calling `generate` twice without resetting
/// repository state produces undefined results, since the second call sees
/// the first call's edits already applied.
pub trait EditGenerator: Send + Sync {
    fn id(&self) -> &'static str;
    fn name(&self) -> &'static str;

    fn generate<'a>(
        &'a self,
        repo_path: &'a std::path::Path,
        symbols: &'a SymbolTable,
    ) -> Box<dyn Iterator<Item = Result<Edit>> + 'a>;
}

/// List every `*.cpp`/`*.c`/`*.hpp`/`*.h` file under `repo_path`, sorted for
/// deterministic iteration order, excluding the engine's own generated
/// compatibility header.
pub(crate) fn list_source_files(repo_path: &std::path::Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(repo_path)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| {
            matches!(
                p.extension().and_then(|e| e.to_str()),
                Some("cpp") | Some("c") | Some("hpp") | Some("h")
            )
        })
        .filter(|p| {
            !p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("_levelup_"))
        })
        .collect();
    files.sort();
    files
}
