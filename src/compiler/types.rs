//! Shared compiler types: which backend, at what optimization level, with
//! what result. Grounded in `original_source/core/compilers/compiled_file.py`
//! and `compiler_type.py`.

use std::path::PathBuf;

/// Which compiler backend produced (or should produce) an artifact.
///
/// The string returned by `as_str` is a stable identifier used in the HTTP
/// API and job records; renaming a variant's wire string is a breaking
/// change (see the source comment this mirrors: "stable identifier used in
/// APIs, do not change once set").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompilerKind {
    Msvc,
    Clang,
}

impl CompilerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompilerKind::Msvc => "msvc",
            CompilerKind::Clang => "clang",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            CompilerKind::Msvc => "Microsoft Visual C++",
            CompilerKind::Clang => "Clang/LLVM",
        }
    }
}

impl std::str::FromStr for CompilerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "msvc" => Ok(CompilerKind::Msvc),
            "clang" => Ok(CompilerKind::Clang),
            other => Err(format!("unknown compiler id: {other}")),
        }
    }
}

/// The four optimization levels the oracle distinguishes. `O0` and `O3` are
/// the two profiles edits are validated under; `O1`/`O2` exist for
/// completeness and ad hoc diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimizationLevel {
    O0,
    O1,
    O2,
    O3,
}

impl OptimizationLevel {
    pub fn as_u8(&self) -> u8 {
        match self {
            OptimizationLevel::O0 => 0,
            OptimizationLevel::O1 => 1,
            OptimizationLevel::O2 => 2,
            OptimizationLevel::O3 => 3,
        }
    }
}

/// The result of compiling one translation unit to assembly: the generated
/// listing text, plus the paths of any intermediate artifacts that survived
/// (for debugging a failed run).
#[derive(Debug, Clone)]
pub struct CompiledArtifact {
    pub source_file: PathBuf,
    pub asm_file: Option<PathBuf>,
    pub asm_text: String,
}
