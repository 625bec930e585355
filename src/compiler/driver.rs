//! The `CompilerDriver` trait all backends implement, grounded in
//! `original_source/core/compilers/base_compiler.py`.

use std::path::Path;

use crate::compiler::types::{CompiledArtifact, CompilerKind, OptimizationLevel};
use crate::errors::Result;

/// A backend that can turn a single translation unit into an assembly
/// listing. Each implementation owns its own flag set and environment
/// (MSVC needs a loaded `vcvarsall` environment; Clang does not).
pub trait CompilerDriver: Send + Sync {
    fn kind(&self) -> CompilerKind;

    /// Compile `source_file` to an assembly listing at the given
    /// optimization level, in a scratch directory the driver owns for the
    /// duration of the call.
    fn compile_to_asm(
        &self,
        source_file: &Path,
        level: OptimizationLevel,
        extra_flags: &[String],
    ) -> Result<CompiledArtifact>;

    /// Syntax-check only, no code generation. Returns `(ok, diagnostics)`.
    fn check_syntax(&self, source_file: &Path) -> Result<(bool, String)>;
}
