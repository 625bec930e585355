//! Compiler backends: `CompilerDriver` is the only seam anything outside
//! this module should depend on. Grounded in
//! `original_source/core/compilers/compiler_factory.py` — "the ONLY place
//! that should branch on compiler type" becomes `build_driver` below.

mod clang;
mod driver;
mod msvc;
mod types;

pub use clang::ClangDriver;
pub use driver::CompilerDriver;
pub use msvc::MsvcDriver;
pub use types::{CompiledArtifact, CompilerKind, OptimizationLevel};

use crate::config::ToolchainConfig;
use crate::errors::Result;

/// Construct the driver for `kind`. This is the sole branch point on
/// `CompilerKind` in the crate; everything else programs against
/// `CompilerDriver`.
pub fn build_driver(kind: CompilerKind, toolchain: &ToolchainConfig) -> Result<Box<dyn CompilerDriver>> {
    match kind {
        CompilerKind::Msvc => Ok(Box::new(MsvcDriver::new(toolchain)?)),
        CompilerKind::Clang => Ok(Box::new(ClangDriver::new(toolchain)?)),
    }
}
