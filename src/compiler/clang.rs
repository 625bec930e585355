//! `clang` backend, grounded in
//! `original_source/core/compilers/clang_compiler.py`. Simpler than the
//! MSVC driver: no environment bootstrap, Intel-syntax `-S` output so the
//! oracle can compare it against the MSVC listing format.

use std::path::Path;
use std::process::Command;

use tempfile::tempdir;
use tracing::{debug, error, info};

use crate::compiler::driver::CompilerDriver;
use crate::compiler::types::{CompiledArtifact, CompilerKind, OptimizationLevel};
use crate::config::ToolchainConfig;
use crate::errors::{LevelupError, Result};

fn optimization_flag(level: OptimizationLevel) -> &'static str {
    match level {
        OptimizationLevel::O0 => "-O0",
        OptimizationLevel::O1 => "-O1",
        OptimizationLevel::O2 => "-O2",
        OptimizationLevel::O3 => "-O3",
    }
}

pub struct ClangDriver {
    clang_path: std::path::PathBuf,
}

impl ClangDriver {
    pub fn new(toolchain: &ToolchainConfig) -> Result<Self> {
        info!("initializing clang driver");
        let clang_path = toolchain
            .clang
            .clone()
            .unwrap_or_else(|| std::path::PathBuf::from("clang"));

        let output = Command::new(&clang_path).arg("--version").output();
        match output {
            Ok(o) if o.status.success() => {
                let version_line = String::from_utf8_lossy(&o.stdout)
                    .lines()
                    .next()
                    .unwrap_or_default()
                    .to_string();
                info!(%version_line, "clang driver ready");
            }
            _ => {
                return Err(LevelupError::Config(format!(
                    "clang not found at {}",
                    clang_path.display()
                )))
            }
        }
        Ok(Self { clang_path })
    }

    fn run_clang(&self, args: &[String], cwd: &Path) -> Result<std::process::Output> {
        debug!(?args, "running clang");
        let output = Command::new(&self.clang_path)
            .args(args)
            .current_dir(cwd)
            .output()
            .map_err(|e| LevelupError::Compilation(format!("failed to spawn clang: {e}")))?;
        if !output.status.success() {
            error!(status = %output.status, "clang failed");
        }
        Ok(output)
    }
}

impl CompilerDriver for ClangDriver {
    fn kind(&self) -> CompilerKind {
        CompilerKind::Clang
    }

    fn compile_to_asm(
        &self,
        source_file: &Path,
        level: OptimizationLevel,
        extra_flags: &[String],
    ) -> Result<CompiledArtifact> {
        let scratch = tempdir()?;
        let base_name = source_file
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("out");
        let asm_file = scratch.path().join(format!("{base_name}.s"));

        let mut args = vec!["-std=c++17".to_string(), "-Wall".to_string()];
        args.push(optimization_flag(level).to_string());
        args.extend([
            "-S".to_string(),
            "-masm=intel".to_string(),
            "-o".to_string(),
            asm_file.display().to_string(),
        ]);
        args.extend(extra_flags.iter().cloned());
        args.push(source_file.display().to_string());

        let cwd = source_file.parent().unwrap_or_else(|| Path::new("."));
        let output = self.run_clang(&args, cwd)?;
        if !output.status.success() || !asm_file.exists() {
            return Err(LevelupError::Compilation(format!(
                "clang failed: {}",
                String::from_utf8_lossy(&output.stderr)
            )));
        }
        let asm_text = std::fs::read_to_string(&asm_file)?;
        Ok(CompiledArtifact {
            source_file: source_file.to_path_buf(),
            asm_file: Some(asm_file),
            asm_text,
        })
    }

    fn check_syntax(&self, source_file: &Path) -> Result<(bool, String)> {
        let cwd = source_file.parent().unwrap_or_else(|| Path::new("."));
        let args = vec!["-fsyntax-only".to_string(), source_file.display().to_string()];
        let output = self.run_clang(&args, cwd)?;
        Ok((
            output.status.success(),
            String::from_utf8_lossy(&output.stderr).into_owned(),
        ))
    }
}
