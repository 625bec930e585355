//! `cl.exe` backend, grounded in
//! `original_source/core/compilers/msvc_compiler.py`.
//!
//! `vcvarsall.bat` only needs to run once per architecture per process: its
//! output environment is cached in a process-wide map keyed by arch, the
//! same cache key the Python implementation uses (`msvc_{arch}`).

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{Mutex, OnceLock};

use tempfile::tempdir;
use tracing::{debug, error, info};

use crate::compiler::driver::CompilerDriver;
use crate::compiler::types::{CompiledArtifact, CompilerKind, OptimizationLevel};
use crate::config::ToolchainConfig;
use crate::errors::{LevelupError, Result};

fn optimization_flag(level: OptimizationLevel) -> &'static str {
    match level {
        OptimizationLevel::O0 => "/Od",
        OptimizationLevel::O1 => "/O1",
        OptimizationLevel::O2 => "/O2",
        OptimizationLevel::O3 => "/Ox",
    }
}

type EnvCache = Mutex<HashMap<String, HashMap<String, String>>>;

fn env_cache() -> &'static EnvCache {
    static CACHE: OnceLock<EnvCache> = OnceLock::new();
    CACHE.get_or_init(|| Mutex::new(HashMap::new()))
}

pub struct MsvcDriver {
    cl_path: PathBuf,
    env: HashMap<String, String>,
}

impl MsvcDriver {
    pub fn new(toolchain: &ToolchainConfig) -> Result<Self> {
        info!("initializing MSVC driver");
        let cl_path = toolchain
            .cl
            .clone()
            .ok_or_else(|| LevelupError::Config("tools.json: `cl` is not set".into()))?;
        let vcvarsall = toolchain.require_vcvarsall()?;
        let arch = toolchain.msvc_arch.as_deref().unwrap_or("x64");

        let cache_key = format!("msvc_{arch}");
        let mut cache = env_cache().lock().expect("env cache poisoned");
        if let Some(env) = cache.get(&cache_key) {
            debug!("reusing cached MSVC environment for {cache_key}");
            return Ok(Self {
                cl_path,
                env: env.clone(),
            });
        }

        debug!("loading MSVC environment via vcvarsall");
        let env = load_vcvarsall_environment(vcvarsall, arch)?;
        cache.insert(cache_key, env.clone());
        Ok(Self { cl_path, env })
    }

    fn run_cl(&self, args: &[String], cwd: &Path) -> Result<std::process::Output> {
        debug!(?args, "running cl.exe");
        let output = Command::new(&self.cl_path)
            .args(args)
            .current_dir(cwd)
            .envs(&self.env)
            .output()
            .map_err(|e| LevelupError::Compilation(format!("failed to spawn cl.exe: {e}")))?;
        if !output.status.success() {
            error!(status = %output.status, "cl.exe failed");
        }
        Ok(output)
    }
}

fn load_vcvarsall_environment(vcvarsall: &Path, arch: &str) -> Result<HashMap<String, String>> {
    let cmd = format!("\"{}\" {arch} && set", vcvarsall.display());
    let output = Command::new("cmd")
        .args(["/C", &cmd])
        .output()
        .map_err(|e| LevelupError::Compilation(format!("failed to run vcvarsall.bat: {e}")))?;
    if !output.status.success() {
        return Err(LevelupError::Compilation(
            "vcvarsall.bat exited non-zero".into(),
        ));
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    let mut env = HashMap::new();
    for line in stdout.lines() {
        if let Some((key, value)) = line.split_once('=') {
            env.insert(key.to_uppercase(), value.to_string());
        }
    }
    Ok(env)
}

impl CompilerDriver for MsvcDriver {
    fn kind(&self) -> CompilerKind {
        CompilerKind::Msvc
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
        let asm_file = scratch.path().join(format!("{base_name}.asm"));
        let obj_file = scratch.path().join(format!("{base_name}.obj"));

        let mut args = vec![
            "/EHsc".to_string(),
            "/nologo".to_string(),
            "/W3".to_string(),
            optimization_flag(level).to_string(),
        ];
        if level == OptimizationLevel::O3 {
            args.push("/D_ITERATOR_DEBUG_LEVEL=0".to_string());
        }
        args.extend([
            "/FA".to_string(),
            format!("/Fa{}", asm_file.display()),
            "/c".to_string(),
            format!("/Fo{}", obj_file.display()),
        ]);
        args.extend(extra_flags.iter().cloned());
        args.push(source_file.display().to_string());

        let cwd = source_file.parent().unwrap_or_else(|| Path::new("."));
        let output = self.run_cl(&args, cwd)?;
        if !output.status.success() || !asm_file.exists() {
            return Err(LevelupError::Compilation(format!(
                "cl.exe failed: {}",
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
        let args = vec![
            "/Zs".to_string(),
            "/nologo".to_string(),
            source_file.display().to_string(),
        ];
        let cwd = source_file.parent().unwrap_or_else(|| Path::new("."));
        let output = self.run_cl(&args, cwd)?;
        Ok((
            output.status.success(),
            String::from_utf8_lossy(&output.stderr).into_owned(),
        ))
    }
}
