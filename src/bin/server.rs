//! HTTP entrypoint: loads `tools.json`/`repos.json`, starts the job
//! executor's worker thread, and serves the axum router. Grounded in
//! `original_source/server/app.py` / `levelup_server/app.py`'s process
//! bootstrap, restructured around the `JobExecutor` queue instead of
//! processing each request inline.

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use levelup_core::compiler::CompilerKind;
use levelup_core::config::ToolchainConfig;
use levelup_core::http::router;
use levelup_core::job::JobExecutor;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let workspace_root = std::env::var("LEVELUP_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."));

    let toolchain = ToolchainConfig::load(&workspace_root.join("tools.json"))
        .unwrap_or_else(|e| panic!("failed to load tools.json: {e}"));

    let compiler_kind = std::env::var("LEVELUP_COMPILER")
        .ok()
        .and_then(|s| CompilerKind::from_str(&s).ok())
        .unwrap_or(CompilerKind::Clang);

    let repos_root = workspace_root.join("repos");
    let executor = Arc::new(JobExecutor::spawn(toolchain, compiler_kind, repos_root, None));

    let app = router(executor);

    let bind_addr = std::env::var("LEVELUP_BIND").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {bind_addr}: {e}"));

    tracing::info!(%bind_addr, "levelup-server listening");
    axum::serve(listener, app)
        .await
        .unwrap_or_else(|e| panic!("server error: {e}"));
}
