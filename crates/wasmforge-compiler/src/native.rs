//! Native compile backend: spawns the local toolchain directly and
//! streams its output line by line (spec §4.6 step 1).

use std::path::Path;

use wasmforge_core::job::{CompileBackend, CompileResult, LogKind, LogRecord};
use wasmforge_core::subprocess::stream_command;
use wasmforge_core::{Error, Result};

use crate::layout;

const BUILD_COMMAND: &str = "cargo";
const BUILD_ARGS: [&str; 4] = ["build", "--release", "--target", "wasm32-unknown-unknown"];

/// Probe for the native toolchain on PATH.
pub fn is_available() -> bool {
    std::process::Command::new(BUILD_COMMAND)
        .arg("--version")
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

pub async fn compile(
    build_root: &Path,
    mut emit_log: impl FnMut(LogRecord),
) -> Result<CompileResult> {
    layout::normalize_package_layout(build_root)?;

    let target_dir = build_root.join("target");
    std::fs::create_dir_all(&target_dir).map_err(|e| Error::Internal(e.to_string()))?;

    let status = stream_command(BUILD_COMMAND, &BUILD_ARGS, build_root, |kind, line| {
        emit_log(LogRecord::new(kind, line));
    })
    .await?;

    if !status.success() {
        return Err(Error::CompilerFailed(format!(
            "{BUILD_COMMAND} exited with {status}"
        )));
    }

    let wasm_dir = target_dir.join("wasm32-unknown-unknown").join("release");
    let artifact = layout::find_wasm_artifact(&wasm_dir)?;
    let bytes = std::fs::read(&artifact).map_err(|e| Error::Internal(e.to_string()))?;
    let filename = artifact
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("out.wasm")
        .to_string();

    emit_log(LogRecord::new(
        LogKind::Success,
        format!("native build finished: {filename} ({} bytes)", bytes.len()),
    ));

    Ok(CompileResult {
        wasm_bytes: bytes,
        wasm_filename: filename,
        backend_used: CompileBackend::Native,
    })
}
