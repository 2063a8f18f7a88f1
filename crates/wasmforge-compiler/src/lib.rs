//! Compile Runner (C6): materializes a project's source tree, selects a
//! backend by capability probe (native, container, stub), streams its
//! logs, and returns WASM bytes or a terminal error (spec §4.6).

pub mod container;
pub mod layout;
pub mod native;
pub mod stub;

use bollard::Docker;
use wasmforge_core::job::{CompileResult, LogRecord};
use wasmforge_core::project::SourceFile;
use wasmforge_core::Result;

/// Default image used by the container backend when none is configured.
pub const DEFAULT_COMPILE_IMAGE: &str = "wasmforge/compile-toolchain:latest";

/// `Compile(project_id, files[], emit_log) -> CompileResult | Error`
/// (spec §4.6). Materializes `files` into a fresh ephemeral directory,
/// probes backends in order (native, container, stub), and cleans up the
/// directory on every exit path.
pub async fn compile(
    scratch_root: &std::path::Path,
    job_id: &str,
    files: &[SourceFile],
    compile_image: &str,
    mut emit_log: impl FnMut(LogRecord),
) -> Result<CompileResult> {
    let project_dir = layout::materialize(scratch_root, job_id, files)?;
    let result = compile_materialized(&project_dir, job_id, compile_image, &mut emit_log).await;
    layout::cleanup(&project_dir);
    result
}

async fn compile_materialized(
    project_dir: &std::path::Path,
    job_id: &str,
    compile_image: &str,
    emit_log: &mut impl FnMut(LogRecord),
) -> Result<CompileResult> {
    // Backend selection is by availability, not by outcome: once a backend
    // is chosen, its result (success or failure) is final for this attempt.
    // Falling back on a genuine compile failure would mask the real error
    // and retry with a different toolchain within the same attempt, which
    // the broker's retry policy — not this function — is responsible for.
    if native::is_available() {
        let build_root = layout::find_build_root(project_dir)?;
        return native::compile(&build_root, |l| emit_log(l)).await;
    }

    if let Ok(docker) = Docker::connect_with_local_defaults() {
        if container::is_available(&docker).await {
            let build_root = layout::find_build_root(project_dir)?;
            let output_dir = project_dir.join("output");
            return container::compile(&docker, compile_image, &build_root, &output_dir, job_id, |l| {
                emit_log(l)
            })
            .await;
        }
    }

    let build_root = layout::find_build_root(project_dir)?;
    stub::compile(&build_root, |l| emit_log(l))
}
