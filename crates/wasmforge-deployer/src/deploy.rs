//! Deploy Runner (C7): validates WASM bytes, ensures a signing identity,
//! invokes the deploy CLI, and parses the resulting contract id (spec §4.7).

use std::path::Path;

use wasmforge_core::job::{DeployResult, LogKind, LogRecord, Network};
use wasmforge_core::subprocess::stream_command;
use wasmforge_core::wasm::{summarize, validate_wasm_module};
use wasmforge_core::{Error, Result};

use crate::contract_id::extract_contract_id;
use crate::identity::{ensure_identity, DEFAULT_IDENTITY};

const DEPLOY_CLI: &str = "stellar";

/// Probe for the deploy CLI on PATH (spec §4.7 step 1).
pub fn is_available() -> bool {
    std::process::Command::new(DEPLOY_CLI)
        .arg("--version")
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// `Deploy(project_id, wasm_bytes, network, emit_log) -> DeployResult |
/// Error` (spec §4.7). `project_id` is used as the contract alias.
pub async fn deploy(
    scratch_root: &Path,
    job_id: &str,
    project_id: &str,
    wasm_bytes: &[u8],
    network: Network,
    mut emit_log: impl FnMut(LogRecord),
) -> Result<DeployResult> {
    if !is_available() {
        return Err(Error::ToolchainMissing(DEPLOY_CLI.to_string()));
    }

    // Step 2: WASM validation.
    validate_wasm_module(wasm_bytes)?;
    let summary = summarize(wasm_bytes);
    emit_log(LogRecord::new(
        LogKind::Info,
        format!(
            "validated wasm module: magic_ok={} version_ok={} size={}",
            summary.magic_ok, summary.version_ok, summary.size
        ),
    ));

    // Steps 3-4: signing identity + funding.
    ensure_identity(network, &mut emit_log).await?;

    // Step 5: materialize the wasm bytes to a per-job file.
    let job_dir = scratch_root.join(format!("wasmforge-deploy-{job_id}"));
    std::fs::create_dir_all(&job_dir).map_err(|e| Error::Internal(e.to_string()))?;
    let wasm_path = job_dir.join("contract.wasm");
    std::fs::write(&wasm_path, wasm_bytes).map_err(|e| Error::Internal(e.to_string()))?;

    let on_disk_size = std::fs::metadata(&wasm_path)
        .map_err(|e| Error::Internal(e.to_string()))?
        .len() as usize;
    if on_disk_size != wasm_bytes.len() {
        std::fs::remove_dir_all(&job_dir).ok();
        return Err(Error::Internal(format!(
            "wasm on-disk size {on_disk_size} does not match input length {}",
            wasm_bytes.len()
        )));
    }

    let result = deploy_materialized(&wasm_path, project_id, network, &mut emit_log).await;

    // Step 8: cleanup the ephemeral directory on every exit path.
    std::fs::remove_dir_all(&job_dir).ok();

    result
}

async fn deploy_materialized(
    wasm_path: &Path,
    project_id: &str,
    network: Network,
    emit_log: &mut impl FnMut(LogRecord),
) -> Result<DeployResult> {
    let wasm_path_str = wasm_path.to_string_lossy().to_string();
    let network_str = network.as_str();

    let args = [
        "contract",
        "deploy",
        "--wasm",
        &wasm_path_str,
        "--source",
        DEFAULT_IDENTITY,
        "--network",
        network_str,
        "--alias",
        project_id,
    ];

    let mut stdout_buf = String::new();
    let status = stream_command(
        DEPLOY_CLI,
        &args,
        wasm_path.parent().unwrap_or(Path::new(".")),
        |kind, line| {
            stdout_buf.push_str(line);
            stdout_buf.push('\n');
            emit_log(LogRecord::new(kind, line));
        },
    )
    .await?;

    if !status.success() {
        return Err(Error::CompilerFailed(format!(
            "{DEPLOY_CLI} contract deploy exited with {status}"
        )));
    }

    let contract_id =
        extract_contract_id(&stdout_buf).ok_or(Error::ContractIdNotFound)?;

    let signer_address = resolve_signer_address().await.unwrap_or_default();

    emit_log(LogRecord::new(
        LogKind::Success,
        format!("deployed contract {contract_id} on {network_str}"),
    ));

    Ok(DeployResult {
        contract_id,
        network,
        signer_identity: DEFAULT_IDENTITY.to_string(),
        signer_address,
    })
}

async fn resolve_signer_address() -> Option<String> {
    let output = tokio::process::Command::new(DEPLOY_CLI)
        .args(["keys", "address", DEFAULT_IDENTITY])
        .output()
        .await
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let address = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if address.is_empty() {
        None
    } else {
        Some(address)
    }
}
