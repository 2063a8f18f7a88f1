//! Auxiliary deploy operations surfaced for completeness (spec §4.7): an
//! upload/install step that separates wasm upload from contract
//! instantiation, useful for large contracts or re-deploying an
//! already-uploaded wasm under a new alias.

use std::path::Path;

use wasmforge_core::job::{LogKind, LogRecord};
use wasmforge_core::subprocess::stream_command;
use wasmforge_core::{Error, Result};

use crate::contract_id::{extract_wasm_hash, is_valid_wasm_hash};
use crate::deploy::is_available;
use crate::identity::DEFAULT_IDENTITY;

const DEPLOY_CLI: &str = "stellar";

/// `UploadWasm(bytes, network) -> wasm_hash`: installs a wasm blob and
/// returns its 64-char hex hash without instantiating a contract.
pub async fn upload_wasm(
    wasm_path: &Path,
    network: &str,
    mut emit_log: impl FnMut(LogRecord),
) -> Result<String> {
    if !is_available() {
        return Err(Error::ToolchainMissing(DEPLOY_CLI.to_string()));
    }

    let wasm_path_str = wasm_path.to_string_lossy().to_string();
    let mut stdout_buf = String::new();

    let status = stream_command(
        DEPLOY_CLI,
        &[
            "contract",
            "upload",
            "--wasm",
            &wasm_path_str,
            "--source",
            DEFAULT_IDENTITY,
            "--network",
            network,
        ],
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
            "{DEPLOY_CLI} contract upload exited with {status}"
        )));
    }

    let hash = extract_wasm_hash(&stdout_buf)
        .ok_or_else(|| Error::Internal("upload output did not contain a wasm hash".into()))?;

    emit_log(LogRecord::new(LogKind::Success, format!("uploaded wasm hash {hash}")));
    Ok(hash)
}

/// `DeployByHash(hash, alias, network) -> contract_id`: instantiate a
/// contract from an already-uploaded wasm hash.
pub async fn deploy_by_hash(
    hash: &str,
    alias: &str,
    network: &str,
    mut emit_log: impl FnMut(LogRecord),
) -> Result<String> {
    if !is_valid_wasm_hash(hash) {
        return Err(Error::InvalidInput(format!(
            "{hash} is not a 64-char lowercase hex wasm hash"
        )));
    }
    if !is_available() {
        return Err(Error::ToolchainMissing(DEPLOY_CLI.to_string()));
    }

    let mut stdout_buf = String::new();
    let status = stream_command(
        DEPLOY_CLI,
        &[
            "contract",
            "deploy",
            "--wasm-hash",
            hash,
            "--source",
            DEFAULT_IDENTITY,
            "--network",
            network,
            "--alias",
            alias,
        ],
        Path::new("."),
        |kind, line| {
            stdout_buf.push_str(line);
            stdout_buf.push('\n');
            emit_log(LogRecord::new(kind, line));
        },
    )
    .await?;

    if !status.success() {
        return Err(Error::CompilerFailed(format!(
            "{DEPLOY_CLI} contract deploy (by hash) exited with {status}"
        )));
    }

    crate::contract_id::extract_contract_id(&stdout_buf).ok_or(Error::ContractIdNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_hex_hash() {
        let err = futures::executor::block_on(deploy_by_hash("not-a-hash", "alias", "testnet", |_| {}))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }
}
