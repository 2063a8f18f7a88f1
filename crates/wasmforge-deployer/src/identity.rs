//! Signing identity management (spec §4.7 step 3-4): a singleton default
//! identity the deploy CLI uses to authorize on-chain actions. Identity
//! creation and funding are both idempotent — "already exists" is success.

use wasmforge_core::job::{LogKind, LogRecord, Network};
use wasmforge_core::subprocess::stream_command;
use wasmforge_core::Result;

/// Name of the process-wide default signing identity. Addressed by name
/// at each invocation rather than an in-memory handle; concurrent deploys
/// on one worker share it because the CLI serializes signing (spec §5).
pub const DEFAULT_IDENTITY: &str = "wasmforge-default";

const DEPLOY_CLI: &str = "stellar";

/// Ensure `DEFAULT_IDENTITY` exists, creating it if absent. On `testnet`
/// also requests funding. "Already exists" is treated as success.
pub async fn ensure_identity(network: Network, emit_log: &mut impl FnMut(LogRecord)) -> Result<()> {
    let status = stream_command(
        DEPLOY_CLI,
        &["keys", "generate", DEFAULT_IDENTITY, "--no-fund"],
        std::path::Path::new("."),
        |kind, line| emit_log(LogRecord::new(kind, line)),
    )
    .await?;

    if status.success() {
        emit_log(LogRecord::new(
            LogKind::Info,
            format!("created signing identity {DEFAULT_IDENTITY}"),
        ));
    } else {
        // Nonzero exit from `keys generate` on an existing identity is the
        // CLI's "already exists" signal; this is not fatal.
        emit_log(LogRecord::new(
            LogKind::Info,
            format!("signing identity {DEFAULT_IDENTITY} already exists"),
        ));
    }

    if network == Network::Testnet {
        fund_identity(emit_log).await;
    }

    Ok(())
}

/// Explicit fund call on testnet. A failure is logged as a warning, not
/// fatal — the account may already be funded (spec §4.7 step 4).
pub async fn fund_identity(emit_log: &mut impl FnMut(LogRecord)) {
    let result = stream_command(
        DEPLOY_CLI,
        &["keys", "fund", DEFAULT_IDENTITY, "--network", "testnet"],
        std::path::Path::new("."),
        |kind, line| emit_log(LogRecord::new(kind, line)),
    )
    .await;

    match result {
        Ok(status) if status.success() => {
            emit_log(LogRecord::new(LogKind::Info, "funded signing identity"));
        }
        Ok(status) => {
            emit_log(LogRecord::new(
                LogKind::Warning,
                format!("funding call exited with {status}, account may already be funded"),
            ));
        }
        Err(e) => {
            emit_log(LogRecord::new(
                LogKind::Warning,
                format!("funding call failed, account may already be funded: {e}"),
            ));
        }
    }
}

pub fn address_for(identity: &str) -> std::process::Command {
    let mut cmd = std::process::Command::new(DEPLOY_CLI);
    cmd.args(["keys", "address", identity]);
    cmd
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_identity_name_is_stable() {
        assert_eq!(DEFAULT_IDENTITY, "wasmforge-default");
    }
}
