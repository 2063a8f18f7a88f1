//! WASM artifact structural validation (spec §4.7 step 2).
//!
//! Contract-ID extraction from deploy CLI output is a deploy-specific
//! concern and lives in `wasmforge-deployer`, not here.

use crate::{Error, Result};

const WASM_MAGIC: [u8; 4] = [0x00, 0x61, 0x73, 0x6d];
const WASM_VERSION: [u8; 4] = [0x01, 0x00, 0x00, 0x00];

/// Validate that `bytes` begins with the WASM magic number and version 1
/// header, and that a plausible section marker byte (0..=11) appears
/// somewhere in the first 100 bytes. Does not parse sections; this is a
/// cheap structural sniff, not a full module validator.
pub fn validate_wasm_module(bytes: &[u8]) -> Result<()> {
    if bytes.len() < 8 {
        return Err(Error::InvalidWasm(
            "artifact shorter than an 8-byte header".into(),
        ));
    }
    if bytes[0..4] != WASM_MAGIC {
        return Err(Error::InvalidWasm("missing \\0asm magic bytes".into()));
    }
    if bytes[4..8] != WASM_VERSION {
        return Err(Error::InvalidWasm("unsupported wasm version".into()));
    }

    let window = &bytes[..bytes.len().min(100)];
    if !window.iter().any(|b| *b <= 11) {
        return Err(Error::InvalidWasm(
            "no plausible section marker in first 100 bytes".into(),
        ));
    }

    Ok(())
}

/// A structured summary of a validated module, for the log line spec §4.7
/// step 2 asks the deploy runner to emit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WasmSummary {
    pub magic_ok: bool,
    pub version_ok: bool,
    pub size: usize,
}

pub fn summarize(bytes: &[u8]) -> WasmSummary {
    WasmSummary {
        magic_ok: bytes.len() >= 4 && bytes[0..4] == WASM_MAGIC,
        version_ok: bytes.len() >= 8 && bytes[4..8] == WASM_VERSION,
        size: bytes.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_header() -> Vec<u8> {
        let mut v = WASM_MAGIC.to_vec();
        v.extend_from_slice(&WASM_VERSION);
        v.extend_from_slice(&[0, 1, 2, 3]);
        v
    }

    #[test]
    fn accepts_valid_header() {
        assert!(validate_wasm_module(&valid_header()).is_ok());
    }

    #[test]
    fn rejects_too_short() {
        assert!(validate_wasm_module(&[0x00, 0x61, 0x73]).is_err());
    }

    #[test]
    fn rejects_bad_magic() {
        let mut bytes = valid_header();
        bytes[0] = 0xff;
        assert!(validate_wasm_module(&bytes).is_err());
    }

    #[test]
    fn rejects_bad_version() {
        let mut bytes = valid_header();
        bytes[4] = 0x02;
        assert!(validate_wasm_module(&bytes).is_err());
    }

    #[test]
    fn summary_reports_size_and_flags() {
        let bytes = valid_header();
        let summary = summarize(&bytes);
        assert!(summary.magic_ok);
        assert!(summary.version_ok);
        assert_eq!(summary.size, bytes.len());
    }

    #[test]
    fn summary_flags_bad_magic() {
        let mut bytes = valid_header();
        bytes[0] = 0xff;
        assert!(!summarize(&bytes).magic_ok);
    }
}
