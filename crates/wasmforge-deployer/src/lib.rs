//! Deploy Runner (C7): validates WASM bytes, ensures a signing identity,
//! invokes the deploy CLI, and parses the resulting contract id (spec §4.7).

pub mod contract_id;
pub mod deploy;
pub mod identity;
pub mod upload;

pub use contract_id::{extract_contract_id, extract_wasm_hash, is_valid_wasm_hash};
pub use deploy::{deploy, is_available};
pub use identity::{ensure_identity, DEFAULT_IDENTITY};
pub use upload::{deploy_by_hash, upload_wasm};
