//! Queue payload shapes (spec §6 "Queue payloads").

use serde::{Deserialize, Serialize};
use wasmforge_core::job::Network;
use wasmforge_core::project::SourceFile;
use wasmforge_core::ResourceId;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompilePayload {
    pub project_id: ResourceId,
    pub files: Vec<SourceFile>,
    pub job_id: ResourceId,
    pub user_id: ResourceId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployPayload {
    pub project_id: ResourceId,
    pub wasm_base64: String,
    pub network: Network,
    pub job_id: ResourceId,
    pub user_id: ResourceId,
    #[serde(default)]
    pub wallet_info: Option<serde_json::Value>,
}
