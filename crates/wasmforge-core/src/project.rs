//! `ProjectRef`: a read-only snapshot of a project's ownership and source
//! bundle, resolved by an external project service the core only consumes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::id::ResourceId;
use crate::Result;

/// A single source file submitted for compilation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceFile {
    pub name: String,
    pub content: String,
}

/// Read-only reference to a project, consumed (not owned) by the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectRef {
    pub id: ResourceId,
    pub owner_id: ResourceId,
}

/// External collaborator: resolves project ownership (project CRUD is
/// out of scope, §1).
#[async_trait]
pub trait ProjectDirectory: Send + Sync {
    async fn get_project(&self, project_id: ResourceId) -> Result<ProjectRef>;
}
