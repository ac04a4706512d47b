//! Organization directory capability.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::DirectoryResult;

/// An organizational unit as listed under a parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationalUnit {
    pub id: String,
    pub name: String,
}

/// An account that already exists in the organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryAccount {
    pub id: String,
    pub name: String,
    pub email: String,
}

/// Read-only queries against the organization directory.
///
/// Implementations return every page of a listing; an `Ok` empty vector
/// means the directory has no such entries.
#[async_trait]
pub trait OrganizationDirectory: Send + Sync {
    /// List root ids of the organization.
    async fn list_roots(&self) -> DirectoryResult<Vec<String>>;

    /// List organizational units directly under `parent_id`.
    async fn list_child_units(&self, parent_id: &str) -> DirectoryResult<Vec<OrganizationalUnit>>;

    /// List every account in the organization.
    async fn list_accounts(&self) -> DirectoryResult<Vec<DirectoryAccount>>;
}
