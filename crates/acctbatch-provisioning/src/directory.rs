//! Directory Inspector
//!
//! Builds the per-run views of the organization directory that batch
//! validation checks rows against: the OU snapshot (id -> name) and the
//! index of existing accounts.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use tracing::{debug, info, instrument};

use acctbatch_core::{DirectoryAccount, DirectoryError, DirectoryResult, OrganizationDirectory};

/// Marker that starts the optional id suffix of an `OrgUnit` value.
const OU_ID_SUFFIX: &str = "(ou-";

/// Transient id -> display name map of every OU under the root.
#[derive(Debug, Clone, Default)]
pub struct OuSnapshot {
    units: HashMap<String, String>,
}

impl OuSnapshot {
    /// Build a snapshot from `(id, name)` pairs.
    pub fn from_units<I, K, V>(units: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            units: units
                .into_iter()
                .map(|(id, name)| (id.into(), name.into()))
                .collect(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Whether an `OrgUnit` value names an OU in the snapshot.
    ///
    /// Accepts `"Name"` and `"Name (ou-xxxx)"`; the suffix is stripped
    /// before the name lookup.
    #[must_use]
    pub fn contains_org_unit(&self, org_unit: &str) -> bool {
        let full = org_unit.trim();
        let name = strip_ou_suffix(org_unit);
        self.units.values().any(|n| n == name || n == full)
    }
}

/// Strip an optional trailing `"(ou-…)"` suffix and surrounding whitespace.
#[must_use]
pub fn strip_ou_suffix(org_unit: &str) -> &str {
    org_unit
        .split(OU_ID_SUFFIX)
        .next()
        .unwrap_or(org_unit)
        .trim()
}

/// Existing accounts of the organization.
#[derive(Debug, Clone, Default)]
pub struct AccountIndex {
    accounts: Vec<DirectoryAccount>,
}

impl AccountIndex {
    #[must_use]
    pub fn new(accounts: Vec<DirectoryAccount>) -> Self {
        Self { accounts }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Whether any account uses `email`.
    #[must_use]
    pub fn email_in_use(&self, email: &str) -> bool {
        self.accounts.iter().any(|a| a.email == email)
    }

    /// Whether a single account has both `email` and `name`.
    #[must_use]
    pub fn matches_existing(&self, email: &str, name: &str) -> bool {
        self.accounts
            .iter()
            .any(|a| a.email == email && a.name == name)
    }
}

/// Read-only view of the organization directory.
#[derive(Clone)]
pub struct DirectoryInspector {
    directory: Arc<dyn OrganizationDirectory>,
}

impl DirectoryInspector {
    pub fn new(directory: Arc<dyn OrganizationDirectory>) -> Self {
        Self { directory }
    }

    /// Id of the organization root.
    pub async fn root_id(&self) -> DirectoryResult<String> {
        self.directory
            .list_roots()
            .await?
            .into_iter()
            .next()
            .ok_or(DirectoryError::RootNotFound)
    }

    /// Walk the OU tree breadth-first from the root, to any depth.
    ///
    /// Each parent is listed at most once, so a cyclic or repeated listing
    /// cannot loop.
    #[instrument(skip(self))]
    pub async fn ou_snapshot(&self) -> DirectoryResult<OuSnapshot> {
        let root_id = self.root_id().await?;

        let mut units = HashMap::new();
        let mut visited: HashSet<String> = HashSet::from([root_id.clone()]);
        let mut queue = VecDeque::from([(root_id, 0usize)]);
        let mut max_depth = 0;

        while let Some((parent_id, depth)) = queue.pop_front() {
            let children = self.directory.list_child_units(&parent_id).await?;
            debug!(parent_id = %parent_id, depth, children = children.len(), "Listed child OUs");

            for child in children {
                if !visited.insert(child.id.clone()) {
                    continue;
                }
                max_depth = max_depth.max(depth + 1);
                queue.push_back((child.id.clone(), depth + 1));
                units.insert(child.id, child.name);
            }
        }

        info!(ou_count = units.len(), max_depth, "Built OU snapshot");
        Ok(OuSnapshot { units })
    }

    /// All accounts currently in the organization.
    #[instrument(skip(self))]
    pub async fn account_index(&self) -> DirectoryResult<AccountIndex> {
        let accounts = self.directory.list_accounts().await?;
        info!(account_count = accounts.len(), "Loaded existing accounts");
        Ok(AccountIndex::new(accounts))
    }
}
