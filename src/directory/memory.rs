//! In-memory account directory.

use async_trait::async_trait;
use dashmap::DashMap;

use super::{AccountDirectory, AccountId, DirectoryError, RoleFilter};

/// In-memory directory keyed by account ID.
///
/// Used in development mode and by tests; registration is explicit rather
/// than synced from anywhere.
pub struct MemoryDirectory {
    accounts: DashMap<AccountId, RoleFilter>,
}

impl Default for MemoryDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self {
            accounts: DashMap::new(),
        }
    }

    /// Register an account with a role, replacing any previous role.
    pub fn register(&self, account_id: impl Into<AccountId>, role: RoleFilter) {
        self.accounts.insert(account_id.into(), role);
    }

    /// Remove an account. Returns true if it existed.
    pub fn remove(&self, account_id: &str) -> bool {
        self.accounts.remove(account_id).is_some()
    }

    /// Number of registered accounts.
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

#[async_trait]
impl AccountDirectory for MemoryDirectory {
    async fn list_accounts(
        &self,
        role: Option<RoleFilter>,
    ) -> Result<Vec<AccountId>, DirectoryError> {
        let mut ids: Vec<AccountId> = self
            .accounts
            .iter()
            .filter(|entry| role.map_or(true, |r| *entry.value() == r))
            .map(|entry| entry.key().clone())
            .collect();

        // DashMap iteration order is arbitrary; keep lookups deterministic
        ids.sort();

        Ok(ids)
    }
}
