//! Account directory collaborator.
//!
//! The broadcast subsystem never owns account records; it asks the directory
//! for the concrete account IDs behind a role filter at send time, so audience
//! membership always reflects current roles.
//!
//! Use `create_account_directory()` to create the appropriate backend based on
//! configuration.

mod memory;
mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;

pub use memory::MemoryDirectory;
pub use postgres::PostgresDirectory;

/// Opaque account identifier handed out by the directory.
pub type AccountId = String;

/// Role filter for directory lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleFilter {
    /// Accounts with the administrator role
    Admin,
    /// Accounts with a non-administrator role
    User,
}

/// Errors that can occur during directory lookups.
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("Directory query failed: {0}")]
    Query(#[from] sqlx::Error),

    #[error("Directory unavailable: {0}")]
    Unavailable(String),
}

/// Read-only view of registered accounts.
#[async_trait]
pub trait AccountDirectory: Send + Sync {
    /// List account IDs, optionally restricted to a role.
    /// `None` means every registered account.
    async fn list_accounts(
        &self,
        role: Option<RoleFilter>,
    ) -> Result<Vec<AccountId>, DirectoryError>;
}

/// Create an account directory backend based on configuration.
///
/// Returns a `PostgresDirectory` over the platform's `users` table when a
/// pool is provided and the store backend is `"postgres"`, otherwise a
/// `MemoryDirectory`.
pub fn create_account_directory(
    backend: &str,
    pool: Option<PgPool>,
) -> Arc<dyn AccountDirectory> {
    match (backend, pool) {
        ("postgres", Some(pool)) => {
            tracing::info!(backend = "postgres", "Creating PostgreSQL account directory");
            Arc::new(PostgresDirectory::new(pool))
        }
        ("postgres", None) => {
            tracing::warn!(
                "PostgreSQL directory requested but no pool provided, falling back to memory"
            );
            Arc::new(MemoryDirectory::new())
        }
        _ => {
            tracing::info!(backend = "memory", "Creating memory account directory");
            Arc::new(MemoryDirectory::new())
        }
    }
}
