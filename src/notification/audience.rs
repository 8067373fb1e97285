//! Audience resolution.
//!
//! A target-audience selector is turned into concrete account IDs at send
//! time, never at creation time, so membership always reflects current roles.

use std::collections::HashSet;
use std::sync::Arc;

use thiserror::Error;

use crate::directory::{AccountDirectory, AccountId, DirectoryError, RoleFilter};
use crate::error::AppError;

use super::types::TargetAudience;

/// Errors from audience resolution.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The selector is mandatory-nonempty and resolved to nothing
    #[error("Audience {0:?} resolved to no recipients")]
    Empty(TargetAudience),

    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

impl From<ResolveError> for AppError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::Empty(audience) => AppError::Resolution(format!(
                "audience \"{}\" resolved to no recipients",
                audience.as_str()
            )),
            ResolveError::Directory(DirectoryError::Query(e)) => AppError::Database(e),
            ResolveError::Directory(e) => AppError::Internal(e.to_string()),
        }
    }
}

/// Maps audience selectors onto the account directory.
pub struct AudienceResolver {
    directory: Arc<dyn AccountDirectory>,
}

impl AudienceResolver {
    pub fn new(directory: Arc<dyn AccountDirectory>) -> Self {
        Self { directory }
    }

    /// Resolve a selector to a deduplicated recipient list.
    ///
    /// For `specific`, an explicit send-time list takes precedence over the
    /// recipients persisted on the notification. `all` may resolve empty (the
    /// send completes with a zero count); the other selectors fail instead.
    pub async fn resolve(
        &self,
        audience: TargetAudience,
        explicit: Option<&[AccountId]>,
        persisted: Option<&[AccountId]>,
    ) -> Result<Vec<AccountId>, ResolveError> {
        let recipients = match audience {
            TargetAudience::All => self.directory.list_accounts(None).await?,
            TargetAudience::Admins => {
                self.directory.list_accounts(Some(RoleFilter::Admin)).await?
            }
            TargetAudience::Users => {
                self.directory.list_accounts(Some(RoleFilter::User)).await?
            }
            TargetAudience::Specific => explicit
                .filter(|ids| !ids.is_empty())
                .or_else(|| persisted.filter(|ids| !ids.is_empty()))
                .map(|ids| ids.to_vec())
                .unwrap_or_default(),
        };

        let recipients = dedup(recipients);

        if recipients.is_empty() && audience != TargetAudience::All {
            return Err(ResolveError::Empty(audience));
        }

        Ok(recipients)
    }
}

/// Drop repeated IDs, first occurrence wins. Each recipient is attempted
/// exactly once per send.
fn dedup(recipients: Vec<AccountId>) -> Vec<AccountId> {
    let mut seen = HashSet::with_capacity(recipients.len());
    recipients
        .into_iter()
        .filter(|id| seen.insert(id.clone()))
        .collect()
}
