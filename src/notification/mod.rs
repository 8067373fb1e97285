//! Notification records, audience resolution, and broadcasting.
//!
//! # Store Backend Architecture
//!
//! The notification store uses a backend abstraction to support different
//! storage implementations:
//!
//! - `MemoryNotificationStore`: In-memory storage using DashMap (default)
//! - `PostgresNotificationStore`: Persistent storage using PostgreSQL
//!
//! Use `create_notification_store()` to create the appropriate backend based
//! on configuration.

pub mod audience;
pub mod broadcast;
pub mod memory_store;
pub mod postgres_store;
mod store;
mod types;

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::DatabaseConfig;

pub use audience::{AudienceResolver, ResolveError};
pub use broadcast::{BroadcastEngine, BroadcastStats, BroadcastStatsSnapshot, SendOutcome};
pub use memory_store::MemoryNotificationStore;
pub use postgres_store::PostgresNotificationStore;
pub use store::NotificationStore;
pub use types::{
    CreateNotificationRequest, ListFilter, Notification, NotificationPage, NotificationStatus,
    NotificationType, Page, StoreError, StoreResult, TargetAudience, MAX_TITLE_LEN,
};

/// Create a notification store backend based on configuration.
///
/// Returns the appropriate backend implementation based on the `backend`
/// setting:
/// - `"postgres"`: Returns a `PostgresNotificationStore` if a pool is provided
/// - `"memory"` (default): Returns a `MemoryNotificationStore`
pub fn create_notification_store(
    settings: &DatabaseConfig,
    pool: Option<PgPool>,
) -> Arc<dyn NotificationStore> {
    match settings.backend.as_str() {
        "postgres" => {
            if let Some(pool) = pool {
                tracing::info!(backend = "postgres", "Creating PostgreSQL notification store");
                Arc::new(PostgresNotificationStore::new(pool))
            } else {
                tracing::warn!(
                    "PostgreSQL store requested but no pool provided, falling back to memory"
                );
                Arc::new(MemoryNotificationStore::new())
            }
        }
        _ => {
            tracing::info!(backend = "memory", "Creating memory notification store");
            Arc::new(MemoryNotificationStore::new())
        }
    }
}
