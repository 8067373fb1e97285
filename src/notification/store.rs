//! Backend trait for notification storage.
//!
//! Two implementations exist: `MemoryNotificationStore` (default) and
//! `PostgresNotificationStore`. Both enforce the same state machine: `sent`
//! and `cancelled` are terminal, and `mark_sent` is a compare-and-set so a
//! notification is finalized at most once.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::types::{
    CreateNotificationRequest, ListFilter, Notification, NotificationPage, Page, StoreResult,
};

/// Durable record keeping for notifications.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Persist a new record. Status is `draft`, or `scheduled` when the
    /// request carries `scheduled_for`; `sent_count` starts at zero.
    async fn create(
        &self,
        request: CreateNotificationRequest,
        created_by: &str,
    ) -> StoreResult<Notification>;

    /// Fetch one record.
    async fn get(&self, id: Uuid) -> StoreResult<Notification>;

    /// One page of records matching the filter, `created_at` descending.
    /// `total` counts every match, not just the returned page.
    async fn list(&self, filter: &ListFilter, page: &Page) -> StoreResult<NotificationPage>;

    /// Hard delete. Fails with `NotFound` for unknown ids.
    async fn delete(&self, id: Uuid) -> StoreResult<()>;

    /// Finalize a send: status becomes `sent`, `sent_count` and `sent_at`
    /// are stamped. Compare-and-set: fails with `InvalidState` unless the
    /// current status is `draft` or `scheduled`.
    async fn mark_sent(&self, id: Uuid, sent_count: u64) -> StoreResult<Notification>;

    /// Move a `draft` or `scheduled` record to `scheduled` at the given time.
    async fn schedule(&self, id: Uuid, at: DateTime<Utc>) -> StoreResult<Notification>;

    /// Move a `draft` or `scheduled` record to `cancelled`.
    async fn cancel(&self, id: Uuid) -> StoreResult<Notification>;

    /// Scheduled records due at or before `now`, oldest first.
    async fn due_scheduled(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> StoreResult<Vec<Notification>>;

    /// Total number of stored records.
    async fn count(&self) -> StoreResult<u64>;
}
