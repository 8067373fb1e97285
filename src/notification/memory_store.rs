//! In-memory notification store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use super::store::NotificationStore;
use super::types::{
    CreateNotificationRequest, ListFilter, Notification, NotificationPage, NotificationStatus,
    Page, StoreError, StoreResult,
};

/// DashMap-backed store.
///
/// Status transitions go through `transition`, which mutates under the
/// per-entry lock; a concurrent `mark_sent` on the same id therefore
/// observes the first transition's result and fails the state check.
pub struct MemoryNotificationStore {
    records: DashMap<Uuid, Notification>,
}

impl Default for MemoryNotificationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryNotificationStore {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
        }
    }

    /// Apply `apply` to the record if its status is still `draft` or
    /// `scheduled`, all under the entry lock.
    fn transition<F>(&self, id: Uuid, apply: F) -> StoreResult<Notification>
    where
        F: FnOnce(&mut Notification),
    {
        let mut entry = self.records.get_mut(&id).ok_or(StoreError::NotFound(id))?;

        if !entry.status.is_sendable() {
            return Err(StoreError::InvalidState {
                id,
                status: entry.status,
            });
        }

        apply(entry.value_mut());
        Ok(entry.clone())
    }
}

#[async_trait]
impl NotificationStore for MemoryNotificationStore {
    async fn create(
        &self,
        request: CreateNotificationRequest,
        created_by: &str,
    ) -> StoreResult<Notification> {
        let notification = Notification::from_request(request, created_by)?;
        self.records.insert(notification.id, notification.clone());

        Ok(notification)
    }

    async fn get(&self, id: Uuid) -> StoreResult<Notification> {
        self.records
            .get(&id)
            .map(|entry| entry.clone())
            .ok_or(StoreError::NotFound(id))
    }

    async fn list(&self, filter: &ListFilter, page: &Page) -> StoreResult<NotificationPage> {
        let mut matched: Vec<Notification> = self
            .records
            .iter()
            .filter(|entry| entry.matches(filter))
            .map(|entry| entry.clone())
            .collect();

        // Most recent first; id breaks ties so paging is stable
        matched.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });

        let total = matched.len() as u64;
        let items = matched
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit as usize)
            .collect();

        Ok(NotificationPage {
            items,
            total,
            page: page.page,
            limit: page.limit,
        })
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        self.records
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound(id))
    }

    async fn mark_sent(&self, id: Uuid, sent_count: u64) -> StoreResult<Notification> {
        self.transition(id, |record| {
            record.status = NotificationStatus::Sent;
            record.sent_count = sent_count;
            record.sent_at = Some(Utc::now());
        })
    }

    async fn schedule(&self, id: Uuid, at: DateTime<Utc>) -> StoreResult<Notification> {
        self.transition(id, |record| {
            record.status = NotificationStatus::Scheduled;
            record.scheduled_for = Some(at);
        })
    }

    async fn cancel(&self, id: Uuid) -> StoreResult<Notification> {
        self.transition(id, |record| {
            record.status = NotificationStatus::Cancelled;
        })
    }

    async fn due_scheduled(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> StoreResult<Vec<Notification>> {
        let mut due: Vec<Notification> = self
            .records
            .iter()
            .filter(|entry| {
                entry.status == NotificationStatus::Scheduled
                    && entry.scheduled_for.map_or(false, |at| at <= now)
            })
            .map(|entry| entry.clone())
            .collect();

        due.sort_by_key(|n| n.scheduled_for);
        due.truncate(limit);

        Ok(due)
    }

    async fn count(&self) -> StoreResult<u64> {
        Ok(self.records.len() as u64)
    }
}
