//! In-app inbox delivery.
//!
//! Each account has a bounded inbox of delivered notices with read tracking.
//! When an inbox is full the oldest entry is dropped, so a long-offline
//! account cannot grow memory without bound.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use uuid::Uuid;

use crate::config::InboxConfig;
use crate::directory::AccountId;

use super::{DeliveryError, DeliveryTransport, Notice};

/// A notice delivered to one account's inbox.
#[derive(Debug, Clone, Serialize)]
pub struct InboxEntry {
    /// Unique entry ID (distinct from the notification ID)
    pub id: Uuid,
    pub notification_id: Uuid,
    pub title: String,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: crate::notification::NotificationType,
    pub is_read: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_at: Option<DateTime<Utc>>,
    pub delivered_at: DateTime<Utc>,
}

impl InboxEntry {
    fn from_notice(notice: &Notice) -> Self {
        Self {
            id: Uuid::new_v4(),
            notification_id: notice.notification_id,
            title: notice.title.clone(),
            content: notice.content.clone(),
            kind: notice.kind,
            is_read: false,
            read_at: None,
            delivered_at: Utc::now(),
        }
    }
}

/// Per-account bounded inboxes.
pub struct InboxStore {
    inboxes: DashMap<AccountId, VecDeque<InboxEntry>>,
    max_entries_per_account: usize,
}

impl InboxStore {
    pub fn new(config: InboxConfig) -> Self {
        Self {
            inboxes: DashMap::new(),
            max_entries_per_account: config.max_entries_per_account.max(1),
        }
    }

    /// Append an entry to an account's inbox, evicting the oldest at capacity.
    pub fn push(&self, account_id: &AccountId, entry: InboxEntry) {
        let mut inbox = self.inboxes.entry(account_id.clone()).or_default();

        if inbox.len() >= self.max_entries_per_account {
            if let Some(dropped) = inbox.pop_front() {
                tracing::debug!(
                    account_id = %account_id,
                    entry_id = %dropped.id,
                    "Inbox full, dropped oldest entry"
                );
            }
        }

        inbox.push_back(entry);
    }

    /// List an account's entries, newest first.
    pub fn list(&self, account_id: &str) -> Vec<InboxEntry> {
        self.inboxes
            .get(account_id)
            .map(|inbox| inbox.iter().rev().cloned().collect())
            .unwrap_or_default()
    }

    /// Mark one entry read. Returns false if the account has no such entry.
    pub fn mark_read(&self, account_id: &str, entry_id: Uuid) -> bool {
        let Some(mut inbox) = self.inboxes.get_mut(account_id) else {
            return false;
        };

        match inbox.iter_mut().find(|e| e.id == entry_id) {
            Some(entry) => {
                if !entry.is_read {
                    entry.is_read = true;
                    entry.read_at = Some(Utc::now());
                }
                true
            }
            None => false,
        }
    }

    /// Unread entries for one account.
    pub fn unread_count(&self, account_id: &str) -> usize {
        self.inboxes
            .get(account_id)
            .map(|inbox| inbox.iter().filter(|e| !e.is_read).count())
            .unwrap_or(0)
    }

    /// Total entries across all accounts.
    pub fn total_entries(&self) -> usize {
        self.inboxes.iter().map(|inbox| inbox.len()).sum()
    }

    /// Number of accounts holding at least one entry.
    pub fn account_count(&self) -> usize {
        self.inboxes.len()
    }
}

/// Delivery transport that appends notices to the in-app inbox.
pub struct InboxTransport {
    store: Arc<InboxStore>,
}

impl InboxTransport {
    pub fn new(store: Arc<InboxStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl DeliveryTransport for InboxTransport {
    async fn deliver(&self, account_id: &AccountId, notice: &Notice) -> Result<(), DeliveryError> {
        self.store.push(account_id, InboxEntry::from_notice(notice));

        tracing::trace!(
            account_id = %account_id,
            notification_id = %notice.notification_id,
            "Notice delivered to inbox"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::NotificationType;

    fn test_store(max: usize) -> InboxStore {
        InboxStore::new(InboxConfig {
            max_entries_per_account: max,
        })
    }

    fn test_notice(title: &str) -> Notice {
        Notice::new(Uuid::new_v4(), title, "content", NotificationType::Announcement)
    }

    #[tokio::test]
    async fn test_deliver_and_list_newest_first() {
        let store = Arc::new(test_store(10));
        let transport = InboxTransport::new(store.clone());
        let account = "user-1".to_string();

        transport.deliver(&account, &test_notice("first")).await.unwrap();
        transport.deliver(&account, &test_notice("second")).await.unwrap();

        let entries = store.list(&account);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].title, "second");
        assert_eq!(entries[1].title, "first");
        assert!(!entries[0].is_read);
    }

    #[test]
    fn test_mark_read() {
        let store = test_store(10);
        let account = "user-1".to_string();

        store.push(&account, InboxEntry::from_notice(&test_notice("hello")));
        let entry_id = store.list(&account)[0].id;

        assert_eq!(store.unread_count(&account), 1);
        assert!(store.mark_read(&account, entry_id));
        assert_eq!(store.unread_count(&account), 0);

        let entry = &store.list(&account)[0];
        assert!(entry.is_read);
        assert!(entry.read_at.is_some());
    }

    #[test]
    fn test_mark_read_unknown_entry() {
        let store = test_store(10);
        assert!(!store.mark_read("nobody", Uuid::new_v4()));

        store.push(&"user-1".to_string(), InboxEntry::from_notice(&test_notice("x")));
        assert!(!store.mark_read("user-1", Uuid::new_v4()));
    }

    #[test]
    fn test_eviction_at_capacity() {
        let store = test_store(3);
        let account = "user-1".to_string();

        for i in 0..5 {
            store.push(&account, InboxEntry::from_notice(&test_notice(&format!("n{}", i))));
        }

        let entries = store.list(&account);
        assert_eq!(entries.len(), 3);
        // Oldest two were evicted
        assert_eq!(entries[2].title, "n2");
        assert_eq!(entries[0].title, "n4");
    }

    #[test]
    fn test_inboxes_are_isolated() {
        let store = test_store(10);
        store.push(&"a".to_string(), InboxEntry::from_notice(&test_notice("for-a")));

        assert_eq!(store.list("a").len(), 1);
        assert!(store.list("b").is_empty());
        assert_eq!(store.total_entries(), 1);
        assert_eq!(store.account_count(), 1);
    }
}
