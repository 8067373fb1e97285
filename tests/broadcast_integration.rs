//! Cross-component integration tests
//!
//! These tests verify interactions between the notification store, audience
//! resolver, broadcast engine, inbox transport, and scheduler without
//! requiring PostgreSQL or server startup.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::broadcast;
use tokio_test::assert_ok;

use waqf_notification_service::config::{BroadcastConfig, InboxConfig, SchedulerConfig};
use waqf_notification_service::delivery::{InboxStore, InboxTransport};
use waqf_notification_service::directory::{MemoryDirectory, RoleFilter};
use waqf_notification_service::error::AppError;
use waqf_notification_service::notification::{
    BroadcastEngine, CreateNotificationRequest, ListFilter, MemoryNotificationStore,
    NotificationStatus, NotificationStore, NotificationType, Page, TargetAudience,
};
use waqf_notification_service::tasks::ScheduledSendTask;

/// Create a full test environment with all components
fn create_full_test_environment() -> TestEnvironment {
    let store: Arc<MemoryNotificationStore> = Arc::new(MemoryNotificationStore::new());
    let directory = Arc::new(MemoryDirectory::new());
    let inbox = Arc::new(InboxStore::new(InboxConfig {
        max_entries_per_account: 100,
    }));
    let transport = Arc::new(InboxTransport::new(inbox.clone()));

    let engine = Arc::new(BroadcastEngine::new(
        store.clone(),
        directory.clone(),
        transport,
        BroadcastConfig::default(),
    ));

    TestEnvironment {
        store,
        directory,
        inbox,
        engine,
    }
}

struct TestEnvironment {
    store: Arc<MemoryNotificationStore>,
    directory: Arc<MemoryDirectory>,
    inbox: Arc<InboxStore>,
    engine: Arc<BroadcastEngine>,
}

impl TestEnvironment {
    fn seed_accounts(&self, admins: usize, users: usize) {
        for i in 0..admins {
            self.directory.register(format!("admin-{}", i), RoleFilter::Admin);
        }
        for i in 0..users {
            self.directory.register(format!("user-{}", i), RoleFilter::User);
        }
    }

    fn scheduler(&self) -> ScheduledSendTask {
        let (_tx, rx) = broadcast::channel(1);
        ScheduledSendTask::new(
            SchedulerConfig::default(),
            self.store.clone(),
            self.engine.clone(),
            rx,
        )
    }
}

fn announcement(title: &str, audience: TargetAudience) -> CreateNotificationRequest {
    CreateNotificationRequest {
        title: title.to_string(),
        content: "Registry records have been updated.".to_string(),
        kind: NotificationType::Announcement,
        target_audience: audience,
        target_ids: None,
        scheduled_for: None,
    }
}

// =============================================================================
// Create → Send → Query
// =============================================================================

#[tokio::test]
async fn test_full_broadcast_round() {
    let env = create_full_test_environment();
    env.seed_accounts(2, 3);

    let created = assert_ok!(
        env.store
            .create(announcement("Quarterly update", TargetAudience::All), "admin-0")
            .await
    );
    assert_eq!(created.status, NotificationStatus::Draft);

    let outcome = assert_ok!(env.engine.send(created.id, None).await);
    assert_eq!(outcome.sent_count, 5);
    assert_eq!(outcome.failed, 0);

    // The store reflects the final state with an accurate count
    let page = assert_ok!(
        env.store
            .list(
                &ListFilter {
                    kind: None,
                    status: Some(NotificationStatus::Sent),
                },
                &Page::new(1, 50),
            )
            .await
    );
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].sent_count, 5);

    // Every account received the notice exactly once
    for account in ["admin-0", "admin-1", "user-0", "user-1", "user-2"] {
        let entries = env.inbox.list(account);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].title, "Quarterly update");
        assert_eq!(entries[0].notification_id, created.id);
    }
}

#[tokio::test]
async fn test_send_is_at_most_once_across_components() {
    let env = create_full_test_environment();
    env.seed_accounts(1, 0);

    let created = assert_ok!(
        env.store
            .create(announcement("Once only", TargetAudience::Admins), "admin-0")
            .await
    );

    assert_ok!(env.engine.send(created.id, None).await);

    let second = env.engine.send(created.id, None).await;
    assert!(matches!(second, Err(AppError::InvalidState(_))));

    // Exactly one inbox entry despite the second attempt
    assert_eq!(env.inbox.list("admin-0").len(), 1);
    assert_eq!(env.store.get(created.id).await.unwrap().sent_count, 1);
}

#[tokio::test]
async fn test_resolution_failure_is_visible_but_harmless() {
    let env = create_full_test_environment();
    // No admins registered
    env.seed_accounts(0, 2);

    let created = assert_ok!(
        env.store
            .create(announcement("Admins only", TargetAudience::Admins), "admin-0")
            .await
    );

    let result = env.engine.send(created.id, None).await;
    assert!(matches!(result, Err(AppError::Resolution(_))));

    // Status unchanged, nothing delivered anywhere
    let unchanged = env.store.get(created.id).await.unwrap();
    assert_eq!(unchanged.status, NotificationStatus::Draft);
    assert_eq!(env.inbox.total_entries(), 0);
}

// =============================================================================
// Lifecycle: cancel, delete
// =============================================================================

#[tokio::test]
async fn test_cancel_blocks_later_send() {
    let env = create_full_test_environment();
    env.seed_accounts(1, 1);

    let created = assert_ok!(
        env.store
            .create(announcement("Changed our minds", TargetAudience::All), "admin-0")
            .await
    );

    let cancelled = assert_ok!(env.store.cancel(created.id).await);
    assert_eq!(cancelled.status, NotificationStatus::Cancelled);

    let result = env.engine.send(created.id, None).await;
    assert!(matches!(result, Err(AppError::InvalidState(_))));
    assert_eq!(env.inbox.total_entries(), 0);
}

#[tokio::test]
async fn test_delete_removes_from_listings() {
    let env = create_full_test_environment();

    let keep = assert_ok!(
        env.store
            .create(announcement("Keep", TargetAudience::All), "admin-0")
            .await
    );
    let remove = assert_ok!(
        env.store
            .create(announcement("Remove", TargetAudience::All), "admin-0")
            .await
    );

    assert_ok!(env.store.delete(remove.id).await);

    let page = assert_ok!(env.store.list(&ListFilter::default(), &Page::new(1, 50)).await);
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].id, keep.id);

    // Deleting again reports the missing record
    assert!(matches!(
        env.store.delete(remove.id).await,
        Err(waqf_notification_service::notification::StoreError::NotFound(_))
    ));
}

// =============================================================================
// Scheduling
// =============================================================================

#[tokio::test]
async fn test_scheduler_sends_due_notification() {
    let env = create_full_test_environment();
    env.seed_accounts(0, 2);

    let mut request = announcement("Maintenance tonight", TargetAudience::Users);
    request.kind = NotificationType::Maintenance;
    request.scheduled_for = Some(Utc::now() - chrono::Duration::minutes(1));

    let created = assert_ok!(env.store.create(request, "admin-0").await);
    assert_eq!(created.status, NotificationStatus::Scheduled);

    let scheduler = env.scheduler();
    assert_eq!(scheduler.poll_due().await, 1);

    let sent = env.store.get(created.id).await.unwrap();
    assert_eq!(sent.status, NotificationStatus::Sent);
    assert_eq!(sent.sent_count, 2);

    // A second poll finds nothing left to do
    assert_eq!(scheduler.poll_due().await, 0);
}

#[tokio::test]
async fn test_schedule_then_cancel_before_due() {
    let env = create_full_test_environment();
    env.seed_accounts(0, 1);

    let created = assert_ok!(
        env.store
            .create(announcement("Never mind", TargetAudience::Users), "admin-0")
            .await
    );

    assert_ok!(
        env.store
            .schedule(created.id, Utc::now() - chrono::Duration::seconds(30))
            .await
    );
    assert_ok!(env.store.cancel(created.id).await);

    let scheduler = env.scheduler();
    assert_eq!(scheduler.poll_due().await, 0);
    assert_eq!(env.inbox.total_entries(), 0);
}

// =============================================================================
// Inbox read tracking
// =============================================================================

#[tokio::test]
async fn test_inbox_read_tracking_after_broadcast() {
    let env = create_full_test_environment();
    env.seed_accounts(0, 1);

    let created = assert_ok!(
        env.store
            .create(announcement("Please read", TargetAudience::Users), "admin-0")
            .await
    );
    assert_ok!(env.engine.send(created.id, None).await);

    assert_eq!(env.inbox.unread_count("user-0"), 1);

    let entry_id = env.inbox.list("user-0")[0].id;
    assert!(env.inbox.mark_read("user-0", entry_id));
    assert_eq!(env.inbox.unread_count("user-0"), 0);

    // Another account cannot mark this entry
    assert!(!env.inbox.mark_read("user-1", entry_id));
}

// =============================================================================
// Filtered listings
// =============================================================================

#[tokio::test]
async fn test_type_and_status_filters_compose() {
    let env = create_full_test_environment();
    env.seed_accounts(1, 0);

    let mut alert = announcement("Security alert", TargetAudience::Admins);
    alert.kind = NotificationType::Alert;
    let alert = assert_ok!(env.store.create(alert, "admin-0").await);
    assert_ok!(env.engine.send(alert.id, None).await);

    let mut draft_alert = announcement("Draft alert", TargetAudience::Admins);
    draft_alert.kind = NotificationType::Alert;
    assert_ok!(env.store.create(draft_alert, "admin-0").await);

    assert_ok!(
        env.store
            .create(announcement("Plain news", TargetAudience::All), "admin-0")
            .await
    );

    let sent_alerts = assert_ok!(
        env.store
            .list(
                &ListFilter {
                    kind: Some(NotificationType::Alert),
                    status: Some(NotificationStatus::Sent),
                },
                &Page::new(1, 50),
            )
            .await
    );
    assert_eq!(sent_alerts.total, 1);
    assert_eq!(sent_alerts.items[0].id, alert.id);

    let all = assert_ok!(env.store.list(&ListFilter::default(), &Page::new(1, 50)).await);
    assert_eq!(all.total, 3);
}
