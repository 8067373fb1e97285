//! Background task that sends scheduled notifications when they become due.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::broadcast;

use crate::config::SchedulerConfig;
use crate::notification::{BroadcastEngine, NotificationStore};

pub struct ScheduledSendTask {
    config: SchedulerConfig,
    store: Arc<dyn NotificationStore>,
    engine: Arc<BroadcastEngine>,
    shutdown: broadcast::Receiver<()>,
}

impl ScheduledSendTask {
    pub fn new(
        config: SchedulerConfig,
        store: Arc<dyn NotificationStore>,
        engine: Arc<BroadcastEngine>,
        shutdown: broadcast::Receiver<()>,
    ) -> Self {
        Self {
            config,
            store,
            engine,
            shutdown,
        }
    }

    /// Run the polling loop until shutdown.
    pub async fn run(mut self) {
        if !self.config.enabled {
            tracing::info!("Scheduled-send task disabled");
            return;
        }

        let mut poll_timer =
            tokio::time::interval(Duration::from_secs(self.config.poll_interval_seconds.max(1)));

        // Skip immediate first tick
        poll_timer.tick().await;

        tracing::info!(
            poll_interval_secs = self.config.poll_interval_seconds,
            batch_size = self.config.batch_size,
            "Scheduled-send task started"
        );

        loop {
            tokio::select! {
                _ = self.shutdown.recv() => {
                    tracing::info!("Scheduled-send task received shutdown signal");
                    break;
                }
                _ = poll_timer.tick() => {
                    self.poll_due().await;
                }
            }
        }

        tracing::info!("Scheduled-send task stopped");
    }

    /// Send every due scheduled notification once. Returns the number of
    /// notifications that reached the `sent` state.
    pub async fn poll_due(&self) -> usize {
        let due = match self
            .store
            .due_scheduled(Utc::now(), self.config.batch_size)
            .await
        {
            Ok(due) => due,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to query due notifications");
                return 0;
            }
        };

        if due.is_empty() {
            return 0;
        }

        tracing::debug!(due = due.len(), "Sending due scheduled notifications");

        let mut sent = 0;
        for notification in due {
            match self.engine.send(notification.id, None).await {
                Ok(outcome) => {
                    sent += 1;
                    tracing::info!(
                        notification_id = %notification.id,
                        sent_count = outcome.sent_count,
                        "Scheduled notification sent"
                    );
                }
                Err(e) => {
                    // An InvalidState here just means someone beat us to it;
                    // a resolution failure leaves the record scheduled and it
                    // will be retried on the next poll.
                    tracing::warn!(
                        notification_id = %notification.id,
                        error = %e,
                        "Scheduled send failed"
                    );
                }
            }
        }

        sent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BroadcastConfig, InboxConfig};
    use crate::delivery::{InboxStore, InboxTransport};
    use crate::directory::{MemoryDirectory, RoleFilter};
    use crate::notification::{
        CreateNotificationRequest, MemoryNotificationStore, NotificationStatus, NotificationType,
        TargetAudience,
    };

    fn scheduled_request(offset_minutes: i64) -> CreateNotificationRequest {
        CreateNotificationRequest {
            title: "Scheduled notice".to_string(),
            content: "content".to_string(),
            kind: NotificationType::Update,
            target_audience: TargetAudience::All,
            target_ids: None,
            scheduled_for: Some(Utc::now() + chrono::Duration::minutes(offset_minutes)),
        }
    }

    fn task(
        store: Arc<MemoryNotificationStore>,
        directory: Arc<MemoryDirectory>,
    ) -> ScheduledSendTask {
        let inbox = Arc::new(InboxStore::new(InboxConfig {
            max_entries_per_account: 10,
        }));
        let engine = Arc::new(BroadcastEngine::new(
            store.clone(),
            directory,
            Arc::new(InboxTransport::new(inbox)),
            BroadcastConfig::default(),
        ));

        let (_tx, rx) = broadcast::channel(1);
        ScheduledSendTask::new(SchedulerConfig::default(), store, engine, rx)
    }

    #[tokio::test]
    async fn test_poll_sends_only_due_notifications() {
        let store = Arc::new(MemoryNotificationStore::new());
        let directory = Arc::new(MemoryDirectory::new());
        directory.register("user-1", RoleFilter::User);

        let due = store.create(scheduled_request(-5), "admin-1").await.unwrap();
        let future = store.create(scheduled_request(60), "admin-1").await.unwrap();

        let task = task(store.clone(), directory);
        let sent = task.poll_due().await;
        assert_eq!(sent, 1);

        assert_eq!(
            store.get(due.id).await.unwrap().status,
            NotificationStatus::Sent
        );
        assert_eq!(
            store.get(future.id).await.unwrap().status,
            NotificationStatus::Scheduled
        );
    }

    #[tokio::test]
    async fn test_poll_with_nothing_due() {
        let store = Arc::new(MemoryNotificationStore::new());
        let directory = Arc::new(MemoryDirectory::new());

        let task = task(store, directory);
        assert_eq!(task.poll_due().await, 0);
    }

    #[tokio::test]
    async fn test_failed_resolution_leaves_notification_scheduled() {
        let store = Arc::new(MemoryNotificationStore::new());
        // Empty directory: a mandatory audience cannot resolve
        let directory = Arc::new(MemoryDirectory::new());

        let mut request = scheduled_request(-1);
        request.target_audience = TargetAudience::Admins;
        let created = store.create(request, "admin-1").await.unwrap();

        let task = task(store.clone(), directory);
        assert_eq!(task.poll_due().await, 0);

        assert_eq!(
            store.get(created.id).await.unwrap().status,
            NotificationStatus::Scheduled
        );
    }
}
