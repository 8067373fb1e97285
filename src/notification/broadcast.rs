//! Broadcast engine: orchestrates the draft/scheduled → sent transition.
//!
//! A send resolves the audience fresh, fans deliveries out with bounded
//! parallelism, and finalizes the record with a compare-and-set. Callers
//! observe either the pre-send state or the final `sent` state; there is no
//! visible intermediate status.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use futures::stream::{FuturesUnordered, StreamExt};
use serde::Serialize;
use tokio::time::timeout;
use uuid::Uuid;

use crate::config::BroadcastConfig;
use crate::delivery::{DeliveryTransport, Notice};
use crate::directory::{AccountDirectory, AccountId};
use crate::error::AppError;
use crate::metrics::BroadcastMetrics;

use super::audience::AudienceResolver;
use super::store::NotificationStore;
use super::types::StoreError;

/// Result of a completed send.
#[derive(Debug, Clone, Serialize)]
pub struct SendOutcome {
    /// Notification that was sent
    pub notification_id: Uuid,
    /// Recipients the audience resolved to
    pub resolved: u64,
    /// Successful deliveries, recorded on the notification
    pub sent_count: u64,
    /// Recipient-level failures (excluded from `sent_count`)
    pub failed: u64,
}

/// Counters for the broadcast engine
#[derive(Debug, Default)]
pub struct BroadcastStats {
    /// Sends that reached the `sent` state
    pub total_sends: AtomicU64,
    /// Successful recipient deliveries across all sends
    pub total_delivered: AtomicU64,
    /// Failed recipient deliveries across all sends
    pub total_failed: AtomicU64,
    /// Sends rejected by the state machine (terminal status or duplicate)
    pub rejected_sends: AtomicU64,
    /// Sends aborted because a mandatory audience resolved empty
    pub resolution_failures: AtomicU64,
}

impl BroadcastStats {
    pub fn snapshot(&self) -> BroadcastStatsSnapshot {
        BroadcastStatsSnapshot {
            total_sends: self.total_sends.load(Ordering::Relaxed),
            total_delivered: self.total_delivered.load(Ordering::Relaxed),
            total_failed: self.total_failed.load(Ordering::Relaxed),
            rejected_sends: self.rejected_sends.load(Ordering::Relaxed),
            resolution_failures: self.resolution_failures.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of broadcast statistics
#[derive(Debug, Clone, Serialize)]
pub struct BroadcastStatsSnapshot {
    pub total_sends: u64,
    pub total_delivered: u64,
    pub total_failed: u64,
    pub rejected_sends: u64,
    pub resolution_failures: u64,
}

/// Orchestrates notification sends.
pub struct BroadcastEngine {
    store: Arc<dyn NotificationStore>,
    resolver: AudienceResolver,
    transport: Arc<dyn DeliveryTransport>,
    config: BroadcastConfig,
    /// Notifications with a send currently running
    in_flight: DashMap<Uuid, ()>,
    stats: BroadcastStats,
}

/// Removes the in-flight marker when a send finishes, however it finishes.
struct InFlightGuard<'a> {
    engine: &'a BroadcastEngine,
    id: Uuid,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.engine.in_flight.remove(&self.id);
    }
}

impl BroadcastEngine {
    pub fn new(
        store: Arc<dyn NotificationStore>,
        directory: Arc<dyn AccountDirectory>,
        transport: Arc<dyn DeliveryTransport>,
        config: BroadcastConfig,
    ) -> Self {
        Self {
            store,
            resolver: AudienceResolver::new(directory),
            transport,
            config,
            in_flight: DashMap::new(),
            stats: BroadcastStats::default(),
        }
    }

    /// Get engine statistics
    pub fn stats(&self) -> BroadcastStatsSnapshot {
        self.stats.snapshot()
    }

    /// Send a notification now.
    ///
    /// Allowed only from `draft` or `scheduled`. `explicit_recipients`
    /// overrides the persisted recipient list for `specific` targeting.
    /// A delivery failure for an individual recipient never fails the send;
    /// it is excluded from the recorded count.
    #[tracing::instrument(
        name = "broadcast.send",
        skip(self, explicit_recipients),
        fields(notification_id = %id)
    )]
    pub async fn send(
        &self,
        id: Uuid,
        explicit_recipients: Option<Vec<AccountId>>,
    ) -> Result<SendOutcome, AppError> {
        let notification = self.store.get(id).await?;

        if !notification.status.is_sendable() {
            self.stats.rejected_sends.fetch_add(1, Ordering::Relaxed);
            BroadcastMetrics::record_rejected();
            return Err(StoreError::InvalidState {
                id,
                status: notification.status,
            }
            .into());
        }

        let _guard = self.claim(id)?;

        let recipients = match self
            .resolver
            .resolve(
                notification.target_audience,
                explicit_recipients.as_deref(),
                notification.target_ids.as_deref(),
            )
            .await
        {
            Ok(recipients) => recipients,
            Err(e) => {
                self.stats.resolution_failures.fetch_add(1, Ordering::Relaxed);
                BroadcastMetrics::record_resolution_failed();
                tracing::warn!(
                    notification_id = %id,
                    audience = %notification.target_audience.as_str(),
                    error = %e,
                    "Audience resolution failed, notification left untouched"
                );
                return Err(e.into());
            }
        };

        BroadcastMetrics::record_audience(recipients.len());

        let notice = Notice::new(
            id,
            notification.title.clone(),
            notification.content.clone(),
            notification.kind,
        );

        let (delivered, failed) = self.fan_out(&recipients, &notice).await;

        // Finalize; losing a race against cancel surfaces as InvalidState
        let finalized = self.store.mark_sent(id, delivered).await?;

        self.stats.total_sends.fetch_add(1, Ordering::Relaxed);
        self.stats.total_delivered.fetch_add(delivered, Ordering::Relaxed);
        self.stats.total_failed.fetch_add(failed, Ordering::Relaxed);

        BroadcastMetrics::record_sent();
        BroadcastMetrics::record_delivered(delivered);
        BroadcastMetrics::record_failed(failed);

        tracing::info!(
            notification_id = %id,
            audience = %notification.target_audience.as_str(),
            resolved = recipients.len(),
            delivered = delivered,
            failed = failed,
            status = %finalized.status,
            "Notification sent"
        );

        Ok(SendOutcome {
            notification_id: id,
            resolved: recipients.len() as u64,
            sent_count: delivered,
            failed,
        })
    }

    /// Mark the notification in-flight, rejecting concurrent duplicates.
    fn claim(&self, id: Uuid) -> Result<InFlightGuard<'_>, AppError> {
        match self.in_flight.entry(id) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                self.stats.rejected_sends.fetch_add(1, Ordering::Relaxed);
                BroadcastMetrics::record_rejected();
                Err(AppError::InvalidState(format!(
                    "notification {} already has a send in progress",
                    id
                )))
            }
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                entry.insert(());
                Ok(InFlightGuard { engine: self, id })
            }
        }
    }

    /// Deliver a notice to each recipient concurrently with bounded
    /// parallelism and a per-recipient timeout. Returns (delivered, failed).
    async fn fan_out(&self, recipients: &[AccountId], notice: &Notice) -> (u64, u64) {
        if recipients.is_empty() {
            return (0, 0);
        }

        let send_timeout = Duration::from_millis(self.config.delivery_timeout_ms);
        let max_concurrent = self.config.max_concurrent_deliveries.max(1);

        let mut futures = FuturesUnordered::new();
        let mut delivered = 0u64;
        let mut failed = 0u64;
        let mut pending = 0usize;

        for account_id in recipients {
            let transport = self.transport.clone();
            let account_id = account_id.clone();
            let notice_for_task = notice.clone();

            futures.push(async move {
                match timeout(send_timeout, transport.deliver(&account_id, &notice_for_task)).await {
                    Ok(Ok(())) => (account_id, None),
                    Ok(Err(e)) => (account_id, Some(e.to_string())),
                    Err(_) => (account_id, Some("delivery timed out".to_string())),
                }
            });
            pending += 1;

            // Process completed futures when we hit the concurrency limit
            while pending >= max_concurrent {
                if let Some(result) = futures.next().await {
                    pending -= 1;
                    tally(result, notice, &mut delivered, &mut failed);
                } else {
                    break;
                }
            }
        }

        // Process remaining futures
        while let Some(result) = futures.next().await {
            tally(result, notice, &mut delivered, &mut failed);
        }

        (delivered, failed)
    }
}

fn tally(
    result: (AccountId, Option<String>),
    notice: &Notice,
    delivered: &mut u64,
    failed: &mut u64,
) {
    match result {
        (_, None) => *delivered += 1,
        (account_id, Some(error)) => {
            *failed += 1;
            tracing::debug!(
                account_id = %account_id,
                notification_id = %notice.notification_id,
                error = %error,
                "Recipient delivery failed"
            );
        }
    }
}
