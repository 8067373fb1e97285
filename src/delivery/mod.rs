//! Delivery transport collaborator.
//!
//! The broadcast engine hands one notice per recipient to a transport and
//! counts the outcomes; the transport mechanism itself (in-app inbox here,
//! e-mail or push elsewhere) is interchangeable behind the trait.

mod inbox;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

pub use inbox::{InboxEntry, InboxStore, InboxTransport};

use crate::directory::AccountId;
use crate::notification::NotificationType;

/// Errors that can occur delivering a single notice.
///
/// These are always recipient-level: the engine records the failure and moves
/// on to the next recipient.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Recipient rejected: {0}")]
    Rejected(String),

    #[error("Transport failure: {0}")]
    Transport(String),
}

/// The per-recipient payload handed to a transport.
#[derive(Debug, Clone, Serialize)]
pub struct Notice {
    /// Notification this notice was fanned out from
    pub notification_id: Uuid,
    pub title: String,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub sent_at: DateTime<Utc>,
}

impl Notice {
    pub fn new(
        notification_id: Uuid,
        title: impl Into<String>,
        content: impl Into<String>,
        kind: NotificationType,
    ) -> Self {
        Self {
            notification_id,
            title: title.into(),
            content: content.into(),
            kind,
            sent_at: Utc::now(),
        }
    }
}

/// Delivers one notice to one account.
#[async_trait]
pub trait DeliveryTransport: Send + Sync {
    async fn deliver(&self, account_id: &AccountId, notice: &Notice) -> Result<(), DeliveryError>;
}
