//! Notification entity, closed enumerations, and request types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::directory::AccountId;
use crate::error::AppError;

/// Maximum title length, matching the platform's column width.
pub const MAX_TITLE_LEN: usize = 500;

/// Classification of a notification. Display-only, no behavioral effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationType {
    Announcement,
    Update,
    Maintenance,
    Alert,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Announcement => "announcement",
            Self::Update => "update",
            Self::Maintenance => "maintenance",
            Self::Alert => "alert",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "announcement" => Some(Self::Announcement),
            "update" => Some(Self::Update),
            "maintenance" => Some(Self::Maintenance),
            "alert" => Some(Self::Alert),
            _ => None,
        }
    }
}

/// Lifecycle status. `Sent` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationStatus {
    Draft,
    Scheduled,
    Sent,
    Cancelled,
}

impl NotificationStatus {
    /// Whether a broadcast may start from this status.
    pub fn is_sendable(&self) -> bool {
        matches!(self, Self::Draft | Self::Scheduled)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Sent | Self::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Scheduled => "scheduled",
            Self::Sent => "sent",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(Self::Draft),
            "scheduled" => Some(Self::Scheduled),
            "sent" => Some(Self::Sent),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

impl std::fmt::Display for NotificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Target audience selector. Resolved to concrete accounts at send time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetAudience {
    All,
    Admins,
    Users,
    Specific,
}

impl Default for TargetAudience {
    fn default() -> Self {
        Self::All
    }
}

impl TargetAudience {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Admins => "admins",
            Self::Users => "users",
            Self::Specific => "specific",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "all" => Some(Self::All),
            "admins" => Some(Self::Admins),
            "users" => Some(Self::Users),
            "specific" => Some(Self::Specific),
            _ => None,
        }
    }
}

/// Errors from notification store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Notification not found: {0}")]
    NotFound(Uuid),

    #[error("Notification {id} is {status} and cannot transition")]
    InvalidState {
        id: Uuid,
        status: NotificationStatus,
    },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Validation(msg) => AppError::Validation(msg),
            StoreError::NotFound(id) => AppError::NotFound(format!("notification {}", id)),
            StoreError::InvalidState { .. } => AppError::InvalidState(err.to_string()),
            StoreError::Database(e) => AppError::Database(e),
        }
    }
}

/// A system notification record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    /// Unique identifier, assigned at creation
    pub id: Uuid,

    pub title: String,

    pub content: String,

    #[serde(rename = "type")]
    pub kind: NotificationType,

    /// Audience selector used by the resolver at send time
    pub target_audience: TargetAudience,

    /// Explicit recipient list for `specific` targeting
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_ids: Option<Vec<AccountId>>,

    pub status: NotificationStatus,

    /// Successful deliveries, set exactly once when the send finalizes
    pub sent_count: u64,

    /// When a scheduled notification becomes due
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_for: Option<DateTime<Utc>>,

    /// Administrator account that created the record
    pub created_by: AccountId,

    pub created_at: DateTime<Utc>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sent_at: Option<DateTime<Utc>>,
}

impl Notification {
    /// Build a new record from a validated create request.
    pub fn from_request(
        request: CreateNotificationRequest,
        created_by: &str,
    ) -> StoreResult<Self> {
        request.validate()?;

        let status = if request.scheduled_for.is_some() {
            NotificationStatus::Scheduled
        } else {
            NotificationStatus::Draft
        };

        Ok(Self {
            id: Uuid::new_v4(),
            title: request.title,
            content: request.content,
            kind: request.kind,
            target_audience: request.target_audience,
            target_ids: request.target_ids,
            status,
            sent_count: 0,
            scheduled_for: request.scheduled_for,
            created_by: created_by.to_string(),
            created_at: Utc::now(),
            sent_at: None,
        })
    }

    /// Whether this record matches a list filter.
    pub fn matches(&self, filter: &ListFilter) -> bool {
        filter.kind.map_or(true, |k| self.kind == k)
            && filter.status.map_or(true, |s| self.status == s)
    }
}

/// Request to create a notification.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateNotificationRequest {
    pub title: String,

    pub content: String,

    #[serde(rename = "type")]
    pub kind: NotificationType,

    #[serde(default)]
    pub target_audience: TargetAudience,

    /// Recipients for `specific` targeting, persisted on the record
    pub target_ids: Option<Vec<AccountId>>,

    /// Schedule the notification instead of leaving it a draft
    pub scheduled_for: Option<DateTime<Utc>>,
}

impl CreateNotificationRequest {
    pub fn validate(&self) -> StoreResult<()> {
        if self.title.trim().is_empty() {
            return Err(StoreError::Validation("title is required".to_string()));
        }

        if self.title.chars().count() > MAX_TITLE_LEN {
            return Err(StoreError::Validation(format!(
                "title must be at most {} characters",
                MAX_TITLE_LEN
            )));
        }

        if self.content.trim().is_empty() {
            return Err(StoreError::Validation("content is required".to_string()));
        }

        Ok(())
    }
}

/// Exact-match filter for listing. Omitted fields match everything.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ListFilter {
    #[serde(rename = "type")]
    pub kind: Option<NotificationType>,
    pub status: Option<NotificationStatus>,
}

/// 1-based pagination window.
#[derive(Debug, Clone, Copy)]
pub struct Page {
    pub page: u32,
    pub limit: u32,
}

impl Page {
    pub fn new(page: u32, limit: u32) -> Self {
        Self {
            page: page.max(1),
            limit: limit.max(1),
        }
    }

    /// Zero-based item offset of this window.
    pub fn offset(&self) -> u64 {
        (self.page as u64 - 1) * self.limit as u64
    }
}

/// One page of notifications plus the total match count.
#[derive(Debug, Clone, Serialize)]
pub struct NotificationPage {
    pub items: Vec<Notification>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_request() -> CreateNotificationRequest {
        CreateNotificationRequest {
            title: "Maintenance window".to_string(),
            content: "The registry will be offline tonight.".to_string(),
            kind: NotificationType::Maintenance,
            target_audience: TargetAudience::All,
            target_ids: None,
            scheduled_for: None,
        }
    }

    #[test]
    fn test_empty_title_rejected() {
        let mut request = base_request();
        request.title = "".to_string();
        assert!(matches!(request.validate(), Err(StoreError::Validation(_))));

        request.title = "   ".to_string();
        assert!(matches!(request.validate(), Err(StoreError::Validation(_))));
    }

    #[test]
    fn test_empty_content_rejected() {
        let mut request = base_request();
        request.content = " \n\t ".to_string();
        assert!(matches!(request.validate(), Err(StoreError::Validation(_))));
    }

    #[test]
    fn test_oversized_title_rejected() {
        let mut request = base_request();
        request.title = "x".repeat(MAX_TITLE_LEN + 1);
        assert!(matches!(request.validate(), Err(StoreError::Validation(_))));
    }

    #[test]
    fn test_new_record_is_draft_with_zero_count() {
        let notification = Notification::from_request(base_request(), "admin-1").unwrap();
        assert_eq!(notification.status, NotificationStatus::Draft);
        assert_eq!(notification.sent_count, 0);
        assert_eq!(notification.created_by, "admin-1");
        assert!(notification.sent_at.is_none());
    }

    #[test]
    fn test_scheduled_for_yields_scheduled_status() {
        let mut request = base_request();
        request.scheduled_for = Some(Utc::now() + chrono::Duration::hours(1));

        let notification = Notification::from_request(request, "admin-1").unwrap();
        assert_eq!(notification.status, NotificationStatus::Scheduled);
    }

    #[test]
    fn test_status_transitions_allowed_from() {
        assert!(NotificationStatus::Draft.is_sendable());
        assert!(NotificationStatus::Scheduled.is_sendable());
        assert!(!NotificationStatus::Sent.is_sendable());
        assert!(!NotificationStatus::Cancelled.is_sendable());

        assert!(NotificationStatus::Sent.is_terminal());
        assert!(NotificationStatus::Cancelled.is_terminal());
    }

    #[test]
    fn test_unknown_enum_value_rejected() {
        let result: Result<NotificationType, _> = serde_json::from_str("\"broadcast\"");
        assert!(result.is_err());

        let result: Result<TargetAudience, _> = serde_json::from_str("\"everyone\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_filter_matching() {
        let notification = Notification::from_request(base_request(), "admin-1").unwrap();

        assert!(notification.matches(&ListFilter::default()));
        assert!(notification.matches(&ListFilter {
            kind: Some(NotificationType::Maintenance),
            status: Some(NotificationStatus::Draft),
        }));
        assert!(!notification.matches(&ListFilter {
            kind: Some(NotificationType::Alert),
            status: None,
        }));
    }

    #[test]
    fn test_page_offset() {
        assert_eq!(Page::new(1, 50).offset(), 0);
        assert_eq!(Page::new(3, 20).offset(), 40);
        // Page and limit are clamped to at least 1
        assert_eq!(Page::new(0, 0).offset(), 0);
    }
}
