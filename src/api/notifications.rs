//! Notification management endpoints (administrative surface).

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::Claims;
use crate::error::Result;
use crate::metrics::{NOTIFICATIONS_CREATED_TOTAL, NOTIFICATIONS_DELETED_TOTAL};
use crate::notification::{
    CreateNotificationRequest, ListFilter, Notification, NotificationPage, NotificationStatus,
    NotificationType, Page, SendOutcome,
};
use crate::server::AppState;

/// Query parameters for the listing endpoint.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(rename = "type")]
    kind: Option<NotificationType>,
    status: Option<NotificationStatus>,
    page: Option<u32>,
    limit: Option<u32>,
}

/// Optional body for the send endpoint; `recipients` overrides the persisted
/// list for `specific` targeting.
#[derive(Debug, Default, Deserialize)]
pub struct SendRequest {
    pub recipients: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct ScheduleRequest {
    pub scheduled_for: DateTime<Utc>,
}

/// POST /api/v1/notifications - Create a notification
#[tracing::instrument(
    name = "http.create_notification",
    skip(state, claims, request),
    fields(created_by = %claims.account_id())
)]
pub async fn create_notification(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(request): Json<CreateNotificationRequest>,
) -> Result<(StatusCode, Json<Notification>)> {
    let created = state.store.create(request, claims.account_id()).await?;

    NOTIFICATIONS_CREATED_TOTAL.inc();
    tracing::info!(notification_id = %created.id, "Notification created");

    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /api/v1/notifications - List notifications with filters
#[tracing::instrument(name = "http.list_notifications", skip(state, query))]
pub async fn list_notifications(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<NotificationPage>> {
    let filter = ListFilter {
        kind: query.kind,
        status: query.status,
    };

    let limit = query
        .limit
        .unwrap_or(state.settings.api.default_page_limit)
        .min(state.settings.api.max_page_limit);
    let page = Page::new(query.page.unwrap_or(1), limit);

    let result = state.store.list(&filter, &page).await?;
    Ok(Json(result))
}

/// GET /api/v1/notifications/:id - Fetch one notification
#[tracing::instrument(name = "http.get_notification", skip(state))]
pub async fn get_notification(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Notification>> {
    let notification = state.store.get(id).await?;
    Ok(Json(notification))
}

/// POST /api/v1/notifications/:id/send - Broadcast a notification now
#[tracing::instrument(name = "http.send_notification", skip(state, request))]
pub async fn send_notification(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    request: Option<Json<SendRequest>>,
) -> Result<Json<SendOutcome>> {
    let recipients = request.and_then(|Json(body)| body.recipients);

    let outcome = state.engine.send(id, recipients).await?;
    Ok(Json(outcome))
}

/// POST /api/v1/notifications/:id/schedule - Schedule a draft for later
#[tracing::instrument(name = "http.schedule_notification", skip(state, request))]
pub async fn schedule_notification(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<ScheduleRequest>,
) -> Result<Json<Notification>> {
    let scheduled = state.store.schedule(id, request.scheduled_for).await?;

    tracing::info!(
        notification_id = %id,
        scheduled_for = %request.scheduled_for,
        "Notification scheduled"
    );

    Ok(Json(scheduled))
}

/// POST /api/v1/notifications/:id/cancel - Cancel a draft or scheduled
/// notification
#[tracing::instrument(name = "http.cancel_notification", skip(state))]
pub async fn cancel_notification(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Notification>> {
    let cancelled = state.store.cancel(id).await?;

    tracing::info!(notification_id = %id, "Notification cancelled");

    Ok(Json(cancelled))
}

/// DELETE /api/v1/notifications/:id - Hard delete
#[tracing::instrument(name = "http.delete_notification", skip(state))]
pub async fn delete_notification(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    state.store.delete(id).await?;

    NOTIFICATIONS_DELETED_TOTAL.inc();
    tracing::info!(notification_id = %id, "Notification deleted");

    Ok(StatusCode::NO_CONTENT)
}
