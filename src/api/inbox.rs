//! User-facing inbox endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::auth::Claims;
use crate::delivery::InboxEntry;
use crate::error::{AppError, Result};
use crate::metrics::INBOX_READS_TOTAL;
use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct InboxListResponse {
    pub entries: Vec<InboxEntry>,
    pub total: usize,
    pub unread: usize,
}

/// GET /api/v1/inbox - The caller's delivered notices, newest first
#[tracing::instrument(
    name = "http.list_inbox",
    skip(state, claims),
    fields(account_id = %claims.account_id())
)]
pub async fn list_inbox(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Json<InboxListResponse> {
    let account_id = claims.account_id();
    let entries = state.inbox.list(account_id);
    let total = entries.len();
    let unread = state.inbox.unread_count(account_id);

    Json(InboxListResponse {
        entries,
        total,
        unread,
    })
}

/// POST /api/v1/inbox/:entry_id/read - Mark one of the caller's entries read
#[tracing::instrument(
    name = "http.mark_inbox_read",
    skip(state, claims),
    fields(account_id = %claims.account_id())
)]
pub async fn mark_inbox_read(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(entry_id): Path<Uuid>,
) -> Result<StatusCode> {
    if !state.inbox.mark_read(claims.account_id(), entry_id) {
        return Err(AppError::NotFound(format!("inbox entry {}", entry_id)));
    }

    INBOX_READS_TOTAL.inc();
    Ok(StatusCode::NO_CONTENT)
}
