//! Health check and statistics endpoints.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::error::Result;
use crate::notification::BroadcastStatsSnapshot;
use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub notifications: NotificationStats,
    pub broadcasts: BroadcastStatsSnapshot,
    pub inbox: InboxStats,
}

#[derive(Debug, Serialize)]
pub struct NotificationStats {
    pub total: u64,
}

#[derive(Debug, Serialize)]
pub struct InboxStats {
    pub total_entries: usize,
    pub accounts: usize,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

pub async fn stats(State(state): State<AppState>) -> Result<Json<StatsResponse>> {
    let total = state.store.count().await?;
    let broadcasts = state.engine.stats();

    Ok(Json(StatsResponse {
        notifications: NotificationStats { total },
        broadcasts,
        inbox: InboxStats {
            total_entries: state.inbox.total_entries(),
            accounts: state.inbox.account_count(),
        },
    }))
}
