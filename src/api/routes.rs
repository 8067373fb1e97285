use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::server::{require_admin, require_user, AppState};

use super::health::{health, stats};
use super::inbox::{list_inbox, mark_inbox_read};
use super::metrics::prometheus_metrics;
use super::notifications::{
    cancel_notification, create_notification, delete_notification, get_notification,
    list_notifications, schedule_notification, send_notification,
};

pub fn api_routes(state: AppState) -> Router<AppState> {
    // Administrative surface; every route requires the admin role
    let admin_routes = Router::new()
        .route(
            "/notifications",
            post(create_notification).get(list_notifications),
        )
        .route(
            "/notifications/{id}",
            get(get_notification).delete(delete_notification),
        )
        .route("/notifications/{id}/send", post(send_notification))
        .route("/notifications/{id}/schedule", post(schedule_notification))
        .route("/notifications/{id}/cancel", post(cancel_notification))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin));

    // User-facing inbox; any authenticated account
    let inbox_routes = Router::new()
        .route("/inbox", get(list_inbox))
        .route("/inbox/{entry_id}/read", post(mark_inbox_read))
        .route_layer(middleware::from_fn_with_state(state, require_user));

    Router::new()
        // Health & Stats
        .route("/health", get(health))
        .route("/stats", get(stats))
        .route("/metrics", get(prometheus_metrics))
        .nest("/api/v1", admin_routes.merge(inbox_routes))
}
