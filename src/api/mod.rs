//! API layer - HTTP endpoint handlers organized by domain.

mod health;
mod inbox;
mod metrics;
mod notifications;
mod routes;

// Re-export all handlers for use in server/app.rs
pub use health::{health, stats};
pub use inbox::{list_inbox, mark_inbox_read};
pub use metrics::prometheus_metrics;
pub use notifications::{
    cancel_notification, create_notification, delete_notification, get_notification,
    list_notifications, schedule_notification, send_notification,
};
pub use routes::api_routes;
