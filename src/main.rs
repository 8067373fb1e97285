use std::time::Duration;

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tokio::net::TcpListener;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use waqf_notification_service::config::Settings;
use waqf_notification_service::directory::create_account_directory;
use waqf_notification_service::notification::{
    create_notification_store, PostgresNotificationStore,
};
use waqf_notification_service::server::{create_app, AppState};
use waqf_notification_service::tasks::ScheduledSendTask;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    init_tracing();

    // Load configuration
    let settings = Settings::new()?;
    tracing::info!("Configuration loaded");

    // Connect PostgreSQL when the store backend asks for it
    let pool = if settings.database.backend == "postgres" {
        Some(connect_pool(&settings).await?)
    } else {
        None
    };

    let store = create_notification_store(&settings.database, pool.clone());
    if let Some(ref pool) = pool {
        PostgresNotificationStore::new(pool.clone()).migrate().await?;
    }

    let directory = create_account_directory(&settings.database.backend, pool);

    // Create application state
    let state = AppState::new(settings.clone(), store.clone(), directory);
    tracing::info!("Application state initialized");

    // Shutdown signal shared by background tasks
    let (shutdown_tx, _) = tokio::sync::broadcast::channel(1);

    // Start scheduled-send task in background
    let scheduler = ScheduledSendTask::new(
        settings.scheduler.clone(),
        store,
        state.engine.clone(),
        shutdown_tx.subscribe(),
    );
    let scheduler_handle = tokio::spawn(async move {
        scheduler.run().await;
    });

    // Create Axum app
    let app = create_app(state);

    // Start server
    let addr = settings.server_addr();
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal_handler(shutdown_tx))
        .await?;

    // Wait for background tasks to finish
    tracing::info!("Waiting for background tasks to finish...");
    let _ = scheduler_handle.await;

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn connect_pool(settings: &Settings) -> Result<PgPool> {
    let database = &settings.database;

    let pool = PgPoolOptions::new()
        .max_connections(database.pool_size)
        .acquire_timeout(Duration::from_secs(database.connect_timeout_seconds as u64))
        .idle_timeout(Duration::from_secs(database.idle_timeout_seconds as u64))
        .connect(&database.url)
        .await?;

    tracing::info!(pool_size = database.pool_size, "PostgreSQL connection pool created");

    Ok(pool)
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn shutdown_signal_handler(shutdown_tx: tokio::sync::broadcast::Sender<()>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        }
    }

    // Signal background tasks to stop
    let _ = shutdown_tx.send(());
}
