//! Zenkofy API server binary

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::signal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use zenkofy_api::{build_router, setup_metrics, AppState, Config};
use zenkofy_billing::StripeProvider;
use zenkofy_db::{create_pool, run_migrations, PoolOptions, Repositories};
use zenkofy_storage::{SupabaseStorage, SupabaseStorageConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive("zenkofy_api=debug".parse()?))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Zenkofy API");

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!(http_port = config.http_port, "Configuration loaded");

    // Initialize metrics
    let metrics_handle = if config.metrics_enabled {
        Some(setup_metrics()?)
    } else {
        None
    };

    // Create database pool
    let pool = create_pool(&config.database_url, PoolOptions::default()).await?;
    run_migrations(&pool).await?;
    tracing::info!("Database pool created");

    let repos = Repositories::postgres(pool);
    let storage = SupabaseStorage::new(SupabaseStorageConfig {
        url: config.supabase_url.clone(),
        service_role_key: config.supabase_service_role_key.clone(),
        bucket: config.storage_bucket.clone(),
    });
    let payments = StripeProvider::new(config.billing.clone());

    let http_addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    let state = AppState::new(config, repos, Arc::new(storage), Arc::new(payments));
    let app = build_router(state, metrics_handle);

    tracing::info!("HTTP server listening on {}", http_addr);
    let listener = tokio::net::TcpListener::bind(http_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = ?e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = ?e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
