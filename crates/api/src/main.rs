//! API server entry point.

use std::sync::Arc;

use api::auth::JwtAuthenticator;
use api::config::Config;
use api::state::AppState;
use directory::HttpVendorDirectory;
use notifier::{DispatcherPool, PoolConfig, RelayMailer};
use store::PostgresStore;
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    // 1. Initialize tracing
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone())),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Install Prometheus metrics recorder
    let prometheus_builder = metrics_exporter_prometheus::PrometheusBuilder::new();
    let metrics_handle = prometheus_builder
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Connect the store and run migrations
    let pool = sqlx::PgPool::connect(&config.database_url)
        .await
        .expect("failed to connect to the database");
    let store = PostgresStore::new(pool);
    store.run_migrations().await.expect("migrations failed");

    // 4. Wire the collaborators and the delivery pool
    let directory = HttpVendorDirectory::new(&config.auth_service_url);
    let mailer = RelayMailer::new(&config.notification_service_url);
    let (dispatcher, pool) = DispatcherPool::start(
        store.clone(),
        mailer,
        PoolConfig {
            worker_count: config.worker_count,
            queue_capacity: config.queue_capacity,
        },
    );

    // 5. Catch-up pass: deliver anything enqueued before the last shutdown
    match dispatcher.process_deliverable().await {
        Ok(outcome) if outcome.processed > 0 => {
            tracing::info!(
                processed = outcome.processed,
                succeeded = outcome.succeeded,
                "startup notification catch-up finished"
            );
        }
        Ok(_) => {}
        Err(err) => tracing::error!(%err, "startup notification catch-up failed"),
    }

    // 6. Build the application
    let authenticator = JwtAuthenticator::new(&config.jwt_secret);
    let state = Arc::new(AppState::new(
        store,
        directory,
        dispatcher,
        authenticator,
    ));
    let app = api::create_app(state, metrics_handle);

    // 7. Start server
    let addr = config.addr();
    tracing::info!(%addr, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    // 8. Drain in-flight notification work before exiting
    pool.shutdown().await;
    tracing::info!("server shut down gracefully");
}
