//! HTTP API server with observability for the RFP sourcing platform.
//!
//! Exposes the admin RFP surface, the vendor quote surface, notification
//! maintenance, and the password-reset endpoints, with structured logging
//! (tracing) and Prometheus metrics.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, post};
use directory::VendorDirectory;
use metrics_exporter_prometheus::PrometheusHandle;
use notifier::Mailer;
use store::SourcingStore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use auth::Authenticator;
pub use state::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S, D, M, A>(
    state: Arc<AppState<S, D, M, A>>,
    metrics_handle: PrometheusHandle,
) -> Router
where
    S: SourcingStore + Clone + 'static,
    D: VendorDirectory + Clone + 'static,
    M: Mailer + Clone + 'static,
    A: Authenticator + 'static,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check::<S, D, M, A>))
        .route("/api/v1/rfps", post(routes::rfps::create::<S, D, M, A>))
        .route("/api/v1/rfps", get(routes::rfps::list::<S, D, M, A>))
        .route(
            "/api/v1/rfps/{id}/quotes",
            get(routes::rfps::quotes::<S, D, M, A>),
        )
        .route(
            "/api/v1/rfps/{id}/close",
            post(routes::rfps::close::<S, D, M, A>),
        )
        .route(
            "/api/v1/rfps/{id}",
            delete(routes::rfps::remove::<S, D, M, A>),
        )
        .route("/api/v1/quotes", post(routes::quotes::create::<S, D, M, A>))
        .route(
            "/api/v1/quotes/available-rfps",
            get(routes::quotes::available_rfps::<S, D, M, A>),
        )
        .route(
            "/api/v1/quotes/my-rfps",
            get(routes::quotes::my_rfps::<S, D, M, A>),
        )
        .route(
            "/api/v1/notifications/process",
            post(routes::notifications::process::<S, D, M, A>),
        )
        .route(
            "/api/v1/notifications/{id}",
            get(routes::notifications::get_one::<S, D, M, A>),
        )
        .route(
            "/api/v1/password-reset/request",
            post(routes::reset::request::<S, D, M, A>),
        )
        .route(
            "/api/v1/password-reset/verify",
            post(routes::reset::verify::<S, D, M, A>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
