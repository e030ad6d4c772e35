//! Health check endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use directory::VendorDirectory;
use notifier::Mailer;
use serde::Serialize;
use store::{RfpId, SourcingStore};

use crate::auth::Authenticator;
use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub store: &'static str,
}

/// GET /health — liveness plus a cheap store probe.
pub async fn check<S, D, M, A>(
    State(state): State<Arc<AppState<S, D, M, A>>>,
) -> (StatusCode, Json<HealthResponse>)
where
    S: SourcingStore + Clone,
    D: VendorDirectory + Clone,
    M: Mailer + Clone,
    A: Authenticator,
{
    match state
        .store
        .get_rfp(RfpId::from_uuid(uuid::Uuid::nil()))
        .await
    {
        Ok(_) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "ok",
                store: "ok",
            }),
        ),
        Err(err) => {
            tracing::error!(%err, "store probe failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "degraded",
                    store: "unreachable",
                }),
            )
        }
    }
}
