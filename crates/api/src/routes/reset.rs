//! Password reset endpoints (public).

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use directory::VendorDirectory;
use notifier::Mailer;
use serde::{Deserialize, Serialize};
use store::SourcingStore;

use crate::auth::Authenticator;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct RequestResetBody {
    pub email: String,
}

#[derive(Deserialize)]
pub struct VerifyResetBody {
    pub email: String,
    pub code: String,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

/// POST /api/v1/password-reset/request — issue an OTP.
///
/// Answers the same way for known and unknown addresses.
#[tracing::instrument(skip(state, body))]
pub async fn request<S, D, M, A>(
    State(state): State<Arc<AppState<S, D, M, A>>>,
    Json(body): Json<RequestResetBody>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError>
where
    S: SourcingStore + Clone,
    D: VendorDirectory + Clone,
    M: Mailer + Clone,
    A: Authenticator,
{
    state.reset.request_reset(&body.email).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(MessageResponse {
            message: "If the account exists, a reset code has been sent",
        }),
    ))
}

/// POST /api/v1/password-reset/verify — redeem an OTP.
#[tracing::instrument(skip(state, body))]
pub async fn verify<S, D, M, A>(
    State(state): State<Arc<AppState<S, D, M, A>>>,
    Json(body): Json<VerifyResetBody>,
) -> Result<Json<MessageResponse>, ApiError>
where
    S: SourcingStore + Clone,
    D: VendorDirectory + Clone,
    M: Mailer + Clone,
    A: Authenticator,
{
    state.reset.verify_reset(&body.email, &body.code).await?;
    Ok(Json(MessageResponse {
        message: "Reset code verified",
    }))
}
