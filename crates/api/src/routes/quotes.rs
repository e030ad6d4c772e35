//! Vendor-facing quote and listing endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use chrono::{DateTime, Utc};
use common::{Money, Role};
use directory::VendorDirectory;
use domain::{RfpScope, SubmitQuote};
use notifier::Mailer;
use serde::{Deserialize, Serialize};
use store::{Quote, QuoteStatus, RfpId, SourcingStore};
use uuid::Uuid;

use crate::auth::Authenticator;
use crate::error::ApiError;
use crate::routes::rfps::RfpResponse;
use crate::state::AppState;

// -- Request types --

#[derive(Deserialize)]
pub struct SubmitQuoteRequest {
    pub rfp_id: Uuid,
    pub unit_price_cents: i64,
    pub description: String,
    pub quantity: u32,
    pub total_cost_cents: i64,
}

#[derive(Debug, Deserialize)]
pub struct MyRfpsQuery {
    pub scope: Option<String>,
}

// -- Response types --

#[derive(Serialize)]
pub struct QuoteResponse {
    pub id: Uuid,
    pub rfp_id: Uuid,
    pub vendor_id: Uuid,
    pub unit_price_cents: i64,
    pub description: String,
    pub quantity: u32,
    pub total_cost_cents: i64,
    pub status: QuoteStatus,
    pub submitted_at: DateTime<Utc>,
}

impl QuoteResponse {
    pub fn from_quote(quote: &Quote) -> Self {
        Self {
            id: quote.id.as_uuid(),
            rfp_id: quote.rfp_id.as_uuid(),
            vendor_id: quote.vendor_id.as_uuid(),
            unit_price_cents: quote.unit_price.cents(),
            description: quote.description.clone(),
            quantity: quote.quantity,
            total_cost_cents: quote.total_cost.cents(),
            status: quote.status,
            submitted_at: quote.submitted_at,
        }
    }
}

#[derive(Serialize)]
pub struct VendorRfpResponse {
    #[serde(flatten)]
    pub rfp: RfpResponse,
    pub has_quoted: bool,
    pub can_quote: bool,
    pub is_expired: bool,
    pub quote_status: Option<QuoteStatus>,
}

// -- Handlers --

/// POST /api/v1/quotes — submit a quote against an RFP.
#[tracing::instrument(skip(state, headers, req))]
pub async fn create<S, D, M, A>(
    State(state): State<Arc<AppState<S, D, M, A>>>,
    headers: HeaderMap,
    Json(req): Json<SubmitQuoteRequest>,
) -> Result<(StatusCode, Json<QuoteResponse>), ApiError>
where
    S: SourcingStore + Clone,
    D: VendorDirectory + Clone,
    M: Mailer + Clone,
    A: Authenticator,
{
    let claims = state.authorize(&headers, Role::Vendor)?;

    let cmd = SubmitQuote {
        rfp_id: RfpId::from_uuid(req.rfp_id),
        unit_price: Money::from_cents(req.unit_price_cents),
        description: req.description,
        quantity: req.quantity,
        total_cost: Money::from_cents(req.total_cost_cents),
    };

    let quote = state.quotes.submit_quote(claims.user_id, cmd).await?;
    Ok((StatusCode::CREATED, Json(QuoteResponse::from_quote(&quote))))
}

/// GET /api/v1/quotes/available-rfps — open, eligible, not-yet-quoted RFPs.
#[tracing::instrument(skip(state, headers))]
pub async fn available_rfps<S, D, M, A>(
    State(state): State<Arc<AppState<S, D, M, A>>>,
    headers: HeaderMap,
) -> Result<Json<Vec<RfpResponse>>, ApiError>
where
    S: SourcingStore + Clone,
    D: VendorDirectory + Clone,
    M: Mailer + Clone,
    A: Authenticator,
{
    let claims = state.authorize(&headers, Role::Vendor)?;

    let now = Utc::now();
    let rfps = state.eligibility.available_rfps(claims.user_id, now).await?;
    Ok(Json(
        rfps.iter().map(|r| RfpResponse::from_rfp(r, now)).collect(),
    ))
}

/// GET /api/v1/quotes/my-rfps?scope= — annotated invited-RFP listing.
#[tracing::instrument(skip(state, headers))]
pub async fn my_rfps<S, D, M, A>(
    State(state): State<Arc<AppState<S, D, M, A>>>,
    headers: HeaderMap,
    Query(query): Query<MyRfpsQuery>,
) -> Result<Json<Vec<VendorRfpResponse>>, ApiError>
where
    S: SourcingStore + Clone,
    D: VendorDirectory + Clone,
    M: Mailer + Clone,
    A: Authenticator,
{
    let claims = state.authorize(&headers, Role::Vendor)?;

    let scope = query
        .scope
        .map(|s| s.parse::<RfpScope>())
        .transpose()
        .map_err(ApiError::BadRequest)?
        .unwrap_or_default();

    let now = Utc::now();
    let views = state
        .eligibility
        .vendor_rfps(claims.user_id, scope, now)
        .await?;

    Ok(Json(
        views
            .into_iter()
            .map(|view| VendorRfpResponse {
                rfp: RfpResponse::from_rfp(&view.rfp, now),
                has_quoted: view.has_quoted,
                can_quote: view.can_quote,
                is_expired: view.is_expired,
                quote_status: view.quote_status,
            })
            .collect(),
    ))
}
