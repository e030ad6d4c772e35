//! Admin-facing RFP endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use chrono::{DateTime, Utc};
use common::{CategoryId, Money, Role, UserId};
use directory::VendorDirectory;
use domain::CreateRfp;
use notifier::Mailer;
use serde::{Deserialize, Serialize};
use store::{Rfp, RfpFilter, RfpId, RfpStatus, SourcingStore};
use uuid::Uuid;

use crate::auth::Authenticator;
use crate::error::ApiError;
use crate::routes::quotes::QuoteResponse;
use crate::state::AppState;

// -- Request types --

#[derive(Deserialize)]
pub struct CreateRfpRequest {
    pub title: String,
    pub description: String,
    pub quantity: u32,
    pub deadline: DateTime<Utc>,
    pub budget_min_cents: i64,
    pub budget_max_cents: i64,
    pub category_id: Uuid,
    pub vendor_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct RfpListQuery {
    pub status: Option<String>,
    pub category: Option<Uuid>,
}

// -- Response types --

#[derive(Serialize)]
pub struct RfpResponse {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub quantity: u32,
    pub deadline: DateTime<Utc>,
    pub budget_min_cents: i64,
    pub budget_max_cents: i64,
    pub status: RfpStatus,
    pub is_active: bool,
    pub is_open: bool,
    pub category_id: Uuid,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

impl RfpResponse {
    pub fn from_rfp(rfp: &Rfp, now: DateTime<Utc>) -> Self {
        Self {
            id: rfp.id.as_uuid(),
            title: rfp.title.clone(),
            description: rfp.description.clone(),
            quantity: rfp.quantity,
            deadline: rfp.deadline,
            budget_min_cents: rfp.budget_min.cents(),
            budget_max_cents: rfp.budget_max.cents(),
            status: rfp.status,
            is_active: rfp.is_active,
            is_open: rfp.is_open(now),
            category_id: rfp.category_id.as_uuid(),
            created_by: rfp.created_by.as_uuid(),
            created_at: rfp.created_at,
        }
    }
}

#[derive(Serialize)]
pub struct RfpCreatedResponse {
    pub rfp: RfpResponse,
    pub invited: usize,
    pub notified: usize,
    pub unresolved: usize,
}

// -- Handlers --

/// POST /api/v1/rfps — publish a new RFP.
#[tracing::instrument(skip(state, headers, req))]
pub async fn create<S, D, M, A>(
    State(state): State<Arc<AppState<S, D, M, A>>>,
    headers: HeaderMap,
    Json(req): Json<CreateRfpRequest>,
) -> Result<(StatusCode, Json<RfpCreatedResponse>), ApiError>
where
    S: SourcingStore + Clone,
    D: VendorDirectory + Clone,
    M: Mailer + Clone,
    A: Authenticator,
{
    let claims = state.authorize(&headers, Role::Admin)?;

    let cmd = CreateRfp {
        title: req.title,
        description: req.description,
        quantity: req.quantity,
        deadline: req.deadline,
        budget_min: Money::from_cents(req.budget_min_cents),
        budget_max: Money::from_cents(req.budget_max_cents),
        category_id: CategoryId::from_uuid(req.category_id),
        vendor_ids: req.vendor_ids.into_iter().map(UserId::from_uuid).collect(),
    };

    let created = state.rfps.create_rfp(claims.user_id, cmd).await?;
    let now = Utc::now();

    Ok((
        StatusCode::CREATED,
        Json(RfpCreatedResponse {
            rfp: RfpResponse::from_rfp(&created.rfp, now),
            invited: created.invited,
            notified: created.notified,
            unresolved: created.unresolved,
        }),
    ))
}

/// GET /api/v1/rfps — list this admin's RFPs, newest first.
#[tracing::instrument(skip(state, headers))]
pub async fn list<S, D, M, A>(
    State(state): State<Arc<AppState<S, D, M, A>>>,
    headers: HeaderMap,
    Query(query): Query<RfpListQuery>,
) -> Result<Json<Vec<RfpResponse>>, ApiError>
where
    S: SourcingStore + Clone,
    D: VendorDirectory + Clone,
    M: Mailer + Clone,
    A: Authenticator,
{
    let claims = state.authorize(&headers, Role::Admin)?;

    let status = query
        .status
        .map(|s| s.parse::<RfpStatus>())
        .transpose()
        .map_err(ApiError::BadRequest)?;
    let filter = RfpFilter {
        status,
        category: query.category.map(CategoryId::from_uuid),
    };

    let rfps = state.rfps.list_rfps(claims.user_id, &filter).await?;
    let now = Utc::now();
    Ok(Json(
        rfps.iter().map(|r| RfpResponse::from_rfp(r, now)).collect(),
    ))
}

/// GET /api/v1/rfps/{id}/quotes — all quotes submitted for an RFP.
#[tracing::instrument(skip(state, headers))]
pub async fn quotes<S, D, M, A>(
    State(state): State<Arc<AppState<S, D, M, A>>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<QuoteResponse>>, ApiError>
where
    S: SourcingStore + Clone,
    D: VendorDirectory + Clone,
    M: Mailer + Clone,
    A: Authenticator,
{
    state.authorize(&headers, Role::Admin)?;

    let quotes = state.rfps.rfp_quotes(RfpId::from_uuid(id)).await?;
    Ok(Json(quotes.iter().map(QuoteResponse::from_quote).collect()))
}

/// POST /api/v1/rfps/{id}/close — one-way close.
#[tracing::instrument(skip(state, headers))]
pub async fn close<S, D, M, A>(
    State(state): State<Arc<AppState<S, D, M, A>>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<RfpResponse>, ApiError>
where
    S: SourcingStore + Clone,
    D: VendorDirectory + Clone,
    M: Mailer + Clone,
    A: Authenticator,
{
    let claims = state.authorize(&headers, Role::Admin)?;

    let closed = state
        .rfps
        .close_rfp(claims.user_id, RfpId::from_uuid(id))
        .await?;
    Ok(Json(RfpResponse::from_rfp(&closed, Utc::now())))
}

/// DELETE /api/v1/rfps/{id} — cascade delete.
#[tracing::instrument(skip(state, headers))]
pub async fn remove<S, D, M, A>(
    State(state): State<Arc<AppState<S, D, M, A>>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
    S: SourcingStore + Clone,
    D: VendorDirectory + Clone,
    M: Mailer + Clone,
    A: Authenticator,
{
    let claims = state.authorize(&headers, Role::Admin)?;

    state
        .rfps
        .delete_rfp(claims.user_id, RfpId::from_uuid(id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
