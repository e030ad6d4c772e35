//! Notification maintenance endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use chrono::{DateTime, Utc};
use common::Role;
use directory::VendorDirectory;
use notifier::Mailer;
use serde::Serialize;
use store::{Notification, NotificationId, NotificationStatus, SourcingStore};
use uuid::Uuid;

use crate::auth::Authenticator;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Serialize)]
pub struct NotificationResponse {
    pub id: Uuid,
    pub channel: String,
    pub recipient: String,
    pub subject: String,
    pub status: NotificationStatus,
    pub retry_count: u32,
    pub max_retries: u32,
    pub last_error: Option<String>,
    pub sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl NotificationResponse {
    fn from_item(item: &Notification) -> Self {
        Self {
            id: item.id.as_uuid(),
            channel: item.channel.to_string(),
            recipient: item.recipient.clone(),
            subject: item.subject.clone(),
            status: item.status,
            retry_count: item.retry_count,
            max_retries: item.max_retries,
            last_error: item.last_error.clone(),
            sent_at: item.sent_at,
            created_at: item.created_at,
        }
    }
}

#[derive(Serialize)]
pub struct ProcessResponse {
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// POST /api/v1/notifications/process — batch-reprocess deliverable items.
#[tracing::instrument(skip(state, headers))]
pub async fn process<S, D, M, A>(
    State(state): State<Arc<AppState<S, D, M, A>>>,
    headers: HeaderMap,
) -> Result<Json<ProcessResponse>, ApiError>
where
    S: SourcingStore + Clone,
    D: VendorDirectory + Clone,
    M: Mailer + Clone,
    A: Authenticator,
{
    state.authorize(&headers, Role::Admin)?;

    let outcome = state.dispatcher.process_deliverable().await?;
    Ok(Json(ProcessResponse {
        processed: outcome.processed,
        succeeded: outcome.succeeded,
        failed: outcome.failed,
    }))
}

/// GET /api/v1/notifications/{id} — work item status.
#[tracing::instrument(skip(state, headers))]
pub async fn get_one<S, D, M, A>(
    State(state): State<Arc<AppState<S, D, M, A>>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<NotificationResponse>, ApiError>
where
    S: SourcingStore + Clone,
    D: VendorDirectory + Clone,
    M: Mailer + Clone,
    A: Authenticator,
{
    state.authorize(&headers, Role::Admin)?;

    let item = state
        .store
        .get_notification(NotificationId::from_uuid(id))
        .await?
        .ok_or_else(|| ApiError::NotFound("Notification not found".to_string()))?;
    Ok(Json(NotificationResponse::from_item(&item)))
}
