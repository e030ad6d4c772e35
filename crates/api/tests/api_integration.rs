//! Integration tests for the API server.

use std::sync::{Arc, OnceLock};

use api::auth::StaticAuthenticator;
use api::state::AppState;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{Duration, Utc};
use common::{CategoryId, Role, UserId};
use directory::InMemoryVendorDirectory;
use metrics_exporter_prometheus::PrometheusHandle;
use notifier::{Dispatcher, InMemoryMailer};
use serde_json::{Value, json};
use store::{InMemoryStore, SourcingStore};
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

const ADMIN_TOKEN: &str = "admin-token";
const VENDOR_TOKEN: &str = "vendor-token";
const VENDOR2_TOKEN: &str = "vendor2-token";

struct TestApp {
    app: Router,
    store: InMemoryStore,
    mailer: InMemoryMailer,
    vendor: UserId,
    vendor2: UserId,
    category: CategoryId,
}

fn setup() -> TestApp {
    let store = InMemoryStore::new();
    let directory = InMemoryVendorDirectory::new();
    let mailer = InMemoryMailer::new();
    let category = CategoryId::new();

    let admin = UserId::new();
    let vendor = directory.add_vendor("v1@example.com", category);
    let vendor2 = directory.add_vendor("v2@example.com", category);

    let authenticator = StaticAuthenticator::new()
        .with_token(ADMIN_TOKEN, admin, Role::Admin)
        .with_token(VENDOR_TOKEN, vendor, Role::Vendor)
        .with_token(VENDOR2_TOKEN, vendor2, Role::Vendor);

    let dispatcher = Dispatcher::new(store.clone(), mailer.clone());
    let state = Arc::new(AppState::new(
        store.clone(),
        directory,
        dispatcher,
        authenticator,
    ));
    let app = api::create_app(state, get_metrics_handle());

    TestApp {
        app,
        store,
        mailer,
        vendor,
        vendor2,
        category,
    }
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

fn rfp_body(test: &TestApp, vendor_ids: &[UserId]) -> Value {
    json!({
        "title": "Office chairs",
        "description": "200 ergonomic chairs",
        "quantity": 200,
        "deadline": (Utc::now() + Duration::days(7)).to_rfc3339(),
        "budget_min_cents": 100_000,
        "budget_max_cents": 500_000,
        "category_id": test.category.as_uuid(),
        "vendor_ids": vendor_ids.iter().map(|v| v.as_uuid()).collect::<Vec<_>>(),
    })
}

fn quote_body(rfp_id: &Value, total_cents: i64) -> Value {
    json!({
        "rfp_id": rfp_id,
        "unit_price_cents": total_cents / 200,
        "description": "Ergonomic chairs",
        "quantity": 200,
        "total_cost_cents": total_cents,
    })
}

async fn create_rfp(test: &TestApp, vendor_ids: &[UserId]) -> Value {
    let (status, body) = send(
        &test.app,
        "POST",
        "/api/v1/rfps",
        Some(ADMIN_TOKEN),
        Some(rfp_body(test, vendor_ids)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body
}

#[tokio::test]
async fn health_reports_ok() {
    let test = setup();
    let (status, body) = send(&test.app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["store"], "ok");
}

#[tokio::test]
async fn metrics_endpoint_renders() {
    let test = setup();
    let response = test
        .app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn auth_is_enforced_per_role() {
    let test = setup();

    // No token.
    let (status, _) = send(&test.app, "GET", "/api/v1/rfps", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Unknown token.
    let (status, _) = send(&test.app, "GET", "/api/v1/rfps", Some("nope"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Vendor hitting an admin route.
    let (status, body) = send(&test.app, "GET", "/api/v1/rfps", Some(VENDOR_TOKEN), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["error"].as_str().unwrap().contains("admin"));

    // Admin hitting a vendor route.
    let (status, _) = send(
        &test.app,
        "GET",
        "/api/v1/quotes/available-rfps",
        Some(ADMIN_TOKEN),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn rfp_creation_returns_audience_counts() {
    let test = setup();
    let vendors = [test.vendor, test.vendor2];
    let created = create_rfp(&test, &vendors).await;

    assert_eq!(created["invited"], 2);
    assert_eq!(created["notified"], 2);
    assert_eq!(created["unresolved"], 0);
    assert_eq!(created["rfp"]["status"], "open");
    assert_eq!(created["rfp"]["is_open"], true);

    let (status, listed) = send(&test.app, "GET", "/api/v1/rfps", Some(ADMIN_TOKEN), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn rfp_creation_validates_input() {
    let test = setup();

    let mut inverted = rfp_body(&test, &[test.vendor]);
    inverted["budget_min_cents"] = json!(500_000);
    inverted["budget_max_cents"] = json!(100_000);
    let (status, body) = send(
        &test.app,
        "POST",
        "/api/v1/rfps",
        Some(ADMIN_TOKEN),
        Some(inverted),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("budget"));

    let no_vendors = rfp_body(&test, &[]);
    let (status, body) = send(
        &test.app,
        "POST",
        "/api/v1/rfps",
        Some(ADMIN_TOKEN),
        Some(no_vendors),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("vendor"));
}

#[tokio::test]
async fn quote_admission_walks_the_check_order() {
    let test = setup();
    let created = create_rfp(&test, &[test.vendor, test.vendor2]).await;
    let rfp_id = created["rfp"]["id"].clone();

    // Vendor sees it as available.
    let (status, available) = send(
        &test.app,
        "GET",
        "/api/v1/quotes/available-rfps",
        Some(VENDOR_TOKEN),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(available.as_array().unwrap().len(), 1);

    // In-budget quote is admitted.
    let (status, quote) = send(
        &test.app,
        "POST",
        "/api/v1/quotes",
        Some(VENDOR_TOKEN),
        Some(quote_body(&rfp_id, 300_000)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(quote["status"], "pending");

    // Second submission is a conflict.
    let (status, body) = send(
        &test.app,
        "POST",
        "/api/v1/quotes",
        Some(VENDOR_TOKEN),
        Some(quote_body(&rfp_id, 200_000)),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("already submitted"));

    // Out-of-budget totals are rejected.
    let (status, body) = send(
        &test.app,
        "POST",
        "/api/v1/quotes",
        Some(VENDOR2_TOKEN),
        Some(quote_body(&rfp_id, 600_000)),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("budget"));

    // Unknown RFP.
    let (status, _) = send(
        &test.app,
        "POST",
        "/api/v1/quotes",
        Some(VENDOR2_TOKEN),
        Some(quote_body(&json!(uuid::Uuid::new_v4()), 300_000)),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // The vendor's quoted listing reflects the submission.
    let (status, quoted) = send(
        &test.app,
        "GET",
        "/api/v1/quotes/my-rfps?scope=quoted",
        Some(VENDOR_TOKEN),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let quoted = quoted.as_array().unwrap();
    assert_eq!(quoted.len(), 1);
    assert_eq!(quoted[0]["has_quoted"], true);
    assert_eq!(quoted[0]["quote_status"], "pending");

    // The admin sees the quote under the RFP.
    let uri = format!("/api/v1/rfps/{}/quotes", rfp_id.as_str().unwrap());
    let (status, quotes) = send(&test.app, "GET", &uri, Some(ADMIN_TOKEN), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(quotes.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn closed_rfp_rejects_quotes_regardless_of_deadline() {
    let test = setup();
    let created = create_rfp(&test, &[test.vendor]).await;
    let rfp_id = created["rfp"]["id"].clone();

    let uri = format!("/api/v1/rfps/{}/close", rfp_id.as_str().unwrap());
    let (status, closed) = send(&test.app, "POST", &uri, Some(ADMIN_TOKEN), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(closed["status"], "closed");
    assert_eq!(closed["is_open"], false);

    let (status, body) = send(
        &test.app,
        "POST",
        "/api/v1/quotes",
        Some(VENDOR_TOKEN),
        Some(quote_body(&rfp_id, 300_000)),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("closed or expired"));
}

#[tokio::test]
async fn delete_cascades_and_disappears_from_listings() {
    let test = setup();
    let created = create_rfp(&test, &[test.vendor]).await;
    let rfp_id = created["rfp"]["id"].as_str().unwrap().to_string();

    let (status, _) = send(
        &test.app,
        "DELETE",
        &format!("/api/v1/rfps/{rfp_id}"),
        Some(ADMIN_TOKEN),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(
        &test.app,
        "DELETE",
        &format!("/api/v1/rfps/{rfp_id}"),
        Some(ADMIN_TOKEN),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, available) = send(
        &test.app,
        "GET",
        "/api/v1/quotes/available-rfps",
        Some(VENDOR_TOKEN),
        None,
    )
    .await;
    assert!(available.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn invalid_status_filter_is_a_bad_request() {
    let test = setup();
    let (status, _) = send(
        &test.app,
        "GET",
        "/api/v1/rfps?status=archived",
        Some(ADMIN_TOKEN),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn notification_processing_delivers_the_outbox() {
    let test = setup();
    create_rfp(&test, &[test.vendor, test.vendor2]).await;

    // Creation never sent anything inline.
    assert_eq!(test.mailer.sent_count(), 0);
    let pending = test.store.deliverable_notifications().await.unwrap();
    assert_eq!(pending.len(), 2);
    let item_id = pending[0].id;

    let (status, outcome) = send(
        &test.app,
        "POST",
        "/api/v1/notifications/process",
        Some(ADMIN_TOKEN),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["processed"], 2);
    assert_eq!(outcome["succeeded"], 2);
    assert_eq!(outcome["failed"], 0);
    assert_eq!(test.mailer.sent_count(), 2);

    let (status, item) = send(
        &test.app,
        "GET",
        &format!("/api/v1/notifications/{}", item_id.as_uuid()),
        Some(ADMIN_TOKEN),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(item["status"], "sent");
    assert_eq!(item["recipient"], "v1@example.com");

    // Vendors cannot drive maintenance.
    let (status, _) = send(
        &test.app,
        "POST",
        "/api/v1/notifications/process",
        Some(VENDOR_TOKEN),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn password_reset_round_trip() {
    let test = setup();

    let (status, body) = send(
        &test.app,
        "POST",
        "/api/v1/password-reset/request",
        None,
        Some(json!({"email": "user@example.com"})),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert!(body["message"].as_str().unwrap().contains("reset code"));

    let code = test
        .store
        .reset_code_for_email("user@example.com")
        .await
        .unwrap()
        .unwrap()
        .code;
    let wrong = if code == "000000" { "000001" } else { "000000" };

    let (status, body) = send(
        &test.app,
        "POST",
        "/api/v1/password-reset/verify",
        None,
        Some(json!({"email": "user@example.com", "code": wrong})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].as_str().unwrap().contains("attempts remaining"));

    let (status, _) = send(
        &test.app,
        "POST",
        "/api/v1/password-reset/verify",
        None,
        Some(json!({"email": "user@example.com", "code": code})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // The code is single-use.
    let (status, _) = send(
        &test.app,
        "POST",
        "/api/v1/password-reset/verify",
        None,
        Some(json!({"email": "user@example.com", "code": code})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
