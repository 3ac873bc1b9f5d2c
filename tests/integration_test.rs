// SPDX-FileCopyrightText: 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Integration tests for the postal relay: the assembled router with
//! rate limiting, form relaying and the error wire format.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use postal_relay::{
    config::Config,
    handlers::{self, AppState},
    mailer::{CaptureMailer, Mailer},
    middleware::rate_limit,
    PostalClient, RateLimiter, ResponseCache,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

/// Assemble the application the way `main` does, with a capture mail
/// transport we can inspect.
fn test_app(config: Config) -> (Router, Arc<AppState>, Arc<CaptureMailer>) {
    let capture = Arc::new(CaptureMailer::new());
    let state = Arc::new(AppState {
        limiter: RateLimiter::new(&config.rate_limit),
        cache: ResponseCache::new(),
        postal: PostalClient::new(&config.upstream).unwrap(),
        mailer: capture.clone() as Arc<dyn Mailer>,
        config: config.clone(),
    });

    let api = Router::new()
        .route("/tracking/:tracking_number", get(handlers::track_package))
        .route("/post-offices/nearby", get(handlers::nearby_offices))
        .route("/contact", post(handlers::submit_contact))
        .route("/quote", post(handlers::submit_quote))
        .route("/reservations", post(handlers::create_reservation));

    let app = Router::new()
        .route("/health", get(handlers::health))
        .route("/health/email", get(handlers::email_health))
        .nest(&config.server.api_prefix, api)
        .fallback(handlers::not_found)
        .layer(axum_middleware::from_fn_with_state(state.clone(), rate_limit))
        .with_state(state.clone());

    (app, state, capture)
}

fn config_with_limit(max: u32) -> Config {
    let mut config = Config::default();
    config.rate_limit.max_requests_per_window = max;
    config
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value, axum::http::HeaderMap) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body, headers)
}

fn get_request(uri: &str, ip: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("x-real-ip", ip)
        .body(Body::empty())
        .unwrap()
}

fn post_json(uri: &str, ip: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("x-real-ip", ip)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

// ---------------------------------------------------------------------------
// Rate limiting through the full pipeline
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_admitted_requests_carry_rate_limit_headers() {
    let (app, _, _) = test_app(config_with_limit(5));

    let (status, _, headers) = send(&app, get_request("/health", "203.0.113.1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers.get("x-ratelimit-limit").unwrap(), "5");
    assert_eq!(headers.get("x-ratelimit-remaining").unwrap(), "4");
    let reset: u64 = headers
        .get("x-ratelimit-reset")
        .unwrap()
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!(reset > 0);
}

#[tokio::test]
async fn test_exhausted_client_receives_429_with_retry_after() {
    let (app, _, _) = test_app(config_with_limit(2));

    for _ in 0..2 {
        let (status, _, _) = send(&app, get_request("/health", "203.0.113.2")).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body, headers) = send(&app, get_request("/health", "203.0.113.2")).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "RATE_LIMIT_ERROR");
    assert!(body["retryAfter"].as_u64().unwrap() > 0);
    assert!(headers.get("retry-after").is_some());
}

#[tokio::test]
async fn test_rate_limit_isolated_per_client() {
    let (app, _, _) = test_app(config_with_limit(1));

    let (status, _, _) = send(&app, get_request("/health", "203.0.113.3")).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _, _) = send(&app, get_request("/health", "203.0.113.3")).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);

    // A different client is unaffected.
    let (status, _, _) = send(&app, get_request("/health", "203.0.113.4")).await;
    assert_eq!(status, StatusCode::OK);
}

// ---------------------------------------------------------------------------
// Error wire format
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_unknown_route_yields_classified_404() {
    let (app, _, _) = test_app(config_with_limit(100));

    let (status, body, _) = send(&app, get_request("/nope", "203.0.113.5")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "RESOURCE_NOT_FOUND");
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("Route not found: GET /nope"));
}

#[tokio::test]
async fn test_invalid_tracking_number_rejected_at_boundary() {
    let (app, _, _) = test_app(config_with_limit(100));

    let (status, body, _) =
        send(&app, get_request("/api/v1/tracking/123", "203.0.113.6")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_nearby_requires_coordinates() {
    let (app, _, _) = test_app(config_with_limit(100));

    let (status, body, _) = send(
        &app,
        get_request("/api/v1/post-offices/nearby?latitude=45.0", "203.0.113.7"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, body, _) = send(
        &app,
        get_request(
            "/api/v1/post-offices/nearby?latitude=91.0&longitude=0.0",
            "203.0.113.7",
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

// ---------------------------------------------------------------------------
// Form relaying
// ---------------------------------------------------------------------------

fn contact_body() -> Value {
    json!({
        "name": "Ada Lovelace",
        "email": "ada@example.com",
        "phone": "01 23 45 67 89",
        "subject": "Delivery question",
        "message": "Where is my parcel? It was due last week.",
    })
}

#[tokio::test]
async fn test_contact_form_relays_two_emails() {
    let (app, _, capture) = test_app(config_with_limit(100));

    let (status, body, _) = send(
        &app,
        post_json("/api/v1/contact", "203.0.113.8", contact_body()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");

    let sent = capture.sent().await;
    assert_eq!(sent.len(), 2, "notification plus confirmation");
    assert_eq!(sent[0].to, "contact@bld-express.fr");
    assert_eq!(sent[0].reply_to.as_deref(), Some("ada@example.com"));
    assert_eq!(sent[1].to, "ada@example.com");
}

#[tokio::test]
async fn test_contact_form_missing_fields_sends_nothing() {
    let (app, _, capture) = test_app(config_with_limit(100));

    let (status, body, _) = send(
        &app,
        post_json("/api/v1/contact", "203.0.113.9", json!({ "name": "Ada" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    let missing = body["details"]["missingFields"].as_array().unwrap();
    assert_eq!(missing.len(), 3);

    assert!(capture.sent().await.is_empty());
}

#[tokio::test]
async fn test_contact_form_rejects_malformed_json() {
    let (app, _, capture) = test_app(config_with_limit(100));

    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/contact")
        .header("x-real-ip", "203.0.113.10")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST_ERROR");
    assert!(capture.sent().await.is_empty());
}

#[tokio::test]
async fn test_quote_form_returns_201() {
    let (app, _, capture) = test_app(config_with_limit(100));

    let (status, body, _) = send(
        &app,
        post_json(
            "/api/v1/quote",
            "203.0.113.11",
            json!({
                "name": "Ada Lovelace",
                "email": "ada@example.com",
                "type": "express",
                "pickup": "1 rue de la Paix, Paris",
                "delivery": "5 place du Capitole, Toulouse",
                "date": "2026-08-20",
                "description": "Two pallets of analytical engines",
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "success");
    assert_eq!(capture.sent().await.len(), 2);
}

#[tokio::test]
async fn test_reservation_returns_booking_reference() {
    let (app, _, capture) = test_app(config_with_limit(100));

    let (status, body, _) = send(
        &app,
        post_json(
            "/api/v1/reservations",
            "203.0.113.12",
            json!({
                "name": "Ada Lovelace",
                "email": "ada@example.com",
                "phone": "0123456789",
                "startDate": "2026-08-10",
                "endDate": "2026-08-12",
                "pickupLocation": "Toulouse",
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let reservation_id = body["data"]["reservationId"].as_str().unwrap();
    assert!(reservation_id.starts_with("BLD-"));
    assert!(body["data"]["timestamp"].is_string());
    assert_eq!(capture.sent().await.len(), 2);
}

// ---------------------------------------------------------------------------
// Health endpoints
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_health_reports_service_metadata() {
    let (app, _, _) = test_app(config_with_limit(100));

    let (status, body, _) = send(&app, get_request("/health", "203.0.113.13")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "postal-relay");
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_email_health_requires_key() {
    let (app, _, capture) = test_app(config_with_limit(100));

    let (status, body, _) = send(&app, get_request("/health/email", "203.0.113.14")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "AUTHENTICATION_ERROR");
    assert!(capture.sent().await.is_empty());

    let request = Request::builder()
        .uri("/health/email")
        .header("x-real-ip", "203.0.113.14")
        .header("x-api-key", "api_test_key")
        .body(Body::empty())
        .unwrap();
    let (status, body, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(capture.sent().await.len(), 1);
}
