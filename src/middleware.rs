// SPDX-FileCopyrightText: 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Request admission middleware.
//!
//! Sits in front of every route: derives the client identity, counts the
//! request against its window, and either forwards it (stamping the
//! rate-limit headers on the response) or answers 429 with a retry-after.

use crate::error::ApiError;
use crate::handlers::AppState;
use crate::unix_ms;
use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header, HeaderName, HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::warn;

/// Derive the rate-limit key for a request.
///
/// Proxy headers win over the socket address so the limiter keys on the
/// originating client when the service sits behind a reverse proxy:
/// `x-real-ip`, then the first entry of `x-forwarded-for`, then the peer
/// address.
pub fn client_key<B>(req: &Request<B>) -> String {
    if let Some(ip) = req.headers().get("x-real-ip").and_then(|h| h.to_str().ok()) {
        let ip = ip.trim();
        if !ip.is_empty() {
            return ip.to_string();
        }
    }
    if let Some(forwarded) = req
        .headers()
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
    {
        if let Some(first) = forwarded.split(',').map(str::trim).find(|s| !s.is_empty()) {
            return first.to_string();
        }
    }
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Admission check applied to every inbound request.
pub async fn rate_limit(
    State(state): State<Arc<AppState>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let key = client_key(&req);
    let now_ms = unix_ms();
    let admission = state.limiter.admit(&key, now_ms).await;

    if !admission.allowed {
        let retry_after = admission.retry_after_secs(now_ms);
        warn!(%key, retry_after, "request rate limited");
        let mut response = ApiError::rate_limit("too many requests, please retry later")
            .with_retry_after(retry_after)
            .into_response();
        response
            .headers_mut()
            .insert(header::RETRY_AFTER, HeaderValue::from(retry_after));
        return response;
    }

    let mut response = next.run(req).await;
    let headers = response.headers_mut();
    headers.insert(
        HeaderName::from_static("x-ratelimit-limit"),
        HeaderValue::from(admission.limit),
    );
    headers.insert(
        HeaderName::from_static("x-ratelimit-remaining"),
        HeaderValue::from(admission.remaining),
    );
    headers.insert(
        HeaderName::from_static("x-ratelimit-reset"),
        HeaderValue::from(admission.reset_epoch_secs()),
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> axum::http::request::Builder {
        Request::builder().uri("/")
    }

    #[test]
    fn test_real_ip_header_wins() {
        let req = request()
            .header("x-real-ip", "203.0.113.7")
            .header("x-forwarded-for", "198.51.100.1")
            .body(())
            .unwrap();
        assert_eq!(client_key(&req), "203.0.113.7");
    }

    #[test]
    fn test_forwarded_for_takes_first_entry() {
        let req = request()
            .header("x-forwarded-for", " , 198.51.100.1, 10.0.0.1")
            .body(())
            .unwrap();
        assert_eq!(client_key(&req), "198.51.100.1");
    }

    #[test]
    fn test_falls_back_to_socket_address() {
        let mut req = request().body(()).unwrap();
        req.extensions_mut()
            .insert(ConnectInfo::<SocketAddr>("192.0.2.9:4444".parse().unwrap()));
        assert_eq!(client_key(&req), "192.0.2.9");
    }

    #[test]
    fn test_unknown_without_any_source() {
        let req = request().body(()).unwrap();
        assert_eq!(client_key(&req), "unknown");
    }
}
