// SPDX-FileCopyrightText: 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Client for the external postal tracking and office lookup API.
//!
//! Every operation validates its inputs before touching the network and
//! maps every failure mode into the closed error taxonomy at the point of
//! detection. Calls carry a fixed timeout and are never retried: a failed
//! call surfaces immediately so callers see honest latency and no
//! duplicated requests.

use crate::config::UpstreamConfig;
use crate::error::{ApiError, ErrorKind, Result};
use crate::models::{OfficeRecord, OfficeSearchResult, TrackingResponse};
use crate::validator;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, warn};

/// Default radius for proximity searches, in metres.
pub const DEFAULT_SEARCH_RADIUS_M: u32 = 5000;

/// Postal API client.
///
/// Owns a connection pool configured once with the API key header and the
/// per-call timeout; cheap to share behind an `Arc`.
pub struct PostalClient {
    http: reqwest::Client,
    base_url: String,
}

impl PostalClient {
    /// Build a client from configuration. Fails only on malformed local
    /// configuration (an API key that is not a valid header value).
    pub fn new(config: &UpstreamConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            HeaderName::from_static("x-okapi-key"),
            HeaderValue::from_str(&config.api_key)
                .map_err(|_| ApiError::internal("postal API key is not a valid header value"))?,
        );

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout())
            .build()
            .map_err(|e| ApiError::internal(format!("failed to build postal API client: {e}")))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Fetch the tracking envelope for one shipment.
    pub async fn track_package(&self, tracking_number: &str) -> Result<TrackingResponse> {
        if !validator::is_valid_tracking_number(tracking_number) {
            return Err(ApiError::validation("invalid tracking number format")
                .with_details(json!({ "expected": "8 to 14 alphanumeric characters" })));
        }
        self.dispatch(
            Method::GET,
            &format!("/suivi/v2/idships/{tracking_number}"),
            None,
            None,
        )
        .await
    }

    /// Fetch one post office by identifier.
    pub async fn get_office_by_id(&self, id: &str) -> Result<OfficeRecord> {
        if id.trim().is_empty() {
            return Err(ApiError::validation("post office id is required"));
        }
        self.dispatch(Method::GET, &format!("/datanova/v1/bureaux-poste/{id}"), None, None)
            .await
    }

    /// Search offices around a point. Coordinates are range-checked before
    /// any network call.
    pub async fn find_nearby_offices(
        &self,
        latitude: f64,
        longitude: f64,
        radius_m: u32,
    ) -> Result<OfficeSearchResult> {
        validator::validate_coordinates(latitude, longitude)?;
        let query = [
            ("lat", latitude.to_string()),
            ("lon", longitude.to_string()),
            ("radius", radius_m.to_string()),
        ];
        self.dispatch(Method::GET, "/datanova/v1/bureaux-poste/", Some(&query), None)
            .await
    }

    /// Search offices by postal code (exactly five digits).
    pub async fn search_offices_by_postal_code(&self, code: &str) -> Result<OfficeSearchResult> {
        if !validator::is_valid_postal_code(code) {
            return Err(ApiError::validation("invalid postal code format")
                .with_details(json!({ "expected": "5 digits" })));
        }
        let query = [("codePostal", code.to_string())];
        self.dispatch(Method::GET, "/datanova/v1/bureaux-poste", Some(&query), None)
            .await
    }

    /// Escape hatch for endpoints without a typed wrapper.
    pub async fn raw_request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value> {
        self.dispatch(method, path, None, body).await
    }

    /// Perform one call and decode the success payload.
    ///
    /// All transport and status failures are classified here, once; callers
    /// and handlers never reinterpret them.
    async fn dispatch<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: Option<&[(&str, String)]>,
        body: Option<Value>,
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%method, %url, "postal API call");

        let mut request = self.http.request(method, &url);
        if let Some(query) = query {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await.map_err(classify_transport)?;
        let status = response.status().as_u16();

        if !(200..300).contains(&status) {
            let detail = response.json::<Value>().await.unwrap_or(Value::Null);
            warn!(status, %url, "postal API returned an error status");
            return Err(classify_status(status, detail));
        }

        response.json::<T>().await.map_err(|e| {
            ApiError::external_api("postal", "malformed response payload")
                .with_details(json!({ "cause": e.to_string() }))
        })
    }
}

/// Map an upstream status code onto the taxonomy. The mapping is total and
/// deterministic; unlisted 4xx codes fall through to EXTERNAL_API.
fn classify_status(status: u16, detail: Value) -> ApiError {
    let (kind, message) = match status {
        401 => (ErrorKind::Authentication, "postal API authentication failed, check the API key"),
        403 => (ErrorKind::Authorization, "postal API access forbidden"),
        404 => (ErrorKind::ResourceNotFound, "postal resource not found"),
        429 => (ErrorKind::RateLimit, "postal API rate limit exceeded"),
        500..=599 => (ErrorKind::ServiceUnavailable, "postal API unavailable"),
        _ => (ErrorKind::ExternalApi, "postal API returned an unexpected error"),
    };
    let mut err = ApiError::new(kind, message);
    if !detail.is_null() {
        err = err.with_details(json!({ "upstreamStatus": status, "upstream": detail }));
    } else {
        err = err.with_details(json!({ "upstreamStatus": status }));
    }
    err
}

/// Map a transport failure (no response received) onto the taxonomy.
fn classify_transport(err: reqwest::Error) -> ApiError {
    if err.is_builder() {
        return ApiError::internal(format!("malformed postal API request: {err}"));
    }
    // Timeout, refused connection, interrupted transfer: the caller got no
    // usable response, which the taxonomy treats uniformly.
    warn!(cause = %err, "no response from postal API");
    ApiError::external_api("postal", "no response received")
        .with_details(json!({ "transport": "no-response", "cause": err.to_string() }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UpstreamConfig;

    fn client() -> PostalClient {
        PostalClient::new(&UpstreamConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            api_key: "test-key".to_string(),
            timeout_secs: 1,
        })
        .unwrap()
    }

    #[test]
    fn test_client_construction_strips_trailing_slash() {
        let client = PostalClient::new(&UpstreamConfig {
            base_url: "https://api.example.fr/".to_string(),
            api_key: String::new(),
            timeout_secs: 10,
        })
        .unwrap();
        assert_eq!(client.base_url, "https://api.example.fr");
    }

    #[test]
    fn test_client_rejects_unprintable_api_key() {
        let result = PostalClient::new(&UpstreamConfig {
            base_url: "https://api.example.fr".to_string(),
            api_key: "bad\nkey".to_string(),
            timeout_secs: 10,
        });
        assert!(matches!(result, Err(e) if e.kind == ErrorKind::InternalServer));
    }

    #[tokio::test]
    async fn test_tracking_number_validated_before_dispatch() {
        // base_url points at a dead port; a network attempt would fail with
        // EXTERNAL_API, so VALIDATION proves no call was made.
        let err = client().track_package("123").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_postal_code_validated_before_dispatch() {
        let err = client().search_offices_by_postal_code("7500A").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_coordinates_validated_before_dispatch() {
        let err = client().find_nearby_offices(91.0, 0.0, 5000).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);

        let err = client().find_nearby_offices(0.0, 181.0, 5000).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_empty_office_id_rejected() {
        let err = client().get_office_by_id("  ").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[test]
    fn test_status_classification_table() {
        let cases = [
            (401, ErrorKind::Authentication),
            (403, ErrorKind::Authorization),
            (404, ErrorKind::ResourceNotFound),
            (429, ErrorKind::RateLimit),
            (500, ErrorKind::ServiceUnavailable),
            (502, ErrorKind::ServiceUnavailable),
            (503, ErrorKind::ServiceUnavailable),
            (400, ErrorKind::ExternalApi),
            (409, ErrorKind::ExternalApi),
            (418, ErrorKind::ExternalApi),
        ];
        for (status, kind) in cases {
            assert_eq!(classify_status(status, Value::Null).kind, kind, "status {status}");
        }
    }

    #[test]
    fn test_status_detail_carries_upstream_payload() {
        let err = classify_status(404, serde_json::json!({ "message": "unknown id" }));
        let details = err.details.unwrap();
        assert_eq!(details["upstreamStatus"], 404);
        assert_eq!(details["upstream"]["message"], "unknown id");
    }
}
