// SPDX-FileCopyrightText: 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
// SPDX-License-Identifier: PMPL-1.0-or-later

//! HTTP handlers for the postal relay service.
//!
//! Tracking and office lookups proxy the postal API; office lookups are
//! served through the response cache with a `fromCache` marker on hits.
//! Form endpoints validate, then relay by email. Every failure leaves a
//! handler as a classified [`ApiError`].

use crate::cache::ResponseCache;
use crate::config::Config;
use crate::error::{ApiError, ErrorKind, Result};
use crate::limiter::RateLimiter;
use crate::mailer::{self, ContactSubmission, Mailer, QuoteRequest, VehicleReservation};
use crate::models::GeoCoordinates;
use crate::unix_ms;
use crate::upstream::{PostalClient, DEFAULT_SEARCH_RADIUS_M};
use crate::validator;
use axum::{
    extract::{rejection::JsonRejection, OriginalUri, Path, Query, State},
    http::{HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Shared application state, constructed once in `main` and threaded
/// through every handler.
pub struct AppState {
    pub config: Config,
    pub limiter: RateLimiter,
    pub cache: ResponseCache,
    pub postal: PostalClient,
    pub mailer: Arc<dyn Mailer>,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub environment: String,
    pub timestamp: String,
}

/// Welcome banner at the root path.
pub async fn root() -> Json<Value> {
    Json(json!({ "message": "Welcome to the BLD Express API" }))
}

/// Liveness endpoint.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "postal-relay",
        version: env!("CARGO_PKG_VERSION"),
        environment: state.config.server.environment.clone(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// Email transport probe, guarded by a shared key in the `x-api-key`
/// header or `key` query parameter.
pub async fn email_health(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Result<Json<Value>> {
    let provided = headers
        .get("x-api-key")
        .and_then(|h| h.to_str().ok())
        .map(str::to_string)
        .or_else(|| params.get("key").cloned());

    if provided.as_deref() != Some(state.config.email.health_check_api_key.as_str()) {
        return Err(ApiError::authentication("invalid API key"));
    }

    let probe = mailer::test_message(&state.config.email, &Utc::now().to_rfc3339());
    state.mailer.send(&probe).await?;
    Ok(Json(json!({ "status": "success", "message": "email service operational" })))
}

// ---------------------------------------------------------------------------
// Package tracking
// ---------------------------------------------------------------------------

/// Full tracking payload for one shipment.
pub async fn track_package(
    State(state): State<Arc<AppState>>,
    Path(tracking_number): Path<String>,
) -> Result<Json<Value>> {
    let envelope = state.postal.track_package(&tracking_number).await?;

    if envelope.return_code != 200 || envelope.error.is_some() {
        return Err(tracking_unavailable(&envelope.error));
    }

    Ok(Json(json!({
        "success": true,
        "message": "tracking information retrieved",
        "tracking": envelope.shipment,
    })))
}

/// Condensed tracking view: current status and last event only.
pub async fn tracking_summary(
    State(state): State<Arc<AppState>>,
    Path(tracking_number): Path<String>,
) -> Result<Json<Value>> {
    let envelope = state.postal.track_package(&tracking_number).await?;

    if envelope.return_code != 200 || envelope.error.is_some() {
        return Err(tracking_unavailable(&envelope.error));
    }
    let Some(shipment) = envelope.shipment else {
        return Err(tracking_unavailable(&envelope.error));
    };

    Ok(Json(json!({
        "success": true,
        "message": "tracking summary retrieved",
        "summary": {
            "trackingNumber": shipment.id_ship,
            "status": shipment.status,
            "isDelivered": shipment.is_final,
            "lastEvent": shipment.timeline.first(),
            "estimatedDeliveryDate": shipment.delivery_date,
            "url": shipment.url,
        },
    })))
}

fn tracking_unavailable(fault: &Option<crate::models::TrackingFault>) -> ApiError {
    let message = fault
        .as_ref()
        .map(|f| f.message.clone())
        .unwrap_or_else(|| "tracking information unavailable".to_string());
    let mut err = ApiError::new(ErrorKind::ResourceNotFound, message);
    if let Some(fault) = fault {
        err = err.with_details(json!({ "upstreamCode": fault.code, "upstreamType": fault.kind }));
    }
    err
}

// ---------------------------------------------------------------------------
// Post offices (cached)
// ---------------------------------------------------------------------------

/// Run `fetch` through the response cache.
///
/// On a hit the stored payload is served with a `fromCache: true` marker
/// added by this pipeline step, never by the store. Only success payloads
/// reach `put`: a failed fetch propagates before anything is stored.
async fn serve_cached<F>(state: &AppState, signature: String, fetch: F) -> Result<Response>
where
    F: std::future::Future<Output = Result<Value>>,
{
    let now_ms = unix_ms();
    if let Some(mut payload) = state.cache.get(&signature, now_ms).await {
        debug!(signature = %signature, "serving from cache");
        if let Some(fields) = payload.as_object_mut() {
            fields.insert("fromCache".to_string(), Value::Bool(true));
        }
        return Ok(Json(payload).into_response());
    }

    let payload = fetch.await?;
    state
        .cache
        .put(signature, payload.clone(), state.config.cache.office_ttl(), now_ms)
        .await;
    Ok(Json(payload).into_response())
}

fn request_signature(method: &Method, uri: &axum::http::Uri) -> String {
    let path_and_query = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| uri.path());
    ResponseCache::signature(method.as_str(), path_and_query)
}

/// Offices around a point. `latitude` and `longitude` are required query
/// parameters; `radius` defaults to 5000 metres.
pub async fn nearby_offices(
    State(state): State<Arc<AppState>>,
    method: Method,
    OriginalUri(uri): OriginalUri,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response> {
    let (latitude, longitude) = match (params.get("latitude"), params.get("longitude")) {
        (Some(lat), Some(lon)) => (lat.clone(), lon.clone()),
        _ => {
            return Err(ApiError::validation(
                "latitude and longitude query parameters are required",
            ))
        }
    };
    let latitude: f64 = latitude
        .parse()
        .map_err(|_| ApiError::validation("coordinates must be valid numbers"))?;
    let longitude: f64 = longitude
        .parse()
        .map_err(|_| ApiError::validation("coordinates must be valid numbers"))?;
    let radius: u32 = match params.get("radius") {
        Some(radius) => radius
            .parse()
            .map_err(|_| ApiError::validation("radius must be a whole number of metres"))?,
        None => DEFAULT_SEARCH_RADIUS_M,
    };

    let signature = request_signature(&method, &uri);
    let fetch_state = state.clone();
    serve_cached(&state, signature, async move {
        let mut result = fetch_state
            .postal
            .find_nearby_offices(latitude, longitude, radius)
            .await?;

        // The upstream omits distance on some result kinds; fill it in
        // from the search centre so clients can always sort.
        let centre = GeoCoordinates { latitude, longitude };
        for office in &mut result.offices {
            if office.distance.is_none() {
                office.distance = Some((centre.distance_km(&office.coordinates) * 1000.0).round());
            }
        }

        let total = if result.total_results > 0 {
            result.total_results
        } else {
            result.offices.len() as u32
        };
        Ok(json!({
            "success": true,
            "message": "post offices found",
            "searchParams": { "latitude": latitude, "longitude": longitude, "radius": radius },
            "totalResults": total,
            "offices": result.offices,
        }))
    })
    .await
}

/// Offices in a postal code.
pub async fn offices_by_postal_code(
    State(state): State<Arc<AppState>>,
    method: Method,
    OriginalUri(uri): OriginalUri,
    Path(postal_code): Path<String>,
) -> Result<Response> {
    let signature = request_signature(&method, &uri);
    let fetch_state = state.clone();
    serve_cached(&state, signature, async move {
        let result = fetch_state
            .postal
            .search_offices_by_postal_code(&postal_code)
            .await?;
        let total = if result.total_results > 0 {
            result.total_results
        } else {
            result.offices.len() as u32
        };
        Ok(json!({
            "success": true,
            "message": "post offices found",
            "searchParams": { "postalCode": postal_code },
            "totalResults": total,
            "offices": result.offices,
        }))
    })
    .await
}

/// One office by identifier.
pub async fn office_by_id(
    State(state): State<Arc<AppState>>,
    method: Method,
    OriginalUri(uri): OriginalUri,
    Path(id): Path<String>,
) -> Result<Response> {
    let signature = request_signature(&method, &uri);
    let fetch_state = state.clone();
    serve_cached(&state, signature, async move {
        let office = fetch_state.postal.get_office_by_id(&id).await?;
        Ok(json!({
            "success": true,
            "message": "post office retrieved",
            "office": office,
        }))
    })
    .await
}

// ---------------------------------------------------------------------------
// Form submissions
// ---------------------------------------------------------------------------

/// Raw contact form body. Fields are optional at the wire level so that
/// missing ones can all be reported together.
#[derive(Debug, Deserialize)]
pub struct ContactForm {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub subject: Option<String>,
    pub message: Option<String>,
}

impl ContactForm {
    fn validate(self) -> Result<ContactSubmission> {
        validator::require_fields(&[
            ("name", self.name.as_deref()),
            ("email", self.email.as_deref()),
            ("subject", self.subject.as_deref()),
            ("message", self.message.as_deref()),
        ])?;
        let email = self.email.unwrap_or_default();
        let message = self.message.unwrap_or_default();
        validator::validate_email(&email)?;
        validator::validate_optional_phone(self.phone.as_deref())?;
        validator::validate_min_length("message", &message, 10)?;
        Ok(ContactSubmission {
            name: self.name.unwrap_or_default(),
            email,
            phone: self.phone,
            subject: self.subject.unwrap_or_default(),
            message,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct QuoteForm {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    #[serde(rename = "type")]
    pub service_type: Option<String>,
    pub pickup: Option<String>,
    pub delivery: Option<String>,
    pub date: Option<String>,
    pub description: Option<String>,
}

impl QuoteForm {
    fn validate(self) -> Result<QuoteRequest> {
        validator::require_fields(&[
            ("name", self.name.as_deref()),
            ("email", self.email.as_deref()),
            ("type", self.service_type.as_deref()),
            ("pickup", self.pickup.as_deref()),
            ("delivery", self.delivery.as_deref()),
            ("date", self.date.as_deref()),
            ("description", self.description.as_deref()),
        ])?;
        let email = self.email.unwrap_or_default();
        let description = self.description.unwrap_or_default();
        validator::validate_email(&email)?;
        validator::validate_optional_phone(self.phone.as_deref())?;
        validator::validate_min_length("description", &description, 10)?;
        Ok(QuoteRequest {
            name: self.name.unwrap_or_default(),
            email,
            phone: self.phone,
            service_type: self.service_type.unwrap_or_default(),
            pickup: self.pickup.unwrap_or_default(),
            delivery: self.delivery.unwrap_or_default(),
            date: self.date.unwrap_or_default(),
            description,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationForm {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub pickup_location: Option<String>,
    pub dropoff_location: Option<String>,
    #[serde(default)]
    pub additional_services: Vec<String>,
}

impl ReservationForm {
    fn validate(self) -> Result<VehicleReservation> {
        validator::require_fields(&[
            ("name", self.name.as_deref()),
            ("email", self.email.as_deref()),
            ("phone", self.phone.as_deref()),
            ("startDate", self.start_date.as_deref()),
            ("endDate", self.end_date.as_deref()),
            ("pickupLocation", self.pickup_location.as_deref()),
        ])?;
        let email = self.email.unwrap_or_default();
        let phone = self.phone.unwrap_or_default();
        validator::validate_email(&email)?;
        validator::validate_optional_phone(Some(&phone))?;
        Ok(VehicleReservation {
            name: self.name.unwrap_or_default(),
            email,
            phone,
            start_date: self.start_date.unwrap_or_default(),
            end_date: self.end_date.unwrap_or_default(),
            start_time: self.start_time,
            end_time: self.end_time,
            pickup_location: self.pickup_location.unwrap_or_default(),
            dropoff_location: self.dropoff_location,
            additional_services: self.additional_services,
        })
    }
}

fn json_body<T>(payload: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    match payload {
        Ok(Json(body)) => Ok(body),
        Err(rejection) => Err(ApiError::bad_request(format!("invalid JSON body: {rejection}"))),
    }
}

/// Relay a contact message: notify the company inbox, acknowledge the
/// submitter.
pub async fn submit_contact(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<ContactForm>, JsonRejection>,
) -> Result<Json<Value>> {
    let submission = json_body(payload)?.validate()?;
    info!(email = %submission.email, subject = %submission.subject, "contact message received");

    let email_config = &state.config.email;
    state
        .mailer
        .send(&mailer::contact_notification(email_config, &submission))
        .await?;
    state
        .mailer
        .send(&mailer::contact_confirmation(email_config, &submission))
        .await?;

    info!(email = %submission.email, "contact message relayed");
    Ok(Json(json!({ "status": "success", "message": "your message was sent successfully" })))
}

/// Relay a quote request.
pub async fn submit_quote(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<QuoteForm>, JsonRejection>,
) -> Result<Response> {
    let request = json_body(payload)?.validate()?;
    info!(email = %request.email, service = %request.service_type, "quote request received");

    let email_config = &state.config.email;
    state
        .mailer
        .send(&mailer::quote_notification(email_config, &request))
        .await?;
    state
        .mailer
        .send(&mailer::quote_confirmation(email_config, &request))
        .await?;

    info!(email = %request.email, "quote request relayed");
    Ok((
        StatusCode::CREATED,
        Json(json!({ "status": "success", "message": "your quote request was sent successfully" })),
    )
        .into_response())
}

/// Relay a vehicle reservation and hand back a reservation id.
pub async fn create_reservation(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<ReservationForm>, JsonRejection>,
) -> Result<Response> {
    let reservation = json_body(payload)?.validate()?;
    info!(
        email = %reservation.email,
        start_date = %reservation.start_date,
        end_date = %reservation.end_date,
        "vehicle reservation received"
    );

    let reservation_id = generate_reservation_id();
    let email_config = &state.config.email;
    state
        .mailer
        .send(&mailer::reservation_notification(email_config, &reservation))
        .await?;
    state
        .mailer
        .send(&mailer::reservation_confirmation(email_config, &reservation))
        .await?;

    info!(email = %reservation.email, reservation_id = %reservation_id, "reservation relayed");
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "status": "success",
            "message": "your reservation was sent successfully",
            "data": {
                "reservationId": reservation_id,
                "timestamp": Utc::now().to_rfc3339(),
            },
        })),
    )
        .into_response())
}

/// Booking reference handed back to the client.
fn generate_reservation_id() -> String {
    let token = Uuid::new_v4().simple().to_string();
    format!("BLD-{}", token[..12].to_uppercase())
}

/// Fallback for unregistered routes.
pub async fn not_found(method: Method, OriginalUri(uri): OriginalUri) -> ApiError {
    ApiError::new(
        ErrorKind::ResourceNotFound,
        format!("Route not found: {} {}", method, uri.path()),
    )
}
