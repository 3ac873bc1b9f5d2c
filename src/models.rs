// SPDX-FileCopyrightText: 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Wire types for the postal tracking and office lookup APIs.
//!
//! Field names mirror the upstream JSON (camelCase); structs tolerate
//! missing optional blocks because the upstream omits them freely.

use serde::{Deserialize, Serialize};

/// One event in a shipment's timeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingEvent {
    pub code: String,
    pub date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub label: String,
    pub status: String,
}

/// Tracking state of one shipment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipmentRecord {
    /// Tracking number
    pub id_ship: String,
    /// Postal product type
    pub product: String,
    /// Whether delivery is complete
    pub is_final: bool,
    pub status: String,
    pub entry_date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_date: Option<String>,
    /// Chronological event list, most recent first
    #[serde(default)]
    pub timeline: Vec<TrackingEvent>,
    /// Public tracking page
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Error block the tracking API embeds in an otherwise-200 response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingFault {
    pub code: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Envelope of a tracking lookup: the API reports its own return code in
/// the body, separate from the transport status.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingResponse {
    pub return_code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipment: Option<ShipmentRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<TrackingFault>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeoCoordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoCoordinates {
    /// Great-circle distance to `other` in kilometres (haversine).
    pub fn distance_km(&self, other: &GeoCoordinates) -> f64 {
        const EARTH_RADIUS_KM: f64 = 6371.0;
        let d_lat = (other.latitude - self.latitude).to_radians();
        let d_lon = (other.longitude - self.longitude).to_radians();
        let a = (d_lat / 2.0).sin().powi(2)
            + self.latitude.to_radians().cos()
                * other.latitude.to_radians().cos()
                * (d_lon / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
        EARTH_RADIUS_KM * c
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub street_number: Option<String>,
    pub street: String,
    pub postal_code: String,
    pub city: String,
    pub country: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpeningHours {
    pub day: String,
    pub opening_time: String,
    pub closing_time: String,
    pub closed: bool,
}

/// A post office or pickup point.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfficeRecord {
    pub id: String,
    pub name: String,
    /// Office kind (full office, relay point, ...)
    #[serde(rename = "type")]
    pub kind: String,
    pub address: Address,
    pub coordinates: GeoCoordinates,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub opening_hours: Vec<OpeningHours>,
    #[serde(default)]
    pub services: Vec<String>,
    #[serde(default)]
    pub accessibility: Vec<String>,
    /// Metres from the search centre, present on proximity results
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
}

/// Result page of an office search.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfficeSearchResult {
    #[serde(default)]
    pub total_results: u32,
    #[serde(default)]
    pub offices: Vec<OfficeRecord>,
}
