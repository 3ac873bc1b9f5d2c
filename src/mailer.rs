// SPDX-FileCopyrightText: 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Outbound email: message composition and delivery transports.
//!
//! Delivery is a capability behind the [`Mailer`] trait with the concrete
//! transport chosen once, at construction time, by the caller — the
//! transports themselves never inspect the environment. [`HttpMailer`]
//! posts to a SparkPost-style transmissions API; [`CaptureMailer`] records
//! messages in memory for development and tests.

use crate::config::EmailConfig;
use crate::error::{ApiError, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// One outbound message, transport-agnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundEmail {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
    pub reply_to: Option<String>,
}

/// Delivery capability. Implementations must not retry; a failed send
/// surfaces immediately as a classified error.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutboundEmail) -> Result<()>;
}

/// Transport posting to an HTTP transmissions API.
pub struct HttpMailer {
    http: reqwest::Client,
    api_url: String,
    sender_name: String,
    sender_address: String,
}

impl HttpMailer {
    pub fn new(config: &EmailConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&config.api_key)
                .map_err(|_| ApiError::internal("email API key is not a valid header value"))?,
        );
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| ApiError::internal(format!("failed to build email client: {e}")))?;

        Ok(Self {
            http,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            sender_name: config.sender_name.clone(),
            sender_address: config.sender_address.clone(),
        })
    }

    fn transmission_body(&self, email: &OutboundEmail) -> Value {
        let mut content = json!({
            "from": { "name": self.sender_name, "email": self.sender_address },
            "subject": email.subject,
            "text": email.text,
            "html": email.html,
        });
        if let Some(reply_to) = &email.reply_to {
            content["reply_to"] = json!(reply_to);
        }
        json!({
            "content": content,
            "recipients": [ { "address": { "email": email.to } } ],
        })
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, email: &OutboundEmail) -> Result<()> {
        let url = format!("{}/transmissions", self.api_url);
        let response = self
            .http
            .post(&url)
            .json(&self.transmission_body(email))
            .send()
            .await
            .map_err(|e| {
                warn!(cause = %e, "no response from email provider");
                ApiError::external_api("email", "no response received")
                    .with_details(json!({ "transport": "no-response", "cause": e.to_string() }))
            })?;

        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            let detail = response.json::<Value>().await.unwrap_or(Value::Null);
            return Err(ApiError::external_api("email", "provider rejected the message")
                .with_details(json!({ "upstreamStatus": status, "upstream": detail })));
        }

        info!(to = %email.to, subject = %email.subject, "email sent");
        Ok(())
    }
}

/// Transport that keeps messages in memory instead of sending them.
#[derive(Default)]
pub struct CaptureMailer {
    sent: Mutex<Vec<OutboundEmail>>,
}

impl CaptureMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything captured so far.
    pub async fn sent(&self) -> Vec<OutboundEmail> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl Mailer for CaptureMailer {
    async fn send(&self, email: &OutboundEmail) -> Result<()> {
        info!(to = %email.to, subject = %email.subject, "email captured (not sent)");
        debug!(text = %email.text, "captured email body");
        self.sent.lock().await.push(email.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Message composition
// ---------------------------------------------------------------------------

/// A validated contact form submission.
#[derive(Debug, Clone)]
pub struct ContactSubmission {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub subject: String,
    pub message: String,
}

/// A validated quote request.
#[derive(Debug, Clone)]
pub struct QuoteRequest {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub service_type: String,
    pub pickup: String,
    pub delivery: String,
    pub date: String,
    pub description: String,
}

/// A validated vehicle reservation.
#[derive(Debug, Clone)]
pub struct VehicleReservation {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub start_date: String,
    pub end_date: String,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub pickup_location: String,
    pub dropoff_location: Option<String>,
    pub additional_services: Vec<String>,
}

/// Message to the company inbox for a contact submission. Reply-To points
/// back at the submitter.
pub fn contact_notification(config: &EmailConfig, form: &ContactSubmission) -> OutboundEmail {
    let phone = form.phone.as_deref().unwrap_or("not provided");
    OutboundEmail {
        to: config.contact_recipient.clone(),
        subject: format!("New contact message: {}", form.subject),
        text: format!(
            "New contact message\n\nName: {}\nEmail: {}\nPhone: {}\nSubject: {}\n\nMessage:\n{}",
            form.name, form.email, phone, form.subject, form.message
        ),
        html: format!(
            "<h2>New contact message</h2>\
             <p><strong>Name:</strong> {}</p>\
             <p><strong>Email:</strong> {}</p>\
             <p><strong>Phone:</strong> {}</p>\
             <p><strong>Subject:</strong> {}</p>\
             <h3>Message:</h3><p>{}</p>",
            form.name,
            form.email,
            phone,
            form.subject,
            form.message.replace('\n', "<br>")
        ),
        reply_to: Some(form.email.clone()),
    }
}

/// Acknowledgement back to the submitter.
pub fn contact_confirmation(config: &EmailConfig, form: &ContactSubmission) -> OutboundEmail {
    OutboundEmail {
        to: form.email.clone(),
        subject: format!("We received your message: {}", form.subject),
        text: format!(
            "Hello {},\n\nWe received your message about \"{}\".\nOur team will get back to you shortly.\n\nThank you for contacting us.\n\n{} team",
            form.name, form.subject, config.sender_name
        ),
        html: format!(
            "<h2>Your message was received</h2>\
             <p>Hello {},</p>\
             <p>We received your message about \"{}\".</p>\
             <p>Our team will get back to you shortly.</p>\
             <p>Thank you for contacting us.</p>\
             <p>{} team</p>",
            form.name, form.subject, config.sender_name
        ),
        reply_to: None,
    }
}

pub fn quote_notification(config: &EmailConfig, form: &QuoteRequest) -> OutboundEmail {
    OutboundEmail {
        to: config.contact_recipient.clone(),
        subject: format!("New quote request - {}", form.service_type),
        text: format!(
            "New quote request\n\nName: {}\nEmail: {}\nService: {}\nPickup: {}\nDelivery: {}\nRequested date: {}\n\nDescription:\n{}",
            form.name,
            form.email,
            form.service_type,
            form.pickup,
            form.delivery,
            form.date,
            form.description
        ),
        html: format!(
            "<h2>New quote request</h2>\
             <p><strong>Name:</strong> {}</p>\
             <p><strong>Email:</strong> {}</p>\
             <p><strong>Service:</strong> {}</p>\
             <p><strong>Pickup:</strong> {}</p>\
             <p><strong>Delivery:</strong> {}</p>\
             <p><strong>Requested date:</strong> {}</p>\
             <h3>Description:</h3><p>{}</p>",
            form.name,
            form.email,
            form.service_type,
            form.pickup,
            form.delivery,
            form.date,
            form.description.replace('\n', "<br>")
        ),
        reply_to: Some(form.email.clone()),
    }
}

pub fn quote_confirmation(config: &EmailConfig, form: &QuoteRequest) -> OutboundEmail {
    OutboundEmail {
        to: form.email.clone(),
        subject: format!("Your quote request - {}", config.sender_name),
        text: format!(
            "Hello {},\n\nWe received your quote request for \"{}\".\nOur sales team will study it and contact you within one business day with an offer.\n\nThank you for your trust.\n\n{} team",
            form.name, form.service_type, config.sender_name
        ),
        html: format!(
            "<h2>Your quote request was received</h2>\
             <p>Hello {},</p>\
             <p>We received your quote request for \"{}\".</p>\
             <p>Our sales team will study it and contact you within one business day with an offer.</p>\
             <p>Thank you for your trust.</p>\
             <p>{} team</p>",
            form.name, form.service_type, config.sender_name
        ),
        reply_to: None,
    }
}

pub fn reservation_notification(config: &EmailConfig, form: &VehicleReservation) -> OutboundEmail {
    let services = if form.additional_services.is_empty() {
        "none".to_string()
    } else {
        form.additional_services.join(", ")
    };
    let start_time = form.start_time.as_deref().unwrap_or("--");
    let end_time = form.end_time.as_deref().unwrap_or("--");
    let dropoff = form.dropoff_location.as_deref().unwrap_or(&form.pickup_location);
    OutboundEmail {
        to: config.contact_recipient.clone(),
        subject: "New vehicle reservation".to_string(),
        text: format!(
            "New vehicle reservation\n\nName: {}\nEmail: {}\nPhone: {}\n\nFrom: {} at {}\nTo: {} at {}\nPickup location: {}\nDropoff location: {}\nAdditional services: {}",
            form.name,
            form.email,
            form.phone,
            form.start_date,
            start_time,
            form.end_date,
            end_time,
            form.pickup_location,
            dropoff,
            services
        ),
        html: format!(
            "<h2>New vehicle reservation</h2>\
             <p><strong>Name:</strong> {}</p>\
             <p><strong>Email:</strong> {}</p>\
             <p><strong>Phone:</strong> {}</p>\
             <h3>Reservation details:</h3>\
             <p><strong>From:</strong> {} at {}</p>\
             <p><strong>To:</strong> {} at {}</p>\
             <p><strong>Pickup location:</strong> {}</p>\
             <p><strong>Dropoff location:</strong> {}</p>\
             <p><strong>Additional services:</strong> {}</p>",
            form.name,
            form.email,
            form.phone,
            form.start_date,
            start_time,
            form.end_date,
            end_time,
            form.pickup_location,
            dropoff,
            services
        ),
        reply_to: Some(form.email.clone()),
    }
}

pub fn reservation_confirmation(config: &EmailConfig, form: &VehicleReservation) -> OutboundEmail {
    let start_time = form.start_time.as_deref().unwrap_or("--");
    let end_time = form.end_time.as_deref().unwrap_or("--");
    OutboundEmail {
        to: form.email.clone(),
        subject: format!("Vehicle reservation received - {}", config.sender_name),
        text: format!(
            "Hello {},\n\nWe received your vehicle reservation.\n\nFrom: {} at {}\nTo: {} at {}\nPickup location: {}\n\nA member of our team will contact you shortly to confirm the details.\n\nThank you for your trust.\n\n{} team",
            form.name,
            form.start_date,
            start_time,
            form.end_date,
            end_time,
            form.pickup_location,
            config.sender_name
        ),
        html: format!(
            "<h2>Your vehicle reservation was received</h2>\
             <p>Hello {},</p>\
             <p><strong>From:</strong> {} at {}</p>\
             <p><strong>To:</strong> {} at {}</p>\
             <p><strong>Pickup location:</strong> {}</p>\
             <p>A member of our team will contact you shortly to confirm the details.</p>\
             <p>Thank you for your trust.</p>\
             <p>{} team</p>",
            form.name,
            form.start_date,
            start_time,
            form.end_date,
            end_time,
            form.pickup_location,
            config.sender_name
        ),
        reply_to: None,
    }
}

/// Probe message used by the email health check.
pub fn test_message(config: &EmailConfig, timestamp: &str) -> OutboundEmail {
    OutboundEmail {
        to: config.contact_recipient.clone(),
        subject: "Postal relay email test".to_string(),
        text: format!("This is a test email sent by the postal relay at {timestamp}"),
        html: format!("<p>This is a test email sent by the postal relay at {timestamp}</p>"),
        reply_to: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> EmailConfig {
        EmailConfig::default()
    }

    fn contact() -> ContactSubmission {
        ContactSubmission {
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            phone: None,
            subject: "Delivery question".to_string(),
            message: "First line\nsecond line".to_string(),
        }
    }

    #[tokio::test]
    async fn test_capture_mailer_records_messages() {
        let mailer = CaptureMailer::new();
        let email = contact_notification(&config(), &contact());
        mailer.send(&email).await.unwrap();
        mailer.send(&email).await.unwrap();
        let sent = mailer.sent().await;
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0], email);
    }

    #[test]
    fn test_notification_targets_company_inbox() {
        let email = contact_notification(&config(), &contact());
        assert_eq!(email.to, "contact@bld-express.fr");
        assert_eq!(email.reply_to.as_deref(), Some("ada@example.com"));
        assert!(email.text.contains("Phone: not provided"));
        assert!(email.html.contains("second line<br>") || email.html.contains("First line<br>second line"));
    }

    #[test]
    fn test_confirmation_targets_submitter() {
        let email = contact_confirmation(&config(), &contact());
        assert_eq!(email.to, "ada@example.com");
        assert!(email.reply_to.is_none());
        assert!(email.subject.contains("Delivery question"));
    }

    #[test]
    fn test_reservation_defaults_dropoff_to_pickup() {
        let form = VehicleReservation {
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            phone: "0123456789".to_string(),
            start_date: "2026-08-10".to_string(),
            end_date: "2026-08-12".to_string(),
            start_time: None,
            end_time: None,
            pickup_location: "Toulouse".to_string(),
            dropoff_location: None,
            additional_services: vec![],
        };
        let email = reservation_notification(&config(), &form);
        assert!(email.text.contains("Dropoff location: Toulouse"));
        assert!(email.text.contains("Additional services: none"));
    }

    #[test]
    fn test_transmission_body_shape() {
        let mailer = HttpMailer::new(&config()).unwrap();
        let email = contact_notification(&config(), &contact());
        let body = mailer.transmission_body(&email);
        assert_eq!(body["recipients"][0]["address"]["email"], "contact@bld-express.fr");
        assert_eq!(body["content"]["from"]["email"], "no-reply@bld-express.fr");
        assert_eq!(body["content"]["reply_to"], "ada@example.com");
    }
}
