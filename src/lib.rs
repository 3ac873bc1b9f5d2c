// SPDX-FileCopyrightText: 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Postal Relay
//!
//! This crate is a form-submission relay and postal tracking proxy:
//!
//! - Per-client fixed-window rate limiting with periodic sweeping
//! - Short-TTL caching of successful office lookups
//! - A postal API client that classifies every failure into a closed
//!   error taxonomy with deterministic status codes
//! - Contact / quote / reservation form relaying over email

pub mod cache;
pub mod config;
pub mod error;
pub mod handlers;
pub mod limiter;
pub mod mailer;
pub mod middleware;
pub mod models;
pub mod upstream;
pub mod validator;

pub use cache::ResponseCache;
pub use config::Config;
pub use error::{ApiError, ErrorKind};
pub use limiter::{Admission, RateLimiter};
pub use mailer::{CaptureMailer, HttpMailer, Mailer};
pub use upstream::PostalClient;

use std::time::{SystemTime, UNIX_EPOCH};

/// Current unix time in milliseconds. The single clock read threaded into
/// the limiter and cache, which take explicit timestamps.
pub fn unix_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
