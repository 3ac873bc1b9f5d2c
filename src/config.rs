// SPDX-FileCopyrightText: 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Configuration for the postal relay service.
//!
//! Every field has a serde default so the service starts with no
//! environment at all; [`Config::from_env`] overrides individual fields
//! from environment variables.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Top-level service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Per-client rate limiting
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Response caching
    #[serde(default)]
    pub cache: CacheConfig,

    /// Postal API client
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// Outbound email
    #[serde(default)]
    pub email: EmailConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server bind address (default: 0.0.0.0:3000)
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Path prefix for API routes (default: /api/v1)
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,

    /// Deployment environment label, reported by the health endpoint
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Comma-separated CORS origins (default: https://localhost)
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: String,
}

/// Fixed-window rate limiting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Maximum requests per window per client (default: 60)
    #[serde(default = "default_max_requests")]
    pub max_requests_per_window: u32,

    /// Window length in seconds (default: 60)
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// TTL for post-office lookup responses in seconds (default: 300)
    #[serde(default = "default_office_ttl_secs")]
    pub office_ttl_secs: u64,

    /// Interval between store sweeps in seconds (default: 60)
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Postal API base URL (default: https://api.laposte.fr)
    #[serde(default = "default_upstream_base_url")]
    pub base_url: String,

    /// Value sent in the X-Okapi-Key header
    #[serde(default)]
    pub api_key: String,

    /// Per-call timeout in seconds (default: 10)
    #[serde(default = "default_upstream_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    /// Transmissions API base URL (default: https://api.eu.sparkpost.com/api/v1)
    #[serde(default = "default_email_api_url")]
    pub api_url: String,

    /// Provider API key
    #[serde(default)]
    pub api_key: String,

    /// Display name on outbound mail (default: BLD Express)
    #[serde(default = "default_sender_name")]
    pub sender_name: String,

    /// From address (default: no-reply@bld-express.fr)
    #[serde(default = "default_sender_address")]
    pub sender_address: String,

    /// Inbox that receives form submissions (default: contact@bld-express.fr)
    #[serde(default = "default_contact_recipient")]
    pub contact_recipient: String,

    /// When true, mail is captured in memory instead of sent (default: true)
    #[serde(default = "default_true")]
    pub capture_mode: bool,

    /// Key guarding the email health-check endpoint
    #[serde(default = "default_health_check_key")]
    pub health_check_api_key: String,
}

// Default value functions
fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_api_prefix() -> String {
    "/api/v1".to_string()
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_allowed_origins() -> String {
    "https://localhost".to_string()
}

fn default_max_requests() -> u32 {
    60
}

fn default_window_secs() -> u64 {
    60
}

fn default_office_ttl_secs() -> u64 {
    300
}

fn default_sweep_interval_secs() -> u64 {
    60
}

fn default_upstream_base_url() -> String {
    "https://api.laposte.fr".to_string()
}

fn default_upstream_timeout_secs() -> u64 {
    10
}

fn default_email_api_url() -> String {
    "https://api.eu.sparkpost.com/api/v1".to_string()
}

fn default_sender_name() -> String {
    "BLD Express".to_string()
}

fn default_sender_address() -> String {
    "no-reply@bld-express.fr".to_string()
}

fn default_contact_recipient() -> String {
    "contact@bld-express.fr".to_string()
}

fn default_health_check_key() -> String {
    "api_test_key".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            rate_limit: RateLimitConfig::default(),
            cache: CacheConfig::default(),
            upstream: UpstreamConfig::default(),
            email: EmailConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            api_prefix: default_api_prefix(),
            environment: default_environment(),
            allowed_origins: default_allowed_origins(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests_per_window: default_max_requests(),
            window_secs: default_window_secs(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            office_ttl_secs: default_office_ttl_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_upstream_base_url(),
            api_key: String::new(),
            timeout_secs: default_upstream_timeout_secs(),
        }
    }
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            api_url: default_email_api_url(),
            api_key: String::new(),
            sender_name: default_sender_name(),
            sender_address: default_sender_address(),
            contact_recipient: default_contact_recipient(),
            capture_mode: default_true(),
            health_check_api_key: default_health_check_key(),
        }
    }
}

impl RateLimitConfig {
    /// Get the rate window duration
    pub fn window_duration(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

impl CacheConfig {
    pub fn office_ttl(&self) -> Duration {
        Duration::from_secs(self.office_ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

impl UpstreamConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset.
    pub fn from_env() -> Self {
        Self {
            server: ServerConfig {
                bind_addr: env_or("BIND_ADDR", default_bind_addr),
                api_prefix: env_or("API_PREFIX", default_api_prefix),
                environment: env_or("ENVIRONMENT", default_environment),
                allowed_origins: env_or("ALLOWED_ORIGINS", default_allowed_origins),
            },
            rate_limit: RateLimitConfig {
                max_requests_per_window: env_parse("MAX_REQUESTS_PER_WINDOW", default_max_requests),
                window_secs: env_parse("RATE_WINDOW_SECS", default_window_secs),
            },
            cache: CacheConfig {
                office_ttl_secs: env_parse("OFFICE_CACHE_TTL_SECS", default_office_ttl_secs),
                sweep_interval_secs: env_parse("SWEEP_INTERVAL_SECS", default_sweep_interval_secs),
            },
            upstream: UpstreamConfig {
                base_url: env_or("POST_API_BASE_URL", default_upstream_base_url),
                api_key: std::env::var("POST_API_KEY").unwrap_or_default(),
                timeout_secs: env_parse("POST_API_TIMEOUT_SECS", default_upstream_timeout_secs),
            },
            email: EmailConfig {
                api_url: env_or("EMAIL_API_URL", default_email_api_url),
                api_key: std::env::var("EMAIL_API_KEY").unwrap_or_default(),
                sender_name: env_or("EMAIL_SENDER_NAME", default_sender_name),
                sender_address: env_or("EMAIL_SENDER_ADDRESS", default_sender_address),
                contact_recipient: env_or("CONTACT_EMAIL", default_contact_recipient),
                capture_mode: env_parse("EMAIL_CAPTURE_MODE", default_true),
                health_check_api_key: env_or("HEALTH_CHECK_API_KEY", default_health_check_key),
            },
        }
    }
}

fn env_or(name: &str, fallback: fn() -> String) -> String {
    std::env::var(name).unwrap_or_else(|_| fallback())
}

fn env_parse<T: std::str::FromStr>(name: &str, fallback: fn() -> T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or_else(fallback)
}
