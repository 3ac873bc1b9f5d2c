// SPDX-FileCopyrightText: 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Postal Relay Service
//!
//! A form-submission relay and postal tracking proxy:
//!
//! - Tracking and post-office lookups proxied to the postal API, with
//!   per-client rate limiting and short-TTL response caching
//! - Contact, quote and vehicle reservation forms relayed by email
//! - A closed error taxonomy mapping every failure to a stable wire code
//!
//! ## Configuration
//!
//! Loaded from environment variables (a `.env` file is honoured):
//!
//! - `BIND_ADDR`: server bind address (default: 0.0.0.0:3000)
//! - `API_PREFIX`: route prefix (default: /api/v1)
//! - `MAX_REQUESTS_PER_WINDOW` / `RATE_WINDOW_SECS`: rate limiting (60/60)
//! - `POST_API_BASE_URL` / `POST_API_KEY` / `POST_API_TIMEOUT_SECS`:
//!   postal API access (timeout default: 10)
//! - `EMAIL_API_URL` / `EMAIL_API_KEY` / `EMAIL_CAPTURE_MODE`: outbound
//!   email (capture mode default: true)

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use postal_relay::{
    config::Config,
    handlers::{self, AppState},
    mailer::{CaptureMailer, HttpMailer, Mailer},
    middleware::rate_limit,
    unix_ms, PostalClient, RateLimiter, ResponseCache,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env();
    info!(
        bind_addr = %config.server.bind_addr,
        api_prefix = %config.server.api_prefix,
        max_requests = config.rate_limit.max_requests_per_window,
        window_secs = config.rate_limit.window_secs,
        upstream = %config.upstream.base_url,
        "Starting postal relay"
    );

    // Pick the email transport once, here; the transports themselves never
    // look at the environment.
    let mailer: Arc<dyn Mailer> = if config.email.capture_mode {
        info!("Email transport: capture (messages are logged, not delivered)");
        Arc::new(CaptureMailer::new())
    } else {
        info!(api_url = %config.email.api_url, "Email transport: HTTP API");
        Arc::new(HttpMailer::new(&config.email)?)
    };

    // Create application state
    let state = Arc::new(AppState {
        limiter: RateLimiter::new(&config.rate_limit),
        cache: ResponseCache::new(),
        postal: PostalClient::new(&config.upstream)?,
        mailer,
        config: config.clone(),
    });

    // Spawn the store sweep task
    let sweep_state = state.clone();
    let sweep_interval = config.cache.sweep_interval();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(sweep_interval);
        loop {
            interval.tick().await;
            let now_ms = unix_ms();
            sweep_state.limiter.sweep(now_ms).await;
            sweep_state.cache.sweep(now_ms).await;
        }
    });

    // API routes under the configured prefix
    let api = Router::new()
        .route("/tracking/:tracking_number", get(handlers::track_package))
        .route(
            "/tracking/:tracking_number/summary",
            get(handlers::tracking_summary),
        )
        .route("/post-offices/nearby", get(handlers::nearby_offices))
        .route(
            "/post-offices/postal-code/:postal_code",
            get(handlers::offices_by_postal_code),
        )
        .route("/post-offices/:id", get(handlers::office_by_id))
        .route("/contact", post(handlers::submit_contact))
        .route("/quote", post(handlers::submit_quote))
        .route("/reservations", post(handlers::create_reservation));

    // Restrictive CORS from the configured origin list
    let origins: Vec<axum::http::HeaderValue> = config
        .server
        .allowed_origins
        .split(',')
        .filter_map(|o| o.trim().parse().ok())
        .collect();
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::AUTHORIZATION,
        ]);

    // Build router
    let app = Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/health/email", get(handlers::email_health))
        .nest(&config.server.api_prefix, api)
        .fallback(handlers::not_found)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            rate_limit,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state);

    // Start server
    let addr: SocketAddr = config.server.bind_addr.parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, "Server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
