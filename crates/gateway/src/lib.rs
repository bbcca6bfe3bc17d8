//! HTTP API gateway for promptseq.
//!
//! Exposes the health check and the `/api` routes for executing prompt
//! sequences and converting them to and from CSV.
//!
//! Built on Axum. Every execution builds its own sequencer, so the only
//! state shared between requests is the provider and the configuration.

pub mod api;

use axum::extract::{ConnectInfo, DefaultBodyLimit};
use axum::{
    Router,
    extract::State,
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Json},
    routing::get,
};
use promptseq_core::prompt::PromptDefaults;
use promptseq_core::provider::Provider;
use serde::Serialize;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{info, warn};

/// Shared application state for the gateway.
pub struct GatewayState {
    pub provider: Arc<dyn Provider>,
    pub config: promptseq_config::AppConfig,
    pub start_time: chrono::DateTime<chrono::Utc>,
}

impl GatewayState {
    pub fn new(provider: Arc<dyn Provider>, config: promptseq_config::AppConfig) -> Self {
        Self {
            provider,
            config,
            start_time: chrono::Utc::now(),
        }
    }

    pub fn prompt_defaults(&self) -> PromptDefaults {
        self.config.prompt_defaults()
    }
}

pub type SharedState = Arc<GatewayState>;

/// Build the full router.
///
/// Layers applied:
/// - sliding-window rate limiting on `/api` (when enabled)
/// - CORS restricted to `gateway.allowed_origin`
/// - request body limit from `gateway.body_limit_bytes`
/// - HTTP trace logging
pub fn build_router(state: SharedState) -> Router {
    let gateway = &state.config.gateway;
    let rate_limit = &state.config.rate_limit;

    let cors = match gateway.allowed_origin.parse::<axum::http::HeaderValue>() {
        Ok(origin) => CorsLayer::new().allow_origin(AllowOrigin::exact(origin)),
        Err(_) => {
            warn!(origin = %gateway.allowed_origin, "Invalid allowed_origin, CORS disabled");
            CorsLayer::new()
        }
    }
    .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
    .allow_headers([
        axum::http::header::CONTENT_TYPE,
        axum::http::header::AUTHORIZATION,
    ])
    .max_age(Duration::from_secs(3600));

    let mut api = api::api_router(state.clone());
    if rate_limit.enabled {
        let limiter = Arc::new(RateLimiter::new(
            rate_limit.max_requests,
            Duration::from_secs(rate_limit.window_secs),
        ));
        api = api.layer(middleware::from_fn(move |req, next| {
            let limiter = limiter.clone();
            rate_limit_middleware(limiter, req, next)
        }));
    }

    let body_limit = gateway.body_limit_bytes;

    Router::new()
        .route("/health", get(health_handler))
        .with_state(state)
        .nest("/api", api)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Start the gateway HTTP server.
pub async fn start(config: promptseq_config::AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    if !config.has_api_key() {
        warn!("No API key configured; completion calls will fail until one is set");
    }

    let router = promptseq_providers::router::build_from_config(&config);
    let provider = router.default().ok_or_else(|| {
        format!(
            "Default provider '{}' is not available",
            config.default_provider
        )
    })?;

    let state = Arc::new(GatewayState::new(provider, config));
    let app = build_router(state);

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

// --- Rate Limiter ---

/// Simple in-memory sliding-window rate limiter.
///
/// Tracks request timestamps per client key.
/// Thread-safe via `std::sync::Mutex` (non-async, held briefly).
struct RateLimiter {
    max_requests: usize,
    window: Duration,
    clients: std::sync::Mutex<HashMap<String, Vec<Instant>>>,
}

impl RateLimiter {
    fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            clients: std::sync::Mutex::new(HashMap::new()),
        }
    }

    /// Check if the client is within rate limits. Returns `true` if allowed.
    fn check(&self, client_key: &str) -> bool {
        self.check_at(client_key, Instant::now())
    }

    fn check_at(&self, client_key: &str, now: Instant) -> bool {
        let mut clients = self.clients.lock().unwrap_or_else(|e| e.into_inner());

        // Evict stale clients once the map gets large
        if clients.len() > 10_000 {
            clients.retain(|_, timestamps| {
                timestamps
                    .last()
                    .is_some_and(|t| now.duration_since(*t) < self.window)
            });
        }

        let timestamps = clients.entry(client_key.to_string()).or_default();
        timestamps.retain(|t| now.duration_since(*t) < self.window);

        if timestamps.len() >= self.max_requests {
            return false;
        }

        timestamps.push(now);
        true
    }
}

/// Keys clients by peer IP, or "anonymous" when the server was not started
/// with connect info. Returns 429 once the window is full.
async fn rate_limit_middleware(
    limiter: Arc<RateLimiter>,
    req: axum::extract::Request,
    next: Next,
) -> axum::response::Response {
    let client_key = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "anonymous".to_string());

    if !limiter.check(&client_key) {
        warn!(client = %client_key, "Rate limit exceeded");
        return api::ApiError::new(
            StatusCode::TOO_MANY_REQUESTS,
            "Too many requests, please try again later.",
        )
        .into_response();
    }

    next.run(req).await
}

// --- Handlers ---

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    uptime_secs: i64,
}

async fn health_handler(State(state): State<SharedState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: (chrono::Utc::now() - state.start_time).num_seconds(),
    })
}
