//! HTTP API gateway for Parley.
//!
//! Exposes the health check and the v1 conversation API over a shared
//! [`ConversationService`]. Built on Axum.

pub mod api_v1;

use axum::extract::{ConnectInfo, DefaultBodyLimit};
use axum::{
    Router,
    extract::State,
    http::{HeaderValue, Method, StatusCode, header},
    middleware::{self, Next},
    response::Json,
    routing::get,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{info, warn};

use parley_agent::{ConversationService, ServiceSettings, TokenCounter};
use parley_config::{AppConfig, GatewayConfig};
use parley_memory::InMemoryStore;

/// Headroom above the upload limit so oversized documents reach the
/// service and get a 400 instead of a bare 413.
const BODY_LIMIT_SLACK: usize = 64 * 1024;

/// Build the conversation service the gateway and CLI share: configured
/// provider, in-memory store, tokenizer for the configured encoding model.
pub fn build_service(config: &AppConfig) -> Result<Arc<ConversationService>, Box<dyn std::error::Error>> {
    let provider = parley_providers::build_from_config(config)?;
    let counter = TokenCounter::for_model(config.encoding_model())?;
    let store = InMemoryStore::new();

    let service = ConversationService::new(
        provider,
        Arc::new(store.clone()),
        Arc::new(store),
        counter,
        ServiceSettings::from_config(config),
    )?;
    Ok(Arc::new(service))
}

/// Build the full router: `/health`, the v1 API under `/v1`, and the
/// rate limit, CORS, body limit and trace layers.
pub fn build_router(api_state: api_v1::SharedApiState, config: &GatewayConfig) -> Router {
    let rate_limiter = Arc::new(RateLimiter::new(
        config.max_requests_per_minute,
        Duration::from_secs(60),
    ));

    Router::new()
        .route("/health", get(health_handler))
        .with_state(api_state.clone())
        .nest("/v1", api_v1::v1_router(api_state))
        .layer(DefaultBodyLimit::max(
            config.max_upload_bytes.saturating_add(BODY_LIMIT_SLACK),
        ))
        .layer(middleware::from_fn(move |req, next| {
            let limiter = rate_limiter.clone();
            rate_limit_middleware(limiter, req, next)
        }))
        .layer(cors_layer(&config.allowed_origins))
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// An empty origin list allows any origin. Unparseable origins are skipped.
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .max_age(Duration::from_secs(3600));

    if allowed_origins.is_empty() {
        return cors.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    cors.allow_origin(AllowOrigin::list(origins))
}

/// Start the gateway HTTP server.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let service = build_service(&config)?;
    info!(
        provider = service.provider_name(),
        store = service.store_name(),
        model = %config.llm.model,
        "Conversation service ready"
    );

    let api_state = Arc::new(api_v1::ApiV1State::new(service));
    let app = build_router(api_state, &config.gateway);

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
/// Tracks request timestamps per client key (forwarded address or peer IP).
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
        let now = Instant::now();
        let mut clients = self.clients.lock().unwrap_or_else(|e| e.into_inner());

        // Evict stale clients once the map grows large.
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

/// Client key: first `X-Forwarded-For` entry, then the peer address,
/// then "anonymous".
fn client_key(req: &axum::extract::Request) -> String {
    if let Some(forwarded) = req
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        return forwarded.to_string();
    }

    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "anonymous".to_string())
}

/// Returns 429 Too Many Requests when the client exceeds its window.
/// `/health` is exempt so monitoring can poll it freely.
async fn rate_limit_middleware(
    limiter: Arc<RateLimiter>,
    req: axum::extract::Request,
    next: Next,
) -> Result<axum::response::Response, StatusCode> {
    if req.uri().path() == "/health" {
        return Ok(next.run(req).await);
    }

    let client_key = client_key(&req);
    if !limiter.check(&client_key) {
        warn!(client = %client_key, "Rate limit exceeded");
        return Err(StatusCode::TOO_MANY_REQUESTS);
    }

    Ok(next.run(req).await)
}

// --- Handlers ---

#[derive(Serialize, Deserialize)]
struct HealthResponse {
    status: String,
    timestamp: chrono::DateTime<chrono::Utc>,
    database: String,
    llm_service: String,
    llm_provider: String,
    uptime_secs: i64,
    version: String,
}

async fn health_handler(State(state): State<api_v1::SharedApiState>) -> Json<HealthResponse> {
    let store_ok = state.service.store_healthy().await;
    let provider_ok = state.service.provider_healthy().await;
    let now = chrono::Utc::now();

    Json(HealthResponse {
        status: if store_ok && provider_ok { "healthy" } else { "degraded" }.to_string(),
        timestamp: now,
        database: if store_ok { "connected" } else { "disconnected" }.to_string(),
        llm_service: if provider_ok { "healthy" } else { "unhealthy" }.to_string(),
        llm_provider: state.service.provider_name().to_string(),
        uptime_secs: (now - state.start_time).num_seconds(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
