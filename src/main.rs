use axum::http::HeaderValue;
use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod chain;
mod config;
mod constants;
mod crypto;
mod error;
mod ledger;
mod services;
mod units;

use chain::ChainClient;
use config::Config;
use constants::API_VERSION;
use crypto::authority::AuthoritySigner;
use ledger::LedgerClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "weave_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    config.validate()?;

    tracing::info!("Starting Weave Backend Server");
    tracing::info!("Environment: {}", config.environment);
    tracing::info!("API Version: {}", API_VERSION);
    if config.is_testnet() {
        tracing::info!("Running against a test cluster; escrow funds are not real");
    }

    // A missing or malformed authority key aborts start-up; it must never
    // surface as a per-request error.
    let authority = AuthoritySigner::from_config(&config)?;
    tracing::info!("Settlement authority: {}", authority.pubkey());

    let ledger = LedgerClient::from_config(&config)
        .map_err(|e| anyhow::anyhow!("ledger client init: {e}"))?;
    let chain = ChainClient::from_config(&config)
        .map_err(|e| anyhow::anyhow!("chain client init: {e}"))?;

    let app_state = api::AppState {
        ledger,
        chain,
        authority,
        config: config.clone(),
    };

    let app = build_router(app_state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn build_router(state: api::AppState) -> Router {
    let cors = cors_from_config(&state.config);

    Router::new()
        // Health check
        .route("/health", get(api::health::health_check))
        // Authentication (no bearer token)
        .route("/api/v1/auth/challenge", post(api::auth::issue_challenge))
        .route("/api/v1/auth/verify", post(api::auth::verify_challenge))
        // Session & escrow state
        .route("/api/v1/session/state", post(api::session::session_state))
        // Round lifecycle
        .route("/api/v1/round/start", post(api::round::round_start))
        .route("/api/v1/round/end", post(api::round::round_end))
        .route("/api/v1/round/abort", post(api::round::round_abort))
        // Settlement (withdrawal prepare + sign)
        .route(
            "/api/v1/settlement/authorize",
            post(api::settlement::authorize_withdrawal),
        )
        // Settled round reads
        .route("/api/v1/history", get(api::leaderboard::get_history))
        .route("/api/v1/leaderboard", get(api::leaderboard::get_leaderboard))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn cors_from_config(config: &Config) -> CorsLayer {
    let raw = config.cors_allowed_origins.trim();
    if raw.is_empty() || raw == "*" {
        return CorsLayer::very_permissive();
    }

    let allowed: Vec<HeaderValue> = raw
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse::<HeaderValue>().ok())
        .collect();

    if allowed.is_empty() {
        tracing::warn!("No valid CORS origins parsed; falling back to permissive");
        return CorsLayer::very_permissive();
    }

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(Any)
        .allow_headers(Any)
}
