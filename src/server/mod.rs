//! Web server: the single-page form and the JSON API behind it

pub mod http;
pub mod page;

use anyhow::{Result, Context};
use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::Config;
use crate::llm::{ChatClient, CompletionBackend};
use crate::tracker::{SessionStore, Tracker};

/// Shared server state
#[derive(Clone)]
pub struct ServerState {
    pub config: Arc<Config>,
    pub tracker: Arc<Tracker>,
    pub sessions: Arc<SessionStore>,
}

impl ServerState {
    /// Build state around any completion backend
    pub fn new(config: Config, backend: Arc<dyn CompletionBackend>) -> Self {
        let tracker = Tracker::new(backend, config.scoring.seed);
        Self {
            config: Arc::new(config),
            tracker: Arc::new(tracker),
            sessions: SessionStore::new(),
        }
    }
}

/// Build the application router
pub fn router(state: ServerState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(page::index_page))
        .route("/api/status", get(http::status_handler))
        .route("/api/survey", get(http::survey_handler))
        .route("/api/sessions", post(http::create_session_handler))
        .route("/api/sessions/{id}/measures", post(http::recommend_handler))
        .route("/api/sessions/{id}/measures/latest", get(http::latest_measures_handler))
        .route("/api/sessions/{id}/analyze", post(http::analyze_handler))
        .route("/api/sessions/{id}/history", get(http::history_handler))
        .route("/api/sessions/{id}/history.csv", get(http::export_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Upper bound on the configured idle time (ten years)
const MAX_SESSION_IDLE_SECS: u64 = 10 * 365 * 24 * 60 * 60;

/// How often idle sessions are swept
const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(300);

/// Periodically drop sessions idle for longer than `max_idle`
pub fn spawn_session_sweeper(sessions: Arc<SessionStore>, max_idle: chrono::Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            sessions.cleanup(max_idle).await;
        }
    });
}

/// Start the web server
pub async fn start(config: Config) -> Result<()> {
    let client = ChatClient::from_config(&config.llm)
        .context("Failed to create LLM client")?;
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server bind address")?;

    let provider = client.provider().clone();
    let seeded = config.scoring.seed.is_some();
    let idle_secs = config.server.session_idle_secs;
    let state = ServerState::new(config, Arc::new(client));
    let max_idle = chrono::Duration::seconds(idle_secs.min(MAX_SESSION_IDLE_SECS) as i64);
    spawn_session_sweeper(state.sessions.clone(), max_idle);
    let app = router(state);

    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("     {}", crate::info());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!();
    println!("✓ Model: {}", provider.model);
    if provider.has_api_key() {
        println!("✓ API key: {}", provider.api_key_env);
    } else {
        println!("⚠ API key: {} not set, model calls will fail until it is", provider.api_key_env);
        warn!("{} is not set", provider.api_key_env);
    }
    println!("✓ Improvement draws: {}", if seeded { "seeded" } else { "random" });
    println!("✓ Idle sessions expire after {}s", idle_secs);
    println!();
    println!("🚀 Listening on http://{}", addr);

    info!("Binding to {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}
