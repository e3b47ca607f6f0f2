use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use furlough::config::Config;
use furlough::gateway::gateway_router;
use furlough::lifecycle::LifecycleService;
use furlough::readiness::Readiness;
use furlough::store::SqliteStore;
use furlough::transport::ChatClient;
use furlough::AppState;

const STARTUP_RETRY: Duration = Duration::from_secs(5);

async fn health_check(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let phase = if state.readiness.is_ready() {
        "ready"
    } else {
        "initializing"
    };
    Ok(Json(json!({
        "status": "healthy",
        "service": "furlough",
        "phase": phase,
    })))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;

    info!("Using request database: {}", config.database_path.display());
    let store =
        SqliteStore::new(&config.database_path).context("Failed to initialize SQLite database")?;

    let chat_client = ChatClient::new(config.chat_api_base.clone(), config.chat_bot_token.clone());
    let readiness = Readiness::new();

    let service = LifecycleService::new(
        Arc::new(store),
        Arc::new(chat_client.clone()),
        Arc::new(chat_client.clone()),
        readiness.clone(),
        config.review_surface.clone(),
        config.archive_surface.clone(),
    );

    let app_state = Arc::new(AppState {
        service,
        webhook_secret: config.gateway_webhook_secret.clone(),
        readiness: readiness.clone(),
    });

    // Serve immediately; entry points refuse events until the chat session
    // is verified and the readiness signal fires.
    let startup_client = chat_client;
    let startup_readiness = readiness;
    tokio::spawn(async move {
        loop {
            match startup_client.current_identity().await {
                Ok(identity) => {
                    info!(
                        "Chat session verified as {} ({})",
                        identity.display_name, identity.id
                    );
                    startup_readiness.mark_ready();
                    break;
                }
                Err(e) => {
                    error!(
                        "Chat session verification failed, retrying in {}s: {}",
                        STARTUP_RETRY.as_secs(),
                        e
                    );
                    tokio::time::sleep(STARTUP_RETRY).await;
                }
            }
        }
    });

    let app = Router::new()
        .route("/health", get(health_check))
        .merge(gateway_router(app_state.clone()))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(app_state.clone());

    let listener = TcpListener::bind(format!("{}:{}", config.host, config.port)).await?;
    info!("Gateway listening on {}:{}", config.host, config.port);

    axum::serve(listener, app).await?;

    Ok(())
}
