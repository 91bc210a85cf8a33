// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::Context;
use axum::{
    extract::{DefaultBodyLimit, State},
    http::HeaderValue,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowHeaders, AllowMethods, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

use super::{qa_handler, search_handler, summarize_handler};
use crate::config::ServerConfig;
use crate::models::{ModelInfo, ModelManager};

/// Shared handler state: the read-only pipeline set.
#[derive(Clone)]
pub struct AppState {
    pub models: Arc<ModelManager>,
}

impl AppState {
    pub fn new(models: ModelManager) -> Self {
        Self {
            models: Arc::new(models),
        }
    }
}

/// Cross-cutting router settings.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Only origin granted cross-origin access (credentials allowed)
    pub cors_origin: HeaderValue,
    /// Request body cap, applied to uploads and JSON alike
    pub max_upload_bytes: usize,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            cors_origin: HeaderValue::from_static("http://localhost:3000"),
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

impl TryFrom<&ServerConfig> for RouterConfig {
    type Error = anyhow::Error;

    fn try_from(config: &ServerConfig) -> Result<Self, Self::Error> {
        Ok(Self {
            cors_origin: config.cors_origin()?,
            max_upload_bytes: config.max_upload_bytes,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthResponse {
    pub status: String,
    pub models: Vec<ModelInfo>,
}

/// Builds the application router with all routes and layers.
pub fn create_app(state: AppState, config: &RouterConfig) -> Router {
    // Credentials rule out wildcards, so methods and headers are mirrored.
    let cors = CorsLayer::new()
        .allow_origin(config.cors_origin.clone())
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request());

    Router::new()
        .route("/health", get(health_handler))
        .route("/summarize/", post(summarize_handler))
        .route("/qa/", post(qa_handler))
        .route("/search/", post(search_handler))
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Binds `host:port` and serves until Ctrl-C or SIGTERM.
pub async fn start_server(
    state: AppState,
    config: &RouterConfig,
    host: &str,
    port: u16,
) -> anyhow::Result<()> {
    let app = create_app(state, config);

    let listener = bind_listener(host, port).await?;
    info!("HTTP API server listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("HTTP API server stopped");
    Ok(())
}

/// Binds a listener, resolving `host` as a hostname or IPv4/IPv6 literal.
pub async fn bind_listener(host: &str, port: u16) -> anyhow::Result<TcpListener> {
    TcpListener::bind((host, port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", host, port))
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        models: state.models.list_models(),
    })
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl-C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, draining connections");
}
