// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{Context, Result};
use clap::Parser;
use std::env;
use textlab_server::{
    api::{start_server, AppState, RouterConfig},
    config::ServerConfig,
    models::ModelManager,
};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    let config = ServerConfig::parse();
    // Reject a bad origin before spending time on model loading.
    let router_config = RouterConfig::try_from(&config)?;

    println!("🚀 Starting Text Lab server v{}...\n", env!("CARGO_PKG_VERSION"));

    println!("🧠 Loading models...");
    let models = ModelManager::load(&config.models())
        .await
        .context("Failed to load models")?;
    for model in models.list_models() {
        println!("   ✅ {} ({})", model.name, model.task);
    }

    info!(
        "Serving on {}:{} (CORS origin {})",
        config.host, config.port, config.cors_origin
    );
    start_server(
        AppState::new(models),
        &router_config,
        &config.host,
        config.port,
    )
    .await?;

    println!("👋 Text Lab server stopped");
    Ok(())
}
