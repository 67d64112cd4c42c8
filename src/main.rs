// src/main.rs

//! # mdlive entry point
//!
//! Loads configuration, installs logging, then runs the server until Ctrl-C.

use anyhow::Result;
use std::sync::Arc;

use mdlive::config::ServerConfig;
use mdlive::logger;
use mdlive::server::Server;

#[tokio::main]
async fn main() -> Result<()> {
    let config = match ServerConfig::load() {
        Ok(cfg) => Arc::new(cfg),
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            std::process::exit(1);
        }
    };

    logger::init(&config.log_level)?;
    tracing::debug!("mdlive starting with configuration: {:?}", config);

    let server = match Server::bind(Arc::clone(&config)).await {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("{:#}", e);
            std::process::exit(1);
        }
    };

    server
        .serve(async {
            match tokio::signal::ctrl_c().await {
                Ok(()) => tracing::info!("Ctrl-C received, initiating shutdown..."),
                Err(err) => tracing::error!("Failed to listen for Ctrl-C signal: {}", err),
            }
        })
        .await?;

    tracing::info!("mdlive shut down gracefully.");
    Ok(())
}
