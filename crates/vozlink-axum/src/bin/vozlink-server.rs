//! vozlink server binary.
//!
//! Loads configuration from the environment (a local `.env` is honored),
//! installs the tracing subscriber, and serves the webhook + media-stream
//! endpoints until the process is stopped.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use vozlink_axum::{AxumContext, serve};

/// Default HTTP port when `PORT` is not set.
const DEFAULT_PORT: u16 = 3000;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let context = AxumContext::from_env().context("loading configuration")?;

    let port = match std::env::var("PORT") {
        Ok(raw) => raw.parse::<u16>().context("PORT must be a port number")?,
        Err(_) => DEFAULT_PORT,
    };
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    serve(addr, Arc::new(context)).await
}
