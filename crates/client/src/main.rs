//! zkgrid client binary.
//!
//! Composition root for a local development session: loads configuration,
//! sets up logging, and plays a short scripted game against the in-memory
//! chain with the stub prover.
//!
//! # Examples
//!
//! ```bash
//! RUST_LOG=runtime=debug,info cargo run -p zkgrid-client
//! LOG_DIR=/tmp/zkgrid MINING_SEARCH_STEPS=25 cargo run -p zkgrid-client
//! ```

mod config;
mod logging;
mod session;

use anyhow::Result;
use runtime::RuntimeConfig;

use crate::config::SessionConfig;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let session_config = SessionConfig::from_env();
    let runtime_config = RuntimeConfig::from_env();

    let _log_guard = logging::setup_logging(session_config.log_dir.as_deref())?;

    tracing::info!("Starting zkgrid client");
    tracing::debug!(?runtime_config, ?session_config, "configuration loaded");

    session::run(session_config, runtime_config).await?;

    tracing::info!("Client shutdown complete");
    Ok(())
}
