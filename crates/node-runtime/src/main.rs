//! # SBP-Net Discovery Node
//!
//! Runs peer discovery and connection admission until Ctrl+C.
//! See `node_runtime::load_config` for the configuration sources.

use anyhow::Result;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use node_runtime::{load_config, NodeRuntime};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(true)
        .with_thread_ids(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = load_config()?;

    let mut runtime = NodeRuntime::new(&config).await?;
    runtime.start();

    info!(addr = %runtime.local_addr()?, "Node is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    runtime.shutdown().await;

    Ok(())
}
