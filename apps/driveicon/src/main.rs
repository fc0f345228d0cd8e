//! DriveIcon entry point.

mod app;
mod command;
mod config;
mod mounts;
mod volumes;

use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    // Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting DriveIcon");

    let config = config::Config::load()?;
    tracing::info!(volumes = config.volumes.len(), "configuration loaded");

    // The menu model is single-threaded, so everything runs on one thread.
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let local = tokio::task::LocalSet::new();
    local.block_on(&rt, app::run(config))?;

    tracing::info!("DriveIcon shut down cleanly");
    Ok(())
}
