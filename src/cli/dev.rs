//! The `dev` command: run the full dev loop until Ctrl+C.

use std::sync::Arc;

use anyhow::{Context, Result};
use crossbeam::channel::{Receiver, bounded};

use crate::actor::coordinator::Coordinator;
use crate::config::DevConfig;

/// Install a Ctrl+C handler delivering one shutdown signal.
fn setup_shutdown_handler() -> Result<Receiver<()>> {
    let (tx, rx) = bounded(1);
    ctrlc::set_handler(move || {
        let _ = tx.try_send(());
    })
    .context("failed to install Ctrl+C handler")?;
    Ok(rx)
}

pub fn run(config: DevConfig) -> Result<()> {
    let shutdown_rx = setup_shutdown_handler()?;

    crate::log!(
        "dev";
        "watching {} ({})",
        config.module_path.display(),
        config.class_name
    );

    let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
    runtime.block_on(
        Coordinator::new(Arc::new(config))
            .with_shutdown_signal(shutdown_rx)
            .run(),
    )
}
