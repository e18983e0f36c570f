//! Coordinator - wires up the dev-loop actor system.
//!
//! # Responsibility
//!
//! The Coordinator is a **thin orchestrator** that:
//! - Creates communication channels
//! - Builds the repository, event service and transport
//! - Runs the actors concurrently
//!
//! Business logic lives in the actors and the event service.
//!
//! ```text
//! WatchActor --> SupervisorActor --> EventService --> WS clients
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use crossbeam::channel::Receiver;
use tokio::sync::mpsc;

use super::fs::WatchActor;
use super::messages::ReloadMsg;
use super::supervisor::SupervisorActor;
use crate::config::DevConfig;
use crate::event::EventService;
use crate::repo::{MemoryRepository, SessionRepository};

/// Channel buffer size
const CHANNEL_BUFFER: usize = 32;

/// Coordinator - wires up and runs the actor system
pub struct Coordinator {
    config: Arc<DevConfig>,
    /// Optional shutdown signal receiver
    shutdown_rx: Option<Receiver<()>>,
}

impl Coordinator {
    pub fn new(config: Arc<DevConfig>) -> Self {
        Self {
            config,
            shutdown_rx: None,
        }
    }

    /// Set shutdown signal receiver
    pub fn with_shutdown_signal(mut self, rx: Receiver<()>) -> Self {
        self.shutdown_rx = Some(rx);
        self
    }

    /// Run the actor system
    pub async fn run(mut self) -> Result<()> {
        let repo: Arc<dyn SessionRepository> = Arc::new(MemoryRepository::new());
        let events = Arc::new(EventService::new(Arc::clone(&repo)));

        // Start WebSocket event transport
        match crate::transport::start_ws_server(self.config.port, Arc::clone(&events)) {
            Ok(port) => crate::log!("dev"; "event stream on ws://localhost:{}/query", port),
            Err(e) => crate::log!("dev"; "websocket server failed: {}", e),
        }

        // Create channels and actors
        let (reload_tx, reload_rx) = mpsc::channel::<ReloadMsg>(CHANNEL_BUFFER);

        let watch = WatchActor::new(
            &self.config.module_path,
            reload_tx.clone(),
            Duration::from_millis(self.config.debounce_ms),
        )
        .map_err(|e| anyhow::anyhow!("watcher failed: {}", e))?;

        let supervisor = SupervisorActor::new(
            reload_rx,
            events,
            repo,
            Arc::clone(&self.config),
        );

        // Kick off the first introspection before any file change
        reload_tx.send(ReloadMsg::Pulse).await.ok();

        crate::debug!("dev"; "actors started");
        let supervisor_handle = tokio::spawn(supervisor.run());
        let watch_handle = tokio::spawn(watch.run());

        // Wait for shutdown signal (poll-based since crossbeam channel)
        if let Some(rx) = self.shutdown_rx.take() {
            loop {
                if rx.try_recv().is_ok() {
                    crate::debug!("dev"; "shutdown signal received");
                    break;
                }
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        } else {
            // No shutdown signal, run until an actor dies
            let _ = watch_handle.await;
            return Ok(());
        }

        // Let the supervisor kill the app runtime before exiting
        let _ = reload_tx.send(ReloadMsg::Shutdown).await;
        let _ = tokio::time::timeout(Duration::from_millis(500), supervisor_handle).await;
        watch_handle.abort();

        crate::debug!("dev"; "stopped");
        Ok(())
    }
}
