//! Actor Coordinator - wires up the live preview actor system.
//!
//! A thin orchestrator: creates nothing but channels and actors, runs
//! them until the shutdown signal, then drains. Business logic lives in
//! the actors themselves.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use crossbeam::channel::Receiver;
use tokio::sync::mpsc;

use super::fs::FsActor;
use super::messages::WsMsg;
use super::ws::WsActor;
use crate::cache::RenderCache;
use crate::config::ServeConfig;
use crate::debug;

/// Coordinator - wires up and runs the actor system
pub struct Coordinator {
    config: Arc<ServeConfig>,
    cache: Arc<RenderCache>,
    ws_tx: mpsc::Sender<WsMsg>,
    ws_rx: mpsc::Receiver<WsMsg>,
    shutdown_rx: Receiver<()>,
}

impl Coordinator {
    pub fn new(
        config: Arc<ServeConfig>,
        cache: Arc<RenderCache>,
        ws_tx: mpsc::Sender<WsMsg>,
        ws_rx: mpsc::Receiver<WsMsg>,
        shutdown_rx: Receiver<()>,
    ) -> Self {
        Self {
            config,
            cache,
            ws_tx,
            ws_rx,
            shutdown_rx,
        }
    }

    /// Run the actor system until shutdown.
    pub async fn run(self) -> Result<()> {
        let Self {
            config,
            cache,
            ws_tx,
            ws_rx,
            shutdown_rx,
        } = self;

        let fs_actor = FsActor::new(config, cache, ws_tx.clone())
            .map_err(|e| anyhow::anyhow!("watcher failed: {}", e))?;
        let ws_actor = WsActor::new(ws_rx);

        debug!("actor"; "start");
        run_actors(fs_actor, ws_actor, ws_tx, shutdown_rx).await;
        debug!("actor"; "stopped");
        Ok(())
    }
}

/// Run both actors until the shutdown signal, then drain.
async fn run_actors(
    fs: FsActor,
    ws: WsActor,
    ws_tx: mpsc::Sender<WsMsg>,
    shutdown_rx: Receiver<()>,
) {
    let ws_handle = tokio::spawn(ws.run());
    let fs_handle = tokio::spawn(fs.run());

    // Wait for shutdown signal (poll-based since it comes from a
    // std-style channel owned by the Ctrl+C handler)
    loop {
        if shutdown_rx.try_recv().is_ok() {
            debug!("actor"; "shutdown signal received");
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    // Close viewer sockets before tearing down
    let _ = ws_tx.send(WsMsg::Shutdown).await;
    let _ = tokio::time::timeout(Duration::from_millis(500), ws_handle).await;
    fs_handle.abort();
}
