//! Process-wide serve state: shutdown flag and server handle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use tiny_http::Server;

/// Shutdown has been requested (Ctrl+C received)
static SHUTDOWN: AtomicBool = AtomicBool::new(false);

/// HTTP server reference for graceful shutdown
static SERVER: OnceLock<Arc<Server>> = OnceLock::new();

/// Shutdown signal sender for the actor system
static SHUTDOWN_TX: OnceLock<crossbeam::channel::Sender<()>> = OnceLock::new();

/// Setup the global Ctrl+C handler. Call once at program start.
///
/// The handler behavior depends on whether a server has been registered:
/// - Before `register_server()`: exits immediately, nothing to wind down
/// - After `register_server()`: graceful shutdown (unblock server, notify actors)
pub fn setup_shutdown_handler() -> anyhow::Result<()> {
    ctrlc::set_handler(|| {
        SHUTDOWN.store(true, Ordering::SeqCst);

        // Notify actor system
        if let Some(tx) = SHUTDOWN_TX.get() {
            let _ = tx.send(());
        }

        // Unblock HTTP server, or exit immediately if not yet serving
        if let Some(server) = SERVER.get() {
            crate::log!("serve"; "shutting down...");
            server.unblock();
        } else {
            std::process::exit(0);
        }
    })
    .map_err(|e| anyhow::anyhow!("failed to set Ctrl+C handler: {}", e))
}

/// Register the HTTP server for graceful shutdown.
///
/// Call this after binding the server, before entering the request loop.
pub fn register_server(server: Arc<Server>, shutdown_tx: crossbeam::channel::Sender<()>) {
    let _ = SERVER.set(server);
    let _ = SHUTDOWN_TX.set(shutdown_tx);
}

/// Check if shutdown has been requested.
///
/// Uses Relaxed ordering; worst case a request or two slips through
/// while the server winds down.
pub fn is_shutdown() -> bool {
    SHUTDOWN.load(Ordering::Relaxed)
}
