//! HTTP server with the live-reload push channel.
//!
//! Three endpoints: `/` serves the embedded shell, `/html` serves the
//! latest render as JSON, `/changes` upgrades to the WebSocket push
//! channel. Everything else is a 404.

mod lifecycle;
mod response;
mod upgrade;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use crossbeam::channel;
use tiny_http::{Method, Request, Server};
use tokio::sync::mpsc;

use crate::actor::messages::WsMsg;
use crate::cache::RenderCache;
use crate::config::ServeConfig;
use crate::{log, state};

/// Buffer for messages heading to the WebSocket actor
const CHANNEL_BUFFER: usize = 32;

/// Everything a request handler needs.
struct ServerContext {
    config: Arc<ServeConfig>,
    cache: Arc<RenderCache>,
    ws_tx: mpsc::Sender<WsMsg>,
    /// Effective port after bind retry; embedded in the page shell so
    /// the browser opens its push channel against the right listener.
    port: u16,
}

/// Bound server ready to accept requests
pub struct BoundServer {
    server: Arc<Server>,
    addr: SocketAddr,
    shutdown_rx: channel::Receiver<()>,
}

/// Bind the HTTP server without starting the request loop.
///
/// Binding first pins down the effective port; the page shell and the
/// startup log line both come from the bound address, never from the
/// requested port.
pub fn bind_server(config: &ServeConfig) -> Result<BoundServer> {
    let (server, addr) = lifecycle::bind_with_retry(config.interface, config.port)?;
    let server = Arc::new(server);

    let (shutdown_tx, shutdown_rx) = channel::unbounded::<()>();
    state::register_server(Arc::clone(&server), shutdown_tx);

    log!("serve"; "watching {}, serving at http://{}", config.display_name, addr);

    Ok(BoundServer {
        server,
        addr,
        shutdown_rx,
    })
}

impl BoundServer {
    /// Spawn the actor system and run the request loop (blocking).
    pub fn run(self, config: Arc<ServeConfig>, cache: Arc<RenderCache>) -> Result<()> {
        let (ws_tx, ws_rx) = mpsc::channel::<WsMsg>(CHANNEL_BUFFER);

        let actor_handle = lifecycle::spawn_actors(
            Arc::clone(&config),
            Arc::clone(&cache),
            ws_tx.clone(),
            ws_rx,
            self.shutdown_rx,
        );

        let ctx = Arc::new(ServerContext {
            config,
            cache,
            ws_tx,
            port: self.addr.port(),
        });

        run_request_loop(&self.server, &ctx);
        lifecycle::wait_for_shutdown(actor_handle);
        Ok(())
    }
}

fn run_request_loop(server: &Server, ctx: &Arc<ServerContext>) {
    // Small pool so a slow client cannot stall the other viewers
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(4)
        .build()
        .expect("failed to create thread pool");

    for request in server.incoming_requests() {
        let ctx = Arc::clone(ctx);
        pool.spawn(move || {
            if let Err(e) = handle_request(request, &ctx) {
                log!("serve"; "request error: {e}");
            }
        });
    }
}

/// Handle a single HTTP request
fn handle_request(request: Request, ctx: &ServerContext) -> Result<()> {
    // Early exit if shutdown requested
    if state::is_shutdown() {
        return response::respond_unavailable(request);
    }

    if request.method() != &Method::Get {
        return response::respond_not_found(request);
    }

    match request_path(request.url()) {
        "/" => response::respond_index(request, ctx.port, &ctx.config.display_name),
        "/html" => response::respond_html(request, &ctx.cache),
        "/changes" => upgrade::respond_upgrade(request, &ctx.ws_tx),
        _ => response::respond_not_found(request),
    }
}

/// URL path without the query string.
fn request_path(url: &str) -> &str {
    url.split('?').next().unwrap_or(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_path_strips_the_query() {
        assert_eq!(request_path("/html?cachebust=1"), "/html");
        assert_eq!(request_path("/"), "/");
        assert_eq!(request_path("/changes"), "/changes");
    }
}
