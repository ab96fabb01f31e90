//! Server lifecycle management.

use std::net::SocketAddr;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use anyhow::Result;
use crossbeam::channel::Receiver;
use tiny_http::Server;
use tokio::sync::mpsc;

use crate::actor::Coordinator;
use crate::actor::messages::WsMsg;
use crate::cache::RenderCache;
use crate::config::ServeConfig;
use crate::log;

/// Maximum number of port binding attempts.
const MAX_PORT_RETRIES: u16 = 10;

/// Bind to the specified interface and port, with automatic port retry.
///
/// The returned address carries the effective port; it is the only
/// place renumbering happens, and everything downstream (page shell
/// included) must use it rather than the requested port.
pub fn bind_with_retry(
    interface: std::net::IpAddr,
    base_port: u16,
) -> Result<(Server, SocketAddr)> {
    for offset in 0..MAX_PORT_RETRIES {
        let port = base_port.saturating_add(offset);
        let addr = SocketAddr::new(interface, port);

        match Server::http(addr) {
            Ok(server) => {
                if offset > 0 {
                    log!("serve"; "port {} in use, using {} instead", base_port, port);
                }
                return Ok((server, addr));
            }
            Err(e) if offset + 1 < MAX_PORT_RETRIES => {
                log!("serve"; "bind {} failed: {}", addr, e);
                continue;
            }
            Err(e) => {
                log!("serve"; "bind {} failed: {}", addr, e);
                return Err(anyhow::anyhow!(
                    "failed to bind after {} attempts (ports {}-{}): {}",
                    MAX_PORT_RETRIES,
                    base_port,
                    port,
                    e
                ));
            }
        }
    }
    unreachable!()
}

/// Spawn the actor system for file watching and push fan-out.
pub fn spawn_actors(
    config: Arc<ServeConfig>,
    cache: Arc<RenderCache>,
    ws_tx: mpsc::Sender<WsMsg>,
    ws_rx: mpsc::Receiver<WsMsg>,
    shutdown_rx: Receiver<()>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .expect("failed to create tokio runtime");

        rt.block_on(async {
            let coordinator = Coordinator::new(config, cache, ws_tx, ws_rx, shutdown_rx);
            if let Err(e) = coordinator.run().await {
                log!("actor"; "error: {}", e);
            }
        });
    })
}

/// Wait for the actor system to shut down gracefully (max 2 seconds).
pub fn wait_for_shutdown(handle: JoinHandle<()>) {
    for _ in 0..40 {
        if handle.is_finished() {
            let _ = handle.join();
            return;
        }
        thread::sleep(std::time::Duration::from_millis(50));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr, TcpListener};

    const LOCALHOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

    /// Find and hold `n` consecutive free ports; returns the first.
    fn occupy_consecutive(n: u16) -> (u16, Vec<TcpListener>) {
        'outer: for base in (20000u16..60000).step_by(41) {
            let mut guards = Vec::with_capacity(n as usize);
            for port in base..base + n {
                match TcpListener::bind((LOCALHOST, port)) {
                    Ok(listener) => guards.push(listener),
                    Err(_) => continue 'outer,
                }
            }
            return (base, guards);
        }
        panic!("no free consecutive port range found");
    }

    #[test]
    fn binds_the_requested_port_when_free() {
        let (base, guards) = occupy_consecutive(1);
        drop(guards);
        let (server, addr) = bind_with_retry(LOCALHOST, base).unwrap();
        assert_eq!(addr.port(), base);
        drop(server);
    }

    #[test]
    fn occupied_port_falls_through_to_the_next_free_one() {
        let (base, mut guards) = occupy_consecutive(2);
        // Free base+1, keep base occupied
        guards.truncate(1);

        let (server, addr) = bind_with_retry(LOCALHOST, base).unwrap();
        assert_eq!(addr.port(), base + 1);
        drop(server);
    }

    #[test]
    fn gives_up_after_the_attempt_cap() {
        let (base, _guards) = occupy_consecutive(MAX_PORT_RETRIES);
        let err = match bind_with_retry(LOCALHOST, base) {
            Ok(_) => panic!("expected bind_with_retry to fail"),
            Err(e) => e,
        };
        assert!(err.to_string().contains("10 attempts"));
    }
}
