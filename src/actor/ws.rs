//! WebSocket actor - push-channel fan-out.
//!
//! Owns every connected viewer socket. Each re-render broadcasts a
//! single `"change"` token; viewers then pull `/html` themselves.
//! Delivery is independent per client: one broken socket is pruned
//! without disturbing the rest, and per-client ordering follows from
//! the actor processing its mailbox sequentially.

use std::io::{Read, Write};

use tokio::sync::mpsc;
use tungstenite::WebSocket;
use tungstenite::protocol::Message;

use super::messages::{PushSocket, WsMsg};
use crate::debug;

/// Token pushed on every change; viewers re-fetch on any message, so
/// the payload carries no content.
const CHANGE_TOKEN: &str = "change";

/// WebSocket Actor - manages client connections and broadcasts
pub struct WsActor {
    /// Channel to receive messages
    rx: mpsc::Receiver<WsMsg>,
    /// Connected clients
    clients: ClientRegistry<Box<dyn tiny_http::ReadWrite + Send>>,
}

impl WsActor {
    pub fn new(rx: mpsc::Receiver<WsMsg>) -> Self {
        Self {
            rx,
            clients: ClientRegistry::new(),
        }
    }

    /// Run the actor event loop
    pub async fn run(mut self) {
        while let Some(msg) = self.rx.recv().await {
            match msg {
                WsMsg::Changed => {
                    if self.clients.is_empty() {
                        debug!("ws"; "no clients connected");
                        continue;
                    }
                    let delivered = self.clients.broadcast(&Message::Text(CHANGE_TOKEN.into()));
                    debug!("ws"; "pinged {} clients", delivered);
                }

                WsMsg::AddClient(ws) => self.add_client(ws),

                WsMsg::Shutdown => {
                    debug!("ws"; "shutting down");
                    self.clients.close_all();
                    break;
                }
            }
        }
    }

    /// Register a freshly upgraded client connection
    fn add_client(&mut self, ws: PushSocket) {
        self.clients.register(ws);
        debug!("ws"; "client connected (total: {})", self.clients.len());
    }
}

// =============================================================================
// Client registry
// =============================================================================

/// Set of live viewer sockets.
///
/// Mutated from two sites - registration on connect, prune on failed
/// send - and `retain_mut` keeps the prune safe while the set is being
/// iterated, so one dead entry never corrupts or skips the rest.
///
/// Generic over the socket's IO type; production uses the upgraded
/// tiny_http stream.
pub struct ClientRegistry<S> {
    clients: Vec<WebSocket<S>>,
}

impl<S: Read + Write> ClientRegistry<S> {
    pub fn new() -> Self {
        Self {
            clients: Vec::new(),
        }
    }

    /// Add a client; it receives every future broadcast.
    pub fn register(&mut self, ws: WebSocket<S>) {
        self.clients.push(ws);
    }

    /// Send `msg` to every client, dropping the ones whose send fails.
    ///
    /// Returns the number of successful deliveries.
    pub fn broadcast(&mut self, msg: &Message) -> usize {
        let mut delivered = 0;
        self.clients.retain_mut(|ws| match ws.send(msg.clone()) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(e) => {
                debug!("ws"; "client disconnected: {}", e);
                false
            }
        });
        delivered
    }

    /// Close every socket and empty the registry.
    pub fn close_all(&mut self) {
        for mut ws in self.clients.drain(..) {
            let _ = ws.close(None);
        }
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

impl<S: Read + Write> Default for ClientRegistry<S> {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::io;
    use std::sync::Arc;
    use tungstenite::protocol::Role;

    /// In-memory socket; `closed` makes every write fail like a broken
    /// pipe, `sink` captures the frames a live socket would carry.
    struct FakeStream {
        sink: Arc<Mutex<Vec<u8>>>,
        closed: bool,
    }

    impl Read for FakeStream {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::ErrorKind::WouldBlock.into())
        }
    }

    impl Write for FakeStream {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.closed {
                return Err(io::ErrorKind::BrokenPipe.into());
            }
            self.sink.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            if self.closed {
                return Err(io::ErrorKind::BrokenPipe.into());
            }
            Ok(())
        }
    }

    fn client(closed: bool) -> (WebSocket<FakeStream>, Arc<Mutex<Vec<u8>>>) {
        let sink = Arc::new(Mutex::new(Vec::new()));
        let stream = FakeStream {
            sink: Arc::clone(&sink),
            closed,
        };
        (WebSocket::from_raw_socket(stream, Role::Server, None), sink)
    }

    fn ping() -> Message {
        Message::Text(CHANGE_TOKEN.into())
    }

    #[test]
    fn broadcast_reaches_every_client() {
        let mut registry = ClientRegistry::new();
        for _ in 0..3 {
            registry.register(client(false).0);
        }
        assert_eq!(registry.broadcast(&ping()), 3);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn broken_client_is_pruned_without_disturbing_the_rest() {
        let mut registry = ClientRegistry::new();
        registry.register(client(false).0);
        registry.register(client(true).0);
        registry.register(client(false).0);

        // One failed send: the two healthy clients still get the event
        // and exactly the broken one is dropped
        assert_eq!(registry.broadcast(&ping()), 2);
        assert_eq!(registry.len(), 2);

        // The survivors keep receiving
        assert_eq!(registry.broadcast(&ping()), 2);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn frames_carry_the_change_token() {
        let mut registry = ClientRegistry::new();
        let (ws, sink) = client(false);
        registry.register(ws);
        registry.broadcast(&ping());

        // Server frames are unmasked; the payload sits in the clear
        let bytes = sink.lock().clone();
        assert!(
            bytes
                .windows(CHANGE_TOKEN.len())
                .any(|w| w == CHANGE_TOKEN.as_bytes())
        );
    }

    #[test]
    fn pings_are_delivered_in_order() {
        let mut registry = ClientRegistry::new();
        let (ws, sink) = client(false);
        registry.register(ws);

        registry.broadcast(&Message::Text("first".into()));
        registry.broadcast(&Message::Text("second".into()));

        let bytes = sink.lock().clone();
        let first = bytes
            .windows(5)
            .position(|w| w == b"first")
            .expect("first frame present");
        let second = bytes
            .windows(6)
            .position(|w| w == b"second")
            .expect("second frame present");
        assert!(first < second);
    }

    #[test]
    fn close_all_empties_the_registry() {
        let mut registry = ClientRegistry::new();
        registry.register(client(false).0);
        registry.register(client(false).0);
        registry.close_all();
        assert!(registry.is_empty());
    }
}
