//! Actor message definitions.
//!
//! ```text
//! FsActor --Changed--> WsActor --"change"--> each viewer socket
//! ```

use tiny_http::ReadWrite;
use tungstenite::WebSocket;

/// Server side of one viewer's push channel, produced by the HTTP
/// upgrade handshake.
pub type PushSocket = WebSocket<Box<dyn ReadWrite + Send>>;

/// Messages to the WebSocket actor
pub enum WsMsg {
    /// A re-render landed in the cache; ping every viewer.
    Changed,
    /// Register a freshly upgraded viewer socket.
    AddClient(PushSocket),
    /// Close all sockets and stop.
    Shutdown,
}
