//! WebSocket upgrade handling for the /changes push channel.
//!
//! tiny_http hands over the raw stream once the 101 response is on the
//! wire; the socket then lives with the WebSocket actor, which owns all
//! fan-out and pruning.

use anyhow::Result;
use tiny_http::{Request, Response, StatusCode};
use tokio::sync::mpsc;
use tungstenite::handshake::derive_accept_key;
use tungstenite::protocol::{Role, WebSocket};

use super::response::{make_header, respond_bad_request};
use crate::actor::messages::WsMsg;
use crate::log;

/// Perform the upgrade handshake and park the socket with the WsActor.
pub fn respond_upgrade(request: Request, ws_tx: &mpsc::Sender<WsMsg>) -> Result<()> {
    let Some(key) = websocket_key(&request) else {
        return respond_bad_request(request, "missing Sec-WebSocket-Key");
    };

    let accept = derive_accept_key(key.as_bytes());
    let response = Response::empty(StatusCode(101))
        .with_header(make_header("Upgrade", "websocket"))
        .with_header(make_header("Connection", "Upgrade"))
        .with_header(make_header("Sec-WebSocket-Accept", &accept));

    // The handshake response is written by tiny_http; from here on the
    // stream speaks the WebSocket protocol only
    let stream = request.upgrade("websocket", response);
    let ws = WebSocket::from_raw_socket(stream, Role::Server, None);

    if ws_tx.blocking_send(WsMsg::AddClient(ws)).is_err() {
        log!("ws"; "actor system is down, dropping client");
    }
    Ok(())
}

/// `Sec-WebSocket-Key` header value, if present.
fn websocket_key(request: &Request) -> Option<String> {
    request
        .headers()
        .iter()
        .find(|h| {
            h.field
                .as_str()
                .as_str()
                .eq_ignore_ascii_case("sec-websocket-key")
        })
        .map(|h| h.value.as_str().to_string())
}
