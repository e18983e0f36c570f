//! WebSocket event transport.
//!
//! A thin bridge between connected clients and the event service: each
//! client announces itself with a `subscribe` command, gets its own
//! subscription stream forwarded as JSON, and may submit element commands
//! that are routed into the event service under its client id.
//!
//! ```text
//! EventService --[stream]--> client loop --[JSON]--> WebSocket
//!      ^                          |
//!      +--------[commands]--------+
//! ```

use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tungstenite::WebSocket;
use tungstenite::protocol::Message;

use crate::app::{DraftElement, ElementId, UpdateValue};
use crate::event::{ElementEvent, ElementUpdate, EventService};

/// Maximum port retry attempts
const MAX_PORT_RETRIES: u16 = 10;

/// Poll interval for the per-client loop
const POLL_INTERVAL: Duration = Duration::from_millis(25);

// =============================================================================
// Wire messages
// =============================================================================

fn default_session() -> String {
    "0".to_string()
}

/// Commands a client may send.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientCommand {
    /// Must be the first message on a connection.
    Subscribe {
        client_id: String,
        #[serde(default = "default_session")]
        session_id: String,
    },
    Update {
        #[serde(default = "default_session")]
        session_id: String,
        element_id: ElementId,
        value: UpdateValue,
    },
    Trigger {
        #[serde(default = "default_session")]
        session_id: String,
        element_id: ElementId,
    },
    Add {
        #[serde(default = "default_session")]
        session_id: String,
        parent_id: Option<ElementId>,
        element: DraftElement,
    },
    Remove {
        #[serde(default = "default_session")]
        session_id: String,
        element_id: ElementId,
    },
}

/// Messages the server sends.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerMessage {
    /// Connection established
    Connected { version: String },
    /// An element event from the session
    Event { event: ElementEvent },
    /// A command failed
    Error { message: String },
}

impl ServerMessage {
    fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

// =============================================================================
// Server
// =============================================================================

/// Start the WebSocket server; returns the port actually bound.
///
/// Must be called within a tokio runtime: client subscriptions register
/// cancellation watchers on it.
pub fn start_ws_server(base_port: u16, events: Arc<EventService>) -> Result<u16> {
    let handle = tokio::runtime::Handle::current();
    let (listener, actual_port) = try_bind_port(base_port, MAX_PORT_RETRIES)?;

    // Spawn acceptor thread; each client gets its own thread
    std::thread::spawn(move || {
        for stream in listener.incoming() {
            match stream {
                Ok(stream) => {
                    crate::debug!("ws"; "client connected: {:?}", stream.peer_addr());
                    let events = Arc::clone(&events);
                    let handle = handle.clone();
                    std::thread::spawn(move || handle_client(stream, events, handle));
                }
                Err(e) => {
                    crate::log!("ws"; "accept error: {}", e);
                    std::thread::sleep(Duration::from_millis(100));
                }
            }
        }
    });

    Ok(actual_port)
}

/// Try binding to port, retry with incremented port if in use
fn try_bind_port(base_port: u16, max_retries: u16) -> Result<(TcpListener, u16)> {
    let mut last_error = None;

    for offset in 0..max_retries {
        let port = base_port.saturating_add(offset);
        match TcpListener::bind(format!("127.0.0.1:{}", port)) {
            Ok(listener) => {
                let actual_port = listener.local_addr()?.port();
                return Ok((listener, actual_port));
            }
            Err(e) => {
                last_error = Some(e);
                continue;
            }
        }
    }

    Err(anyhow::anyhow!(
        "Failed to bind WebSocket server after {} attempts: {}",
        max_retries,
        last_error.map(|e| e.to_string()).unwrap_or_default()
    ))
}

// =============================================================================
// Per-client loop
// =============================================================================

fn handle_client(stream: TcpStream, events: Arc<EventService>, handle: tokio::runtime::Handle) {
    // Keep blocking mode during handshake, switch to non-blocking after
    let mut ws = match tungstenite::accept(stream) {
        Ok(ws) => ws,
        Err(e) => {
            crate::log!("ws"; "handshake failed: {}", e);
            return;
        }
    };

    let connected = ServerMessage::Connected {
        version: env!("CARGO_PKG_VERSION").to_string(),
    };
    if let Err(e) = ws.send(Message::Text(connected.to_json().into())) {
        crate::log!("ws"; "failed to send connected message: {}", e);
        return;
    }

    // First message must be a subscribe
    let (client_id, session_id) = match read_subscribe(&mut ws) {
        Some(ids) => ids,
        None => {
            let _ = ws.close(None);
            return;
        }
    };

    // Register the subscription on the runtime, then poll from this thread
    let cancel = CancellationToken::new();
    let mut rx = {
        let _guard = handle.enter();
        events.subscribe(cancel.clone(), &session_id, &client_id)
    };

    let _ = ws.get_ref().set_nonblocking(true);
    crate::debug!("ws"; "client `{}` subscribed to session `{}`", client_id, session_id);

    loop {
        // Incoming commands (non-blocking read)
        match ws.read() {
            Ok(Message::Text(text)) => {
                if let Err(err) = dispatch_command(&events, &client_id, &text) {
                    let reply = ServerMessage::Error {
                        message: err.to_string(),
                    };
                    if ws.send(Message::Text(reply.to_json().into())).is_err() {
                        break;
                    }
                }
            }
            Ok(Message::Close(_)) => break,
            Err(tungstenite::Error::Io(ref e)) if e.kind() == std::io::ErrorKind::WouldBlock => {}
            Err(_) => break,
            _ => {}
        }

        // Outgoing events
        let mut dead = false;
        while let Ok(event) = rx.try_recv() {
            let msg = ServerMessage::Event { event };
            if ws.send(Message::Text(msg.to_json().into())).is_err() {
                dead = true;
                break;
            }
        }
        if dead {
            break;
        }

        std::thread::sleep(POLL_INTERVAL);
    }

    cancel.cancel();
    crate::debug!("ws"; "client `{}` disconnected", client_id);
}

/// Block until the client's subscribe command arrives (or fails).
fn read_subscribe(ws: &mut WebSocket<TcpStream>) -> Option<(String, String)> {
    loop {
        match ws.read() {
            Ok(Message::Text(text)) => {
                match serde_json::from_str::<ClientCommand>(&text) {
                    Ok(ClientCommand::Subscribe {
                        client_id,
                        session_id,
                    }) => return Some((client_id, session_id)),
                    _ => {
                        let reply = ServerMessage::Error {
                            message: "expected a subscribe command first".to_string(),
                        };
                        let _ = ws.send(Message::Text(reply.to_json().into()));
                        return None;
                    }
                }
            }
            Ok(Message::Close(_)) | Err(_) => return None,
            _ => {}
        }
    }
}

fn dispatch_command(
    events: &EventService,
    client_id: &str,
    text: &str,
) -> Result<(), anyhow::Error> {
    let command: ClientCommand = serde_json::from_str(text)?;
    match command {
        ClientCommand::Subscribe { .. } => {
            anyhow::bail!("already subscribed");
        }
        ClientCommand::Update {
            session_id,
            element_id,
            value,
        } => {
            events.update_element(&session_id, client_id, &ElementUpdate { element_id, value })?;
        }
        ClientCommand::Trigger {
            session_id,
            element_id,
        } => {
            events.trigger_action(&session_id, client_id, element_id)?;
        }
        ClientCommand::Add {
            session_id,
            parent_id,
            element,
        } => {
            events.add_element(&session_id, client_id, parent_id, element)?;
        }
        ClientCommand::Remove {
            session_id,
            element_id,
        } => {
            events.remove_element(&session_id, client_id, element_id)?;
        }
    }
    Ok(())
}
