//! One subscriber connection.
//!
//! ```text
//! TCP ──handshake──> WebSocket ──"subscribe"──> Subscription
//!                                                   │ Broadcast
//!                         text frame {"count":n} <──┘
//! ```

use std::io::{ErrorKind, Write};
use std::net::TcpStream;
use std::time::{Duration, Instant};

use crossbeam::channel::TryRecvError;
use tokio::runtime::Handle;
use tungstenite::handshake::HandshakeError;
use tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tungstenite::http::StatusCode;
use tungstenite::protocol::Message;
use tungstenite::{Error as WsError, WebSocket, error::ProtocolError};

use crate::actor::{ActorLocator, Subscription};
use crate::core::CounterName;
use crate::rpc::{self, CounterAction, Route};

/// Literal control message that starts the broadcast stream.
pub const SUBSCRIBE: &str = "subscribe";

/// Read timeout; also the broadcast forwarding latency bound
const POLL: Duration = Duration::from_millis(25);

/// Give up on clients that never finish the upgrade
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// Handshake, then forward broadcasts until either side goes away.
pub(super) fn serve(stream: TcpStream, locator: ActorLocator, runtime: Handle) {
    let Some((mut ws, name)) = handshake(stream) else {
        return;
    };

    let counter = match locator.resolve(&name) {
        Ok(counter) => counter,
        Err(e) => {
            crate::log!("ws"; "{}: {}", name, e);
            let _ = ws.close(None);
            let _ = ws.flush();
            return;
        }
    };

    let mut subscription: Option<Subscription> = None;

    loop {
        if crate::core::is_shutdown() {
            let _ = ws.close(None);
            let _ = ws.flush();
            break;
        }

        match ws.read() {
            Ok(Message::Text(text)) if text.as_str().trim() == SUBSCRIBE => {
                if subscription.is_some() {
                    continue;
                }
                match runtime.block_on(counter.subscribe()) {
                    Ok(sub) => {
                        crate::debug!("ws"; "{} subscriber #{} joined at {}", name, sub.id(), sub.initial());
                        subscription = Some(sub);
                    }
                    Err(e) => {
                        crate::log!("ws"; "{} subscribe failed: {}", name, e);
                        let _ = ws.close(None);
                        let _ = ws.flush();
                        break;
                    }
                }
            }
            Ok(Message::Close(_)) => {
                // Close reply was queued by tungstenite
                let _ = ws.flush();
                break;
            }
            // Pings are answered by tungstenite; other data is not part of the protocol
            Ok(_) => {}
            Err(WsError::Io(ref e))
                if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {}
            Err(_) => break,
        }

        if let Some(sub) = &subscription
            && !forward(&mut ws, sub)
        {
            break;
        }
    }

    if let Some(sub) = &subscription {
        crate::debug!("ws"; "{} subscriber #{} left", name, sub.id());
    }
}

/// Push every queued broadcast; `false` when the connection is finished.
fn forward(ws: &mut WebSocket<TcpStream>, sub: &Subscription) -> bool {
    loop {
        match sub.try_recv() {
            Ok(broadcast) => {
                if let Err(e) = ws.send(Message::Text(broadcast.to_json().into())) {
                    crate::debug!("ws"; "send failed: {}", e);
                    return false;
                }
            }
            Err(TryRecvError::Empty) => return true,
            Err(TryRecvError::Disconnected) => {
                // Dropped by the actor (shutdown or too slow); client re-subscribes
                let _ = ws.close(None);
                let _ = ws.flush();
                return false;
            }
        }
    }
}

/// Perform the upgrade and work out which counter is being watched.
fn handshake(stream: TcpStream) -> Option<(WebSocket<TcpStream>, CounterName)> {
    let raw = stream.try_clone().ok()?;
    let _ = stream.set_read_timeout(Some(POLL));

    let mut target = None;
    let callback = |request: &Request, response: Response| {
        let path = request.uri().path_and_query().map(|p| p.as_str()).unwrap_or("/");
        match watch_target(path) {
            Ok(name) => {
                target = Some(name);
                Ok(response)
            }
            Err((status, message)) => Err(error_response(status, message)),
        }
    };

    let started = Instant::now();
    let mut attempt = tungstenite::accept_hdr(stream, callback);
    let ws = loop {
        match attempt {
            Ok(ws) => break ws,
            Err(HandshakeError::Interrupted(mid)) if started.elapsed() < HANDSHAKE_TIMEOUT => {
                attempt = mid.handshake();
            }
            Err(HandshakeError::Interrupted(_)) => {
                crate::debug!("ws"; "handshake timed out");
                return None;
            }
            Err(HandshakeError::Failure(err)) => {
                reject(raw, &err);
                return None;
            }
        }
    };

    target.map(|name| (ws, name))
}

/// Counter named by a watch request target.
fn watch_target(target: &str) -> Result<CounterName, (StatusCode, String)> {
    match Route::parse(target) {
        Route::Trpc {
            procedures,
            batch: false,
            input,
        } if procedures == ["counter.watch"] => rpc::parse_raw(input.as_deref())
            .and_then(|input| rpc::counter_name(input.as_ref()))
            .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string())),
        Route::Counter {
            name,
            action: CounterAction::Watch,
        } => Ok(name),
        _ => Err((StatusCode::NOT_FOUND, "Not found".to_string())),
    }
}

fn error_response(status: StatusCode, message: String) -> ErrorResponse {
    let mut response = ErrorResponse::new(Some(message));
    *response.status_mut() = status;
    response
}

/// Answer a failed upgrade on the raw stream.
///
/// Rejections from the path check were already written by tungstenite.
fn reject(mut raw: TcpStream, err: &WsError) {
    let (status, body) = match err {
        WsError::Http(_) => {
            crate::debug!("ws"; "watch rejected: {}", err);
            return;
        }
        WsError::Protocol(
            ProtocolError::MissingConnectionUpgradeHeader
            | ProtocolError::MissingUpgradeWebSocketHeader
            | ProtocolError::MissingSecWebSocketVersionHeader
            | ProtocolError::MissingSecWebSocketKey,
        ) => ("426 Upgrade Required", "watch requires a WebSocket upgrade"),
        WsError::Protocol(_) | WsError::HttpFormat(_) => {
            ("400 Bad Request", "malformed upgrade request")
        }
        _ => {
            crate::debug!("ws"; "handshake failed: {}", err);
            return;
        }
    };

    crate::debug!("ws"; "upgrade refused: {}", err);
    let response = format!(
        "HTTP/1.1 {status}\r\nUpgrade: websocket\r\nConnection: close\r\n\
         Content-Type: text/plain; charset=utf-8\r\nContent-Length: {}\r\n\r\n{body}",
        body.len()
    );
    let _ = raw.write_all(response.as_bytes());
    let _ = raw.flush();
}
