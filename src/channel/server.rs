//! Subscription listener.
//!
//! Accepts raw TCP connections and hands each one to its own connection
//! thread, which performs the WebSocket handshake itself.

use std::net::{IpAddr, SocketAddr, TcpListener};
use std::time::Duration;

use anyhow::Result;
use tokio::runtime::Handle;

use crate::actor::ActorLocator;

/// Maximum port retry attempts
const MAX_PORT_RETRIES: u16 = 10;

/// Acceptor poll interval while idle
const ACCEPT_POLL: Duration = Duration::from_millis(100);

/// Start the subscription listener; returns the bound address.
///
/// The acceptor thread exits once shutdown has been requested.
pub fn start_channel_server(
    interface: IpAddr,
    base_port: u16,
    locator: ActorLocator,
    runtime: Handle,
) -> Result<SocketAddr> {
    let (listener, addr) = try_bind_port(interface, base_port, MAX_PORT_RETRIES)?;
    listener.set_nonblocking(true)?;

    std::thread::Builder::new()
        .name("ws-accept".into())
        .spawn(move || accept_loop(listener, locator, runtime))?;

    Ok(addr)
}

fn accept_loop(listener: TcpListener, locator: ActorLocator, runtime: Handle) {
    while !crate::core::is_shutdown() {
        match listener.accept() {
            Ok((stream, peer)) => {
                crate::debug!("ws"; "client connected: {}", peer);

                // Set blocking for WebSocket operations
                let _ = stream.set_nonblocking(false);

                let locator = locator.clone();
                let runtime = runtime.clone();
                let spawned = std::thread::Builder::new()
                    .name(format!("ws-{}", peer))
                    .spawn(move || super::connection::serve(stream, locator, runtime));
                if let Err(e) = spawned {
                    crate::log!("ws"; "failed to spawn connection thread: {}", e);
                }
            }
            Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                std::thread::sleep(ACCEPT_POLL);
            }
            Err(e) => {
                crate::log!("ws"; "accept error: {}", e);
                std::thread::sleep(ACCEPT_POLL);
            }
        }
    }
    crate::debug!("ws"; "listener stopped");
}

/// Try binding to port, retry with incremented port if in use.
///
/// Port 0 asks the OS for any free port.
fn try_bind_port(
    interface: IpAddr,
    base_port: u16,
    max_retries: u16,
) -> Result<(TcpListener, SocketAddr)> {
    let mut last_error = None;

    for offset in 0..max_retries {
        let port = base_port.saturating_add(offset);
        match TcpListener::bind(SocketAddr::new(interface, port)) {
            Ok(listener) => {
                let addr = listener.local_addr()?;
                if offset > 0 {
                    crate::log!("ws"; "port {} in use, using {} instead", base_port, addr.port());
                }
                return Ok((listener, addr));
            }
            Err(e) => last_error = Some(e),
        }
    }

    Err(anyhow::anyhow!(
        "Failed to bind subscription listener after {} attempts: {}",
        max_retries,
        last_error.map(|e| e.to_string()).unwrap_or_default()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn test_bind_skips_taken_port() {
        let localhost = IpAddr::V4(Ipv4Addr::LOCALHOST);
        let (taken, taken_addr) = try_bind_port(localhost, 0, 1).unwrap();
        let (_next, addr) = try_bind_port(localhost, taken_addr.port(), 3).unwrap();
        assert_ne!(addr.port(), taken_addr.port());
        drop(taken);
    }
}
