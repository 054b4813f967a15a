//! Server lifecycle management.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use anyhow::{Context, Result};
use tiny_http::Server;
use tokio::runtime::Runtime;

use crate::{actor::ActorLocator, log};

/// Maximum number of port binding attempts.
const MAX_PORT_RETRIES: u16 = 10;

/// How long actors get to drain their mailboxes on shutdown.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Bind to the specified interface and port, with automatic port retry.
pub fn bind_with_retry(interface: IpAddr, base_port: u16) -> Result<(Server, SocketAddr)> {
    let mut last_error = None;

    for offset in 0..MAX_PORT_RETRIES {
        let port = base_port.saturating_add(offset);
        let addr = SocketAddr::new(interface, port);

        match Server::http(addr) {
            Ok(server) => {
                // Port 0 binds an OS-assigned port
                let addr = server.server_addr().to_ip().unwrap_or(addr);
                if offset > 0 {
                    log!("serve"; "port {} in use, using {} instead", base_port, port);
                }
                return Ok((server, addr));
            }
            Err(e) => last_error = Some(e),
        }
    }

    Err(anyhow::anyhow!(
        "Failed to bind after {} attempts (ports {}-{}): {}",
        MAX_PORT_RETRIES,
        base_port,
        base_port.saturating_add(MAX_PORT_RETRIES - 1),
        last_error.map(|e| e.to_string()).unwrap_or_default()
    ))
}

/// Runtime hosting the actors.
pub fn build_runtime() -> Result<Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .thread_name("actor")
        .enable_all()
        .build()
        .context("Failed to create tokio runtime")
}

/// Stop connections and actors, then the runtime.
pub fn stop(runtime: Runtime, locator: &ActorLocator) {
    crate::core::request_shutdown();

    let drained = runtime.block_on(async {
        tokio::time::timeout(SHUTDOWN_GRACE, locator.shutdown()).await
    });
    if drained.is_err() {
        log!("actor"; "some counters did not stop within {:?}", SHUTDOWN_GRACE);
    }

    runtime.shutdown_timeout(SHUTDOWN_GRACE);
}

/// Address clients should dial for a listener bound to `addr`.
pub fn reachable(addr: SocketAddr) -> SocketAddr {
    match addr.ip() {
        IpAddr::V4(ip) if ip.is_unspecified() => {
            SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), addr.port())
        }
        IpAddr::V6(ip) if ip.is_unspecified() => {
            SocketAddr::new(IpAddr::V6(Ipv6Addr::LOCALHOST), addr.port())
        }
        _ => addr,
    }
}
