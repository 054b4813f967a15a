//! `tally watch`: follow one counter from a running server.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use tungstenite::protocol::Message;

use super::serve::reachable;
use crate::actor::Broadcast;
use crate::channel::SUBSCRIBE;
use crate::config::TallyConfig;
use crate::logger::now;
use crate::{debug, log};

/// Subscribe to `name` and print every value until the server goes away.
pub fn watch_counter(config: &TallyConfig, name: &str, url: Option<&str>) -> Result<()> {
    let url = match url {
        Some(url) => url.to_string(),
        None => default_url(config, name),
    };

    let (mut ws, _) =
        tungstenite::connect(url.as_str()).with_context(|| format!("failed to connect to {url}"))?;
    log!("watch"; "{}", url);

    ws.send(Message::Text(SUBSCRIBE.into()))
        .context("failed to send subscribe")?;

    loop {
        match ws.read() {
            Ok(Message::Text(text)) => match Broadcast::from_json(text.as_str()) {
                Some(update) => println!("{}  {} = {}", now(), name, update.count),
                None => debug!("watch"; "ignored frame: {}", text.as_str()),
            },
            Ok(Message::Close(_)) => {
                log!("watch"; "server closed the subscription");
                return Ok(());
            }
            Ok(_) => {}
            Err(tungstenite::Error::ConnectionClosed) => return Ok(()),
            Err(e) => return Err(e).context("subscription failed"),
        }
    }
}

/// `ws://<host>:<ws_port>/counters/<name>/watch` for the configured server.
fn default_url(config: &TallyConfig, name: &str) -> String {
    let addr = reachable(SocketAddr::new(config.serve.interface, config.serve.ws_port));
    let name = utf8_percent_encode(name, NON_ALPHANUMERIC);
    format!("ws://{addr}/counters/{name}/watch")
}
