//! Subscription Channel - live counter updates over WebSocket
//!
//! Served on its own port (`serve.ws_port`). A client upgrades at
//! `/trpc/counter.watch?input=<json>` or `/counters/<name>/watch`, sends the
//! text `subscribe`, and then receives `{"count": n}` text frames: first the
//! value at subscribe time, then one per mutation, in order.
//!
//! Requests without upgrade headers get `426 Upgrade Required`.

mod connection;
mod server;

pub use connection::SUBSCRIBE;
pub use server::start_channel_server;

#[cfg(test)]
mod tests;
