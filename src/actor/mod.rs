//! Actor System for named counters
//!
//! One tokio task per live counter name, addressed through the locator:
//!
//! ```text
//! RPC / WS ──resolve(name)──> ActorLocator ──> CounterHandle
//!                                                  │ CounterMsg
//!                                                  v
//!                       DurableStore <──put── CounterActor ──Broadcast──> Subscriptions
//! ```
//!
//! # Module Structure
//!
//! - `messages` - Message types between handles and actors
//! - `counter` - The counter actor and its subscriber fan-out
//! - `handle` - Caller-side handle, subscription and error type
//! - `locator` - Name resolution, activation and passivation

mod counter;
mod handle;
mod locator;
mod messages;

#[cfg(test)]
mod tests;

pub use counter::COUNT_KEY;
pub use handle::{CounterError, CounterHandle, Subscription};
pub use locator::{ActorLocator, ActorSettings};
pub use messages::Broadcast;
