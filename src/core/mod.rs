//! Core types - pure abstractions shared across the codebase.

mod name;
mod state;

pub use name::{ActorId, CounterName, DEFAULT_COUNTER};
pub use state::{is_shutdown, register_server, request_shutdown, setup_shutdown_handler};
