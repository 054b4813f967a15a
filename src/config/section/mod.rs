//! Configuration section definitions.
//!
//! Each module corresponds to a section in `tally.toml`:
//!
//! | Module   | TOML Section | Purpose                                   |
//! |----------|--------------|-------------------------------------------|
//! | `serve`  | `[serve]`    | HTTP + subscription listeners             |
//! | `store`  | `[store]`    | Durable store backend and location        |
//! | `actor`  | `[actor]`    | Mailbox sizes and idle passivation        |
//! | `app`    | `[app]`      | Application identity for demo procedures  |

mod actor;
mod app;
mod serve;
mod store;

pub use actor::ActorConfig;
pub use app::AppConfig;
pub use serve::ServeConfig;
pub use store::{StoreBackend, StoreConfig};
