//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

/// Durable named counters with live subscriptions
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path (default: tally.toml)
    #[arg(short = 'C', long, global = true, default_value = "tally.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run the counter service (HTTP procedures + WebSocket subscriptions)
    #[command(visible_alias = "s")]
    Serve {
        /// Network interface to bind (e.g., 127.0.0.1, 0.0.0.0)
        #[arg(short, long)]
        interface: Option<std::net::IpAddr>,

        /// HTTP port number to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// WebSocket port for counter subscriptions
        #[arg(short, long)]
        ws_port: Option<u16>,

        /// Keep counters in memory only (nothing survives a restart)
        #[arg(long)]
        memory: bool,
    },

    /// Print live values of a counter from a running server
    #[command(visible_alias = "w")]
    Watch {
        /// Counter name
        #[arg(default_value = crate::core::DEFAULT_COUNTER)]
        name: String,

        /// Full WebSocket URL (overrides host and port)
        #[arg(short, long, value_hint = clap::ValueHint::Url)]
        url: Option<String>,

        /// WebSocket port of the server
        #[arg(short, long)]
        ws_port: Option<u16>,
    },

    /// Show persisted counters without starting a server
    #[command(visible_alias = "i")]
    Inspect {
        /// Counter names to show (all when omitted)
        names: Vec<String>,

        /// Output JSON instead of a table
        #[arg(short, long)]
        json: bool,
    },
}

#[allow(unused)]
impl Cli {
    pub const fn is_serve(&self) -> bool {
        matches!(self.command, Commands::Serve { .. })
    }
    pub const fn is_watch(&self) -> bool {
        matches!(self.command, Commands::Watch { .. })
    }
    pub const fn is_inspect(&self) -> bool {
        matches!(self.command, Commands::Inspect { .. })
    }
}
