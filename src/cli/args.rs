//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

/// numdev - development backend for hot-reloading numerous apps
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Show debug output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file path (default: numdev.toml)
    #[arg(short = 'C', long, default_value = "numdev.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start the dev loop: watch, introspect, reconcile, fan out events
    #[command(visible_alias = "d")]
    Dev {
        /// App spec as MODULE_PATH:CLASS_NAME (e.g. app.py:MyApp)
        spec: Option<String>,

        /// Port for the WebSocket event stream
        #[arg(short, long)]
        port: Option<u16>,

        /// Interpreter executable (default: python)
        #[arg(short, long)]
        interpreter: Option<String>,
    },

    /// Introspect the app once and print its definition tree
    #[command(visible_alias = "r")]
    Read {
        /// App spec as MODULE_PATH:CLASS_NAME (e.g. app.py:MyApp)
        spec: Option<String>,

        /// Interpreter executable (default: python)
        #[arg(short, long)]
        interpreter: Option<String>,
    },
}
