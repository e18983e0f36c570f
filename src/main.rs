//! numdev - development backend for hot-reloading numerous apps.

#![allow(dead_code)]

mod actor;
mod app;
mod cli;
mod config;
mod diff;
mod event;
mod introspect;
mod logger;
mod repo;
mod transport;
mod utils;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};
use config::DevConfig;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    logger::set_verbose(cli.verbose);

    let config = DevConfig::load(&cli)?;

    match &cli.command {
        Commands::Dev { .. } => cli::dev::run(config),
        Commands::Read { .. } => cli::read::run(config),
    }
}
