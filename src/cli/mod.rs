//! Command-line interface.

pub mod args;
pub mod dev;
pub mod read;

pub use args::{Cli, Commands};
