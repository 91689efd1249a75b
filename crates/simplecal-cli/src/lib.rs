//! Command-line wrapper for the simplecal Google Calendar client.
//!
//! This crate provides the `simplecal` binary.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;

pub use cli::Cli;
pub use config::CliConfig;
pub use error::{CliError, CliResult};
