//! Command-line front end of the sqlpacket agent
//!
//! This crate provides argument parsing, exit code mapping and the wiring
//! that turns a loaded configuration into running capture workers.

pub mod agent;
pub mod args;
pub mod exit;

pub use args::Cli;
