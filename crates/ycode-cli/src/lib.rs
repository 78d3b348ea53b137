//! # ycode-cli
//!
//! Command-line interface for the YCode agent.
//!
//! ## Commands
//!
//! - `ycode` / `ycode chat`: interactive session in the terminal
//! - `ycode memory add|search|context`: work with the memory store directly
//! - `ycode config`: print the effective configuration
//! - `ycode skills [name]`: list discovered skills, or show one

pub mod commands;

pub use commands::Cli;
