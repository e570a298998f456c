//! Command-line interface
//!
//! Process options parsed with clap, and the commands accepted at the
//! interactive prompt.

pub mod commands;

pub use commands::{Command, Opt, MENU};
