//! Configuration management
//!
//! This module holds the node's settings: the port range used for discovery,
//! the bind retry cap and the timing of the listener and synchronizer loops.
//! Values come from defaults, `CHAIN_*` environment variables, an optional
//! TOML file and finally the command line.

pub mod settings;

pub use settings::{Config, FileConfig, GLOBAL_CONFIG};
