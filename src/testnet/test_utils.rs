//! Test utilities for chain and node tests

use crate::config::Config;
use crate::core::Blockchain;

/// Config confined to `start..=end` with few bind attempts, so a test that
/// cannot find a port fails quickly instead of probing for long.
///
/// Each test module uses its own range; tests run in parallel.
pub fn test_config(start: u16, end: u16) -> Config {
    Config {
        port_start: start,
        port_end: end,
        max_bind_attempts: 200,
        ..Config::default()
    }
}

/// Genesis followed by one mined block per entry of `data`.
pub fn create_test_chain(data: &[&str]) -> Blockchain {
    let mut chain = Blockchain::new();
    for entry in data {
        chain
            .append(entry.as_bytes())
            .expect("test payload fits a block");
    }
    chain
}
