//! Helpers shared by the unit tests: small port ranges and prebuilt chains.

pub mod test_utils;

pub use test_utils::*;
