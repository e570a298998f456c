//! Utility functions and helpers
//!
//! This module contains the hashing helpers and the small synchronisation
//! primitives shared by the node's worker threads.

pub mod crypto;
pub mod sync;

pub use crypto::{sha256_digest, sha256_hex};
pub use sync::{lock, CancellationToken};
