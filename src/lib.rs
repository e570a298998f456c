//! # Gossip Chain - A Blockchain Replicated by Majority Vote
//!
//! This is a small proof-of-work ledger that I replicate between peers on one
//! machine over UDP. When I come back to this code, here's what I need to
//! remember:
//!
//! ## What I Built
//! - **Ledger**: fixed-size blocks linked by SHA-256 hashes; a hash is accepted
//!   when its hex form ends in `1234`
//! - **Repair**: editing a block re-mines it and every block after it
//! - **Discovery**: a new peer announces itself to every port of a shared range
//! - **Sync**: peers vote on the hash at each index; the majority block wins
//!   and is fetched from the peers that voted for it
//!
//! ## How I Organized My Code
//! - `core/`: blocks, the proof-of-work search and the chain itself
//! - `network/`: wire codec, sockets, peer set, vote rounds and the node
//! - `config/`: port range and timing settings
//! - `utils/`: hashing helpers, lock helper and the cancellation token
//! - `cli/`: process options and the interactive commands
//!
//! ## Things To Keep In Mind
//! - Blocks from peers are applied even when their proof-of-work fails; only a
//!   warning is logged
//! - A peer is known only by its receive port
//! - Each node runs a listener thread and a synchronizer thread; the chain and
//!   the peer set sit behind mutexes shared with the control thread

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod network;
pub mod utils;

#[cfg(test)]
pub mod testnet;

// Re-export commonly used types for convenience
pub use cli::{Command, Opt, MENU};
pub use config::{Config, GLOBAL_CONFIG};
pub use core::{Block, Blockchain, DataField, HashField, ProofOfWork, DATA_SIZE, HASH_SIZE};
pub use error::{BlockchainError, Result};
pub use network::{Message, NodeStatus, PeerNode, WorkerState};
pub use utils::{sha256_digest, sha256_hex, CancellationToken};
