//! Core ledger functionality
//!
//! This module contains the blocks, the chain that links them and the
//! proof-of-work rules they are mined under.

pub mod block;
pub mod blockchain;
pub mod fixed;
pub mod proof_of_work;

pub use block::Block;
pub use blockchain::Blockchain;
pub use fixed::{DataField, FixedBytes, HashField, DATA_SIZE, HASH_SIZE};
pub use proof_of_work::{ProofOfWork, ACCEPTANCE_MARKER};
