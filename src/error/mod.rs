//! Error handling for the node
//!
//! This module provides the error type shared by the ledger, the wire codec
//! and the networking workers.

use crate::network::codec::CodecError;
use std::fmt;

/// Result type alias for node operations
pub type Result<T> = std::result::Result<T, BlockchainError>;

/// Error types for ledger and network operations
#[derive(Debug, Clone)]
pub enum BlockchainError {
    /// Payload does not fit into a block's fixed data slot
    DataTooLarge { len: usize, max: usize },
    /// Block index past the end of the chain
    IndexOutOfRange { idx: u64, len: u64 },
    /// Block rejected because it does not extend the chain
    InvalidBlock(String),
    /// Wire encoding/decoding errors
    Codec(CodecError),
    /// Every bind attempt in the port range failed
    PortsExhausted { start: u16, end: u16, attempts: u32 },
    /// Network communication errors
    Network(String),
    /// Configuration errors
    Config(String),
    /// File I/O errors
    Io(String),
    /// A shared lock was poisoned by a panicking thread
    Lock(String),
    /// The node has been shut down
    Shutdown,
}

impl fmt::Display for BlockchainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockchainError::DataTooLarge { len, max } => {
                write!(f, "Data too large: {len} bytes (block capacity {max})")
            }
            BlockchainError::IndexOutOfRange { idx, len } => {
                write!(f, "Block index {idx} out of range (chain length {len})")
            }
            BlockchainError::InvalidBlock(msg) => write!(f, "Invalid block: {msg}"),
            BlockchainError::Codec(err) => write!(f, "Codec error: {err}"),
            BlockchainError::PortsExhausted {
                start,
                end,
                attempts,
            } => write!(
                f,
                "No free port in {start}-{end} after {attempts} bind attempts"
            ),
            BlockchainError::Network(msg) => write!(f, "Network error: {msg}"),
            BlockchainError::Config(msg) => write!(f, "Configuration error: {msg}"),
            BlockchainError::Io(msg) => write!(f, "I/O error: {msg}"),
            BlockchainError::Lock(what) => write!(f, "Lock poisoned: {what}"),
            BlockchainError::Shutdown => write!(f, "Node is shut down"),
        }
    }
}

impl std::error::Error for BlockchainError {}

impl From<std::io::Error> for BlockchainError {
    fn from(err: std::io::Error) -> Self {
        BlockchainError::Io(err.to_string())
    }
}

impl From<CodecError> for BlockchainError {
    fn from(err: CodecError) -> Self {
        BlockchainError::Codec(err)
    }
}

impl From<toml::de::Error> for BlockchainError {
    fn from(err: toml::de::Error) -> Self {
        BlockchainError::Config(err.to_string())
    }
}
