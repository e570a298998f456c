//! Peer-to-peer gossip over UDP on the loopback interface
//!
//! Every node owns a send socket and a receive socket bound to random ports of
//! a shared range. A node announces itself to the whole range, keeps the set of
//! peers that answered, and converges on the majority chain by voting on block
//! hashes one index at a time.
//!
//! Two workers run per node: the listener answers requests and applies
//! incoming blocks, and the synchronizer tallies hash votes and asks the
//! winning peers for the block.

pub mod codec;
mod listener;
pub mod message;
pub mod node;
pub mod peers;
pub mod sync;
mod synchronizer;
pub mod transport;

pub use codec::{decode, encode, encode_to_vec, CodecError};
pub use message::{DataResult, Envelope, Message, MessageType, HEADER_LEN, MAX_MESSAGE_SIZE};
pub use node::{NodeStatus, PeerNode, WorkerState};
pub use peers::PeerSet;
pub use sync::{ChashVote, DataRequest, SyncAction, SyncState, VoteTally};
pub use transport::{bind_random_port, Inbound, Outbound, Poll, PollSource, Transport};
