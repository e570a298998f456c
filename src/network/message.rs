//! Message kinds exchanged between peers.
//!
//! Every datagram carries exactly one [`Envelope`]: the common header fields
//! plus one [`Message`]. The set of kinds is closed; adding one means
//! extending [`MessageType`] and every `match` on [`Message`].

use crate::core::{DataField, HashField, DATA_SIZE, HASH_SIZE};

/// Byte length of the common header on the wire.
/// packet_size(4) + msg_type(2) + sender_port(2) + receive_port(2)
pub const HEADER_LEN: usize = 10;

const IDX_LEN: usize = 8;
const NONCE_LEN: usize = 8;

/// Size of the largest message, [`MessageType::ResponseData`].
pub const MAX_MESSAGE_SIZE: usize = HEADER_LEN + IDX_LEN + NONCE_LEN + 2 * HASH_SIZE + DATA_SIZE;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum MessageType {
    Connect = 0,
    ConnectAck = 1,
    Disconnect = 2,
    RequestChash = 3,
    ResponseChash = 4,
    RequestData = 5,
    ResponseData = 6,
}

impl MessageType {
    /// Total size on the wire of a message of this kind, header included.
    pub fn wire_size(self) -> usize {
        match self {
            MessageType::Connect | MessageType::ConnectAck | MessageType::Disconnect => {
                HEADER_LEN
            }
            MessageType::RequestChash => HEADER_LEN + IDX_LEN,
            MessageType::ResponseChash | MessageType::RequestData => {
                HEADER_LEN + IDX_LEN + HASH_SIZE
            }
            MessageType::ResponseData => MAX_MESSAGE_SIZE,
        }
    }
}

impl TryFrom<u16> for MessageType {
    type Error = u16;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(MessageType::Connect),
            1 => Ok(MessageType::ConnectAck),
            2 => Ok(MessageType::Disconnect),
            3 => Ok(MessageType::RequestChash),
            4 => Ok(MessageType::ResponseChash),
            5 => Ok(MessageType::RequestData),
            6 => Ok(MessageType::ResponseData),
            other => Err(other),
        }
    }
}

/// Full block contents carried by [`Message::ResponseData`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataResult {
    pub idx: u64,
    pub nonce: u64,
    pub prev_hash: HashField,
    pub curr_hash: HashField,
    pub data: DataField,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Connect,
    ConnectAck,
    Disconnect,
    RequestChash { idx: u64 },
    ResponseChash { idx: u64, hash: HashField },
    /// `hash` names the block the requester wants; responders do not check it.
    RequestData { idx: u64, hash: HashField },
    ResponseData(DataResult),
}

impl Message {
    pub fn message_type(&self) -> MessageType {
        match self {
            Message::Connect => MessageType::Connect,
            Message::ConnectAck => MessageType::ConnectAck,
            Message::Disconnect => MessageType::Disconnect,
            Message::RequestChash { .. } => MessageType::RequestChash,
            Message::ResponseChash { .. } => MessageType::ResponseChash,
            Message::RequestData { .. } => MessageType::RequestData,
            Message::ResponseData(_) => MessageType::ResponseData,
        }
    }

    pub fn wire_size(&self) -> usize {
        self.message_type().wire_size()
    }
}

/// A message together with the ports of the node that sent it.
///
/// `sender_port` is the socket the datagram left from; `receive_port` is
/// where the sender listens, so replies go there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub sender_port: u16,
    pub receive_port: u16,
    pub message: Message,
}
