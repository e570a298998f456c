//! Binary encoding of [`Envelope`]s.
//!
//! # Wire format
//!
//! All integers are **little-endian** and fields are packed without padding.
//!
//! ```text
//! +-------------+----------+-------------+--------------+----------------+
//! | packet_size | msg_type | sender_port | receive_port | body ...       |
//! |    u32      |   u16    |    u16      |     u16      | per msg_type   |
//! +-------------+----------+-------------+--------------+----------------+
//! ```
//!
//! Bodies, in order:
//! - Connect, ConnectAck, Disconnect: empty
//! - RequestChash: `idx:u64`
//! - ResponseChash, RequestData: `idx:u64, hash[64]`
//! - ResponseData: `idx:u64, nonce:u64, prev_hash[64], curr_hash[64], data[256]`
//!
//! Hash and data slots are embedded by value and zero-filled past their
//! contents. Decoding checks every length before reading a field, so a short
//! or mislabelled datagram yields a [`CodecError`] instead of garbage.

use crate::core::FixedBytes;
use crate::network::message::{DataResult, Envelope, Message, MessageType, HEADER_LEN};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Fewer bytes than the header, or than the output needs.
    BufferTooShort { needed: usize, actual: usize },
    /// `msg_type` outside the known kinds.
    UnknownMessageType(u16),
    /// `packet_size` disagrees with the fixed size of `msg_type`.
    SizeMismatch {
        kind: MessageType,
        declared: usize,
        expected: usize,
    },
    /// Datagram length disagrees with `packet_size`.
    Truncated { declared: usize, actual: usize },
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::BufferTooShort { needed, actual } => {
                write!(f, "buffer too short: need {needed} bytes, have {actual}")
            }
            CodecError::UnknownMessageType(raw) => write!(f, "unknown message type {raw}"),
            CodecError::SizeMismatch {
                kind,
                declared,
                expected,
            } => write!(
                f,
                "{kind:?} declares {declared} bytes but is {expected} bytes long"
            ),
            CodecError::Truncated { declared, actual } => {
                write!(f, "datagram of {actual} bytes declares {declared} bytes")
            }
        }
    }
}

impl std::error::Error for CodecError {}

struct WireWriter<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> WireWriter<'a> {
    fn new(buf: &'a mut [u8]) -> Self {
        WireWriter { buf, pos: 0 }
    }

    fn put(&mut self, bytes: &[u8]) {
        self.buf[self.pos..self.pos + bytes.len()].copy_from_slice(bytes);
        self.pos += bytes.len();
    }

    fn put_u16(&mut self, v: u16) {
        self.put(&v.to_le_bytes());
    }

    fn put_u32(&mut self, v: u32) {
        self.put(&v.to_le_bytes());
    }

    fn put_u64(&mut self, v: u64) {
        self.put(&v.to_le_bytes());
    }

    fn put_slot<const N: usize>(&mut self, slot: &FixedBytes<N>) {
        self.put(slot.as_array());
    }
}

// Callers check the total length first, so every read is in bounds.
struct WireReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> WireReader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        WireReader { buf, pos: 0 }
    }

    fn take<const N: usize>(&mut self) -> [u8; N] {
        let mut out = [0u8; N];
        out.copy_from_slice(&self.buf[self.pos..self.pos + N]);
        self.pos += N;
        out
    }

    fn u16(&mut self) -> u16 {
        u16::from_le_bytes(self.take())
    }

    fn u32(&mut self) -> u32 {
        u32::from_le_bytes(self.take())
    }

    fn u64(&mut self) -> u64 {
        u64::from_le_bytes(self.take())
    }

    fn slot<const N: usize>(&mut self) -> FixedBytes<N> {
        FixedBytes::from_array(self.take())
    }
}

/// Serialise `envelope` into the front of `buf`, returning the byte count.
///
/// Fails only when `buf` is smaller than the message.
pub fn encode(envelope: &Envelope, buf: &mut [u8]) -> Result<usize, CodecError> {
    let kind = envelope.message.message_type();
    let size = kind.wire_size();
    if buf.len() < size {
        return Err(CodecError::BufferTooShort {
            needed: size,
            actual: buf.len(),
        });
    }

    let mut w = WireWriter::new(&mut buf[..size]);
    w.put_u32(size as u32);
    w.put_u16(kind as u16);
    w.put_u16(envelope.sender_port);
    w.put_u16(envelope.receive_port);

    match &envelope.message {
        Message::Connect | Message::ConnectAck | Message::Disconnect => {}
        Message::RequestChash { idx } => w.put_u64(*idx),
        Message::ResponseChash { idx, hash } | Message::RequestData { idx, hash } => {
            w.put_u64(*idx);
            w.put_slot(hash);
        }
        Message::ResponseData(res) => {
            w.put_u64(res.idx);
            w.put_u64(res.nonce);
            w.put_slot(&res.prev_hash);
            w.put_slot(&res.curr_hash);
            w.put_slot(&res.data);
        }
    }
    debug_assert_eq!(w.pos, size);
    Ok(size)
}

/// Encode into a fresh vector.
pub fn encode_to_vec(envelope: &Envelope) -> Vec<u8> {
    let mut buf = vec![0u8; envelope.message.wire_size()];
    // The vector is sized for the message, so encoding cannot fail.
    let _ = encode(envelope, &mut buf);
    buf
}

/// Read only the message kind, validating the header.
pub fn peek_type(buf: &[u8]) -> Result<MessageType, CodecError> {
    if buf.len() < HEADER_LEN {
        return Err(CodecError::BufferTooShort {
            needed: HEADER_LEN,
            actual: buf.len(),
        });
    }
    let raw = u16::from_le_bytes([buf[4], buf[5]]);
    MessageType::try_from(raw).map_err(CodecError::UnknownMessageType)
}

/// Parse one datagram.
pub fn decode(buf: &[u8]) -> Result<Envelope, CodecError> {
    let kind = peek_type(buf)?;

    let mut r = WireReader::new(buf);
    let declared = r.u32() as usize;
    let expected = kind.wire_size();
    if declared != expected {
        return Err(CodecError::SizeMismatch {
            kind,
            declared,
            expected,
        });
    }
    if buf.len() != declared {
        return Err(CodecError::Truncated {
            declared,
            actual: buf.len(),
        });
    }

    let _msg_type = r.u16();
    let sender_port = r.u16();
    let receive_port = r.u16();

    let message = match kind {
        MessageType::Connect => Message::Connect,
        MessageType::ConnectAck => Message::ConnectAck,
        MessageType::Disconnect => Message::Disconnect,
        MessageType::RequestChash => Message::RequestChash { idx: r.u64() },
        MessageType::ResponseChash => Message::ResponseChash {
            idx: r.u64(),
            hash: r.slot(),
        },
        MessageType::RequestData => Message::RequestData {
            idx: r.u64(),
            hash: r.slot(),
        },
        MessageType::ResponseData => Message::ResponseData(DataResult {
            idx: r.u64(),
            nonce: r.u64(),
            prev_hash: r.slot(),
            curr_hash: r.slot(),
            data: r.slot(),
        }),
    };

    Ok(Envelope {
        sender_port,
        receive_port,
        message,
    })
}
