//! Wire codec integration tests

use gossip_chain::network::{
    decode, encode, encode_to_vec, CodecError, DataResult, Envelope, Message, MessageType,
    MAX_MESSAGE_SIZE,
};
use gossip_chain::{Blockchain, DataField, HashField, DATA_SIZE, HASH_SIZE};

fn envelope(message: Message) -> Envelope {
    Envelope {
        sender_port: 50007,
        receive_port: 50042,
        message,
    }
}

#[test]
fn test_every_message_kind_survives_the_wire() {
    let chain = Blockchain::new();
    let genesis = chain.get_block(0).unwrap();
    let hash = *genesis.get_curr_hash();

    let messages = vec![
        Message::Connect,
        Message::ConnectAck,
        Message::Disconnect,
        Message::RequestChash { idx: 3 },
        Message::ResponseChash { idx: 0, hash },
        Message::RequestData { idx: 0, hash },
        Message::ResponseData(DataResult {
            idx: 0,
            nonce: genesis.get_nonce(),
            prev_hash: *genesis.get_prev_hash(),
            curr_hash: hash,
            data: *genesis.get_data(),
        }),
    ];

    for message in messages {
        let sent = envelope(message);
        let bytes = encode_to_vec(&sent);
        assert_eq!(bytes.len(), sent.message.wire_size());
        assert_eq!(decode(&bytes).unwrap(), sent);
    }
}

#[test]
fn test_trailing_bytes_in_a_large_buffer_are_not_part_of_the_datagram() {
    let mut buf = [0xAAu8; MAX_MESSAGE_SIZE];
    let sent = envelope(Message::RequestChash { idx: 9 });
    let n = encode(&sent, &mut buf).unwrap();
    assert_eq!(n, 18);
    assert_eq!(decode(&buf[..n]).unwrap(), sent);

    // The whole buffer is not a valid datagram: its length disagrees with the header.
    assert_eq!(
        decode(&buf),
        Err(CodecError::Truncated {
            declared: 18,
            actual: MAX_MESSAGE_SIZE
        })
    );
}

#[test]
fn test_header_of_one_kind_with_size_of_another_is_rejected() {
    let mut bytes = encode_to_vec(&envelope(Message::ResponseChash {
        idx: 1,
        hash: HashField::zeroed(),
    }));
    // Relabel an 82-byte ResponseChash as a 10-byte Connect.
    bytes[4..6].copy_from_slice(&(MessageType::Connect as u16).to_le_bytes());
    assert_eq!(
        decode(&bytes),
        Err(CodecError::SizeMismatch {
            kind: MessageType::Connect,
            declared: 82,
            expected: 10
        })
    );
}

#[test]
fn test_response_data_with_full_slots_survives_the_wire() {
    let data = DataField::new(&[b'd'; DATA_SIZE]).unwrap();
    let prev_hash = HashField::new(&[b'p'; HASH_SIZE]).unwrap();
    let curr_hash = HashField::new(&[b'c'; HASH_SIZE]).unwrap();
    let sent = envelope(Message::ResponseData(DataResult {
        idx: u64::MAX,
        nonce: u64::MAX - 1,
        prev_hash,
        curr_hash,
        data,
    }));

    let bytes = encode_to_vec(&sent);
    assert_eq!(bytes.len(), MAX_MESSAGE_SIZE);
    // No terminator anywhere: the slots run right up to the end of the datagram.
    assert!(bytes[MAX_MESSAGE_SIZE - DATA_SIZE..].iter().all(|b| *b == b'd'));

    let received = decode(&bytes).unwrap();
    assert_eq!(received, sent);
    match received.message {
        Message::ResponseData(res) => {
            assert_eq!(res.data.text_bytes().len(), DATA_SIZE);
            assert_eq!(res.prev_hash.text_bytes().len(), HASH_SIZE);
        }
        other => panic!("expected ResponseData, got {other:?}"),
    }
}
