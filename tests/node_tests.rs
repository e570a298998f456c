//! Multi-node integration tests over loopback UDP
//!
//! Each test owns a disjoint port range, so nodes from tests running in
//! parallel never discover each other.

use gossip_chain::network::{decode, encode_to_vec, DataResult, Envelope, Message};
use gossip_chain::{Blockchain, Config, DataField, HashField, PeerNode, WorkerState};
use std::net::UdpSocket;
use std::thread;
use std::time::{Duration, Instant};

const CONVERGE_TIMEOUT: Duration = Duration::from_secs(10);

fn config(start: u16, end: u16) -> Config {
    Config {
        port_start: start,
        port_end: end,
        max_bind_attempts: 200,
        ..Config::default()
    }
}

/// Poll `done` until it holds or the timeout passes.
fn wait_for(mut done: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + CONVERGE_TIMEOUT;
    while Instant::now() < deadline {
        if done() {
            return true;
        }
        thread::sleep(Duration::from_millis(20));
    }
    done()
}

/// A bare socket outside the node's range that speaks the wire format.
struct RawPeer {
    socket: UdpSocket,
    port: u16,
}

impl RawPeer {
    fn bind(port: u16) -> RawPeer {
        let socket = UdpSocket::bind(("127.0.0.1", port)).unwrap();
        socket
            .set_read_timeout(Some(Duration::from_millis(300)))
            .unwrap();
        RawPeer { socket, port }
    }

    fn send(&self, message: Message, to: u16) {
        let bytes = encode_to_vec(&Envelope {
            sender_port: self.port,
            receive_port: self.port,
            message,
        });
        self.send_raw(&bytes, to);
    }

    fn send_raw(&self, bytes: &[u8], to: u16) {
        self.socket.send_to(bytes, ("127.0.0.1", to)).unwrap();
    }

    fn recv(&self) -> Option<Envelope> {
        let mut buf = [0u8; 2048];
        match self.socket.recv_from(&mut buf) {
            Ok((n, _)) => Some(decode(&buf[..n]).unwrap()),
            Err(_) => None,
        }
    }
}

#[test]
fn test_late_joiner_converges_to_existing_chain() {
    let a = PeerNode::start(config(53000, 53009)).unwrap();
    a.add_data(b"hello").unwrap();
    a.add_data(b"world").unwrap();

    let b = PeerNode::start(config(53000, 53009)).unwrap();

    let expected = a.chain().unwrap();
    assert!(
        wait_for(|| b.chain().unwrap() == expected),
        "peer never converged:\n{}",
        b.chain().unwrap()
    );
    assert_eq!(b.chain_length().unwrap(), 3);
    assert_eq!(b.status().unwrap().first_invalid_block, None);

    assert!(wait_for(|| a.peers().unwrap() == vec![b.receive_port()]));
    assert_eq!(b.peers().unwrap(), vec![a.receive_port()]);
}

#[test]
fn test_block_added_after_joining_spreads() {
    let a = PeerNode::start(config(53010, 53019)).unwrap();
    let b = PeerNode::start(config(53010, 53019)).unwrap();
    assert!(wait_for(|| a.peers().unwrap().len() == 1 && b.peers().unwrap().len() == 1));

    b.add_data(b"from b").unwrap();
    let expected = b.chain().unwrap();
    assert!(wait_for(|| a.chain().unwrap() == expected));
    assert_eq!(
        a.chain().unwrap().get_block(1).unwrap().get_data().to_text(),
        "from b"
    );
}

#[test]
fn test_request_for_unknown_index_gets_no_reply() {
    let node = PeerNode::start(config(53020, 53029)).unwrap();
    let peer = RawPeer::bind(53030);

    peer.send(Message::RequestChash { idx: 5 }, node.receive_port());
    assert!(peer.recv().is_none());

    peer.send(Message::RequestChash { idx: 0 }, node.receive_port());
    let reply = peer.recv().expect("no reply for index 0");
    let genesis_hash = *Blockchain::genesis().get_curr_hash();
    assert_eq!(
        reply.message,
        Message::ResponseChash {
            idx: 0,
            hash: genesis_hash
        }
    );
    assert_eq!(reply.receive_port, node.receive_port());
    assert_eq!(reply.sender_port, node.sender_port());
}

#[test]
fn test_malformed_datagrams_do_not_stop_the_listener() {
    let node = PeerNode::start(config(53040, 53049)).unwrap();
    let peer = RawPeer::bind(53050);

    peer.send_raw(&[1, 2, 3], node.receive_port());
    let mut unknown_type = encode_to_vec(&Envelope {
        sender_port: peer.port,
        receive_port: peer.port,
        message: Message::Connect,
    });
    unknown_type[4] = 0xFF;
    peer.send_raw(&unknown_type, node.receive_port());

    peer.send(Message::RequestChash { idx: 0 }, node.receive_port());
    assert!(peer.recv().is_some());
    assert_eq!(node.listener_state().unwrap(), WorkerState::Running);
}

#[test]
fn test_connect_is_acknowledged_and_disconnect_evicts() {
    let node = PeerNode::start(config(53060, 53069)).unwrap();
    let peer = RawPeer::bind(53070);

    peer.send(Message::Connect, node.receive_port());
    let ack = peer.recv().expect("no ConnectAck");
    assert_eq!(ack.message, Message::ConnectAck);
    assert!(wait_for(|| node.peers().unwrap() == vec![peer.port]));

    peer.send(Message::Disconnect, node.receive_port());
    assert!(wait_for(|| node.peers().unwrap().is_empty()));
}

#[test]
fn test_shutdown_announces_departure() {
    let a = PeerNode::start(config(53080, 53089)).unwrap();
    let b = PeerNode::start(config(53080, 53089)).unwrap();
    assert!(wait_for(|| a.peers().unwrap() == vec![b.receive_port()]));

    b.shutdown().unwrap();
    assert!(wait_for(|| a.peers().unwrap().is_empty()));
    assert_eq!(b.listener_state().unwrap(), WorkerState::Stopped);
}

#[test]
fn test_three_peers_agree_on_one_chain() {
    let a = PeerNode::start(config(53100, 53109)).unwrap();
    a.add_data(b"first").unwrap();
    let b = PeerNode::start(config(53100, 53109)).unwrap();
    let c = PeerNode::start(config(53100, 53109)).unwrap();

    let expected = a.chain().unwrap();
    assert!(wait_for(|| b.chain().unwrap() == expected && c.chain().unwrap() == expected));
    assert!(wait_for(|| {
        [&a, &b, &c]
            .iter()
            .all(|node| node.peers().unwrap().len() == 2)
    }));
}

#[test]
fn test_block_failing_proof_of_work_is_applied_and_sync_moves_on() {
    let node = PeerNode::start(config(53120, 53129)).unwrap();
    let peer = RawPeer::bind(53130);

    peer.send(Message::Connect, node.receive_port());
    assert_eq!(peer.recv().map(|e| e.message), Some(Message::ConnectAck));

    let forged = DataResult {
        idx: 1,
        nonce: 0,
        prev_hash: *Blockchain::genesis().get_curr_hash(),
        curr_hash: HashField::new(b"bogus").unwrap(),
        data: DataField::new(b"forged").unwrap(),
    };
    peer.send(Message::ResponseData(forged), node.receive_port());

    assert!(wait_for(|| node.chain_length().unwrap() == 2));
    assert_eq!(node.status().unwrap().first_invalid_block, Some(1));
    assert_eq!(
        node.chain().unwrap().get_block(1).unwrap().get_data().to_text(),
        "forged"
    );

    // The node asks its peers for the next index; resync requests for
    // index 0 may arrive in between.
    let deadline = Instant::now() + CONVERGE_TIMEOUT;
    let mut asked_for_next = false;
    while !asked_for_next && Instant::now() < deadline {
        if let Some(envelope) = peer.recv() {
            asked_for_next = envelope.message == Message::RequestChash { idx: 2 };
        }
    }
    assert!(asked_for_next, "node never requested index 2");
}
