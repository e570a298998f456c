//! UDP plumbing: port allocation, the shared outbound buffer and the
//! non-blocking receive socket.
//!
//! Every node binds two sockets on the configured host. Datagrams leave from
//! the send socket and arrive on the receive socket; the ports are chosen at
//! random inside the configured range.

use crate::config::Config;
use crate::error::{BlockchainError, Result};
use crate::network::codec;
use crate::network::message::{Envelope, Message};
use crate::utils::lock;
use log::debug;
use rand::Rng;
use std::io::ErrorKind;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket};
use std::sync::Mutex;

/// Bind a socket on a random free port of the configured range, skipping
/// `exclude`. Gives up after `config.max_bind_attempts` tries.
pub fn bind_random_port(config: &Config, exclude: &[u16]) -> Result<(UdpSocket, u16)> {
    let mut rng = rand::thread_rng();
    for _ in 0..config.max_bind_attempts {
        let port = rng.gen_range(config.ports());
        if exclude.contains(&port) {
            continue;
        }
        debug!("Acquiring socket on {port}");
        match UdpSocket::bind(config.socket_addr(port)) {
            Ok(socket) => return Ok((socket, port)),
            Err(e) => debug!("Failed to acquire socket on port {port}: {e}"),
        }
    }
    Err(BlockchainError::PortsExhausted {
        start: config.port_start,
        end: config.port_end,
        attempts: config.max_bind_attempts,
    })
}

struct SendState {
    socket: UdpSocket,
    buffer: Vec<u8>,
}

/// The send socket and its scratch buffer.
///
/// Encoding and sending happen under one lock, so concurrent senders never
/// interleave inside the buffer.
pub struct Outbound {
    state: Mutex<SendState>,
    host: Ipv4Addr,
    sender_port: u16,
    receive_port: u16,
}

impl Outbound {
    pub fn sender_port(&self) -> u16 {
        self.sender_port
    }

    pub fn receive_port(&self) -> u16 {
        self.receive_port
    }

    fn envelope(&self, message: Message) -> Envelope {
        Envelope {
            sender_port: self.sender_port,
            receive_port: self.receive_port,
            message,
        }
    }

    /// Send `message` to one port.
    pub fn send(&self, message: Message, port: u16) -> Result<()> {
        self.broadcast(message, [port]).map(|_| ())
    }

    /// Send `message` to each port in `ports`; returns how many sends
    /// succeeded. Individual send failures are logged and skipped.
    pub fn broadcast<I>(&self, message: Message, ports: I) -> Result<usize>
    where
        I: IntoIterator<Item = u16>,
    {
        let envelope = self.envelope(message);
        let mut guard = lock(&self.state, "send buffer")?;
        let state = &mut *guard;
        let size = codec::encode(&envelope, &mut state.buffer)?;

        let mut sent = 0;
        for port in ports {
            let dest = SocketAddr::V4(SocketAddrV4::new(self.host, port));
            match state.socket.send_to(&state.buffer[..size], dest) {
                Ok(_) => sent += 1,
                Err(e) => debug!("Failed to send {:?} to {port}: {e}", envelope.message.message_type()),
            }
        }
        Ok(sent)
    }
}

/// What one poll of the receive socket produced.
#[derive(Debug)]
pub enum Poll<'a> {
    Datagram(&'a [u8]),
    Empty,
}

/// Where the listener reads datagrams from.
pub trait PollSource {
    /// Return one queued datagram or [`Poll::Empty`]. An error ends the
    /// listener.
    fn poll(&mut self) -> std::io::Result<Poll<'_>>;
}

/// The non-blocking receive socket, owned by the listener.
pub struct Inbound {
    socket: UdpSocket,
    buffer: Vec<u8>,
}

impl PollSource for Inbound {
    /// Read one datagram if one is queued. Only genuine socket failures are
    /// errors; an empty queue or a transient reset is [`Poll::Empty`].
    fn poll(&mut self) -> std::io::Result<Poll<'_>> {
        match self.socket.recv_from(&mut self.buffer) {
            Ok((n, _from)) => Ok(Poll::Datagram(&self.buffer[..n])),
            Err(e) => match e.kind() {
                ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted => {
                    Ok(Poll::Empty)
                }
                // ICMP port-unreachable from an earlier send to a departed peer.
                ErrorKind::ConnectionReset | ErrorKind::ConnectionRefused => {
                    debug!("Ignoring transient receive error: {e}");
                    Ok(Poll::Empty)
                }
                _ => Err(e),
            },
        }
    }
}

/// Both sockets of a node.
pub struct Transport {
    pub outbound: Outbound,
    pub inbound: Inbound,
}

impl Transport {
    pub fn bind(config: &Config) -> Result<Transport> {
        let (send_socket, sender_port) = bind_random_port(config, &[])?;
        let (recv_socket, receive_port) = bind_random_port(config, &[sender_port])?;
        recv_socket.set_nonblocking(true).map_err(|e| {
            BlockchainError::Network(format!("Failed to make receive socket non-blocking: {e}"))
        })?;

        Ok(Transport {
            outbound: Outbound {
                state: Mutex::new(SendState {
                    socket: send_socket,
                    buffer: vec![0u8; config.recv_buffer_size],
                }),
                host: config.host,
                sender_port,
                receive_port,
            },
            inbound: Inbound {
                socket: recv_socket,
                buffer: vec![0u8; config.recv_buffer_size],
            },
        })
    }
}
