//! UDP transport for the CS2 CAN gateway
//!
//! The gateway accepts 13-byte frames on one port and forwards every bus
//! frame to a second port on the client side. This transport binds the
//! listen port and sends to `host:send_port`; both directions use a
//! non-blocking socket, so no background task is needed.

use super::Transport;
use crate::codec::{Codec, Cs2Codec};
use crate::constants::{CS2_FRAME_SIZE, MAX_SOCKET_RETRY_ATTEMPTS, RETRY_BASE_DELAY_MS};
use crate::error::{TrackError, Result};
use crate::protocol::CanFrame;
use socket2::{Domain, Protocol, Socket, Type};
use std::collections::VecDeque;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::time::Duration;
use tracing::debug;

/// Datagram buffer, room for several frames per datagram
const RECV_BUFFER_SIZE: usize = CS2_FRAME_SIZE * 32;

pub struct UdpTransport {
    socket: UdpSocket,
    target: SocketAddr,
    codec: Cs2Codec,
    pending: VecDeque<CanFrame>,
    buf: Vec<u8>,
}

impl UdpTransport {
    /// Bind `listen_port` and send to `host:send_port`
    pub fn open(host: &str, send_port: u16, listen_port: u16) -> Result<Self> {
        let target = (host, send_port)
            .to_socket_addrs()
            .ok()
            .and_then(|mut addrs| addrs.next())
            .ok_or_else(|| TrackError::ConfigValidation {
                field: "transport.udp_host",
                reason: format!("cannot resolve '{}'", host),
            })?;

        let socket = create_reusable_udp_socket(listen_port)?;
        Ok(Self {
            socket,
            target,
            codec: Cs2Codec::new(),
            pending: VecDeque::new(),
            buf: vec![0u8; RECV_BUFFER_SIZE],
        })
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.local_addr().ok()
    }
}

impl Transport for UdpTransport {
    fn try_send(&mut self, frame: &CanFrame) -> bool {
        let mut datagram = Vec::with_capacity(CS2_FRAME_SIZE);
        self.codec.encode(frame, &mut datagram);
        match self.socket.send_to(&datagram, self.target) {
            Ok(_) => true,
            Err(e) => {
                debug!("UDP send to {} failed: {}", self.target, e);
                false
            }
        }
    }

    fn try_receive(&mut self) -> Option<CanFrame> {
        if self.pending.is_empty() {
            match self.socket.recv_from(&mut self.buf) {
                Ok((len, _)) => {
                    let pending = &mut self.pending;
                    self.codec.decode(&self.buf[..len], |frame| pending.push_back(frame));
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {}
                Err(e) => debug!("UDP receive failed: {}", e),
            }
        }
        self.pending.pop_front()
    }
}

/// Create a non-blocking UDP socket with SO_REUSEADDR and broadcast enabled
///
/// Retries a few times if the port is still in use (e.g., from previous run).
fn create_reusable_udp_socket(port: u16) -> Result<UdpSocket> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let map_err = |e| TrackError::UdpBind { port, source: e };

    for attempt in 0..MAX_SOCKET_RETRY_ATTEMPTS {
        let socket =
            Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP)).map_err(map_err)?;
        socket.set_reuse_address(true).map_err(map_err)?;
        socket.set_broadcast(true).map_err(map_err)?;
        socket.set_nonblocking(true).map_err(map_err)?;

        match socket.bind(&addr.into()) {
            Ok(_) => return Ok(socket.into()),
            Err(_) if attempt < MAX_SOCKET_RETRY_ATTEMPTS - 1 => {
                // Exponential backoff: 200ms, 400ms, 800ms, 1600ms
                std::thread::sleep(Duration::from_millis(RETRY_BASE_DELAY_MS * (1 << attempt)));
            }
            Err(e) => return Err(map_err(e)),
        }
    }

    Err(TrackError::UdpBind {
        port,
        source: std::io::Error::new(std::io::ErrorKind::AddrInUse, "failed after retries"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_udp_roundtrip_through_local_socket() {
        // Gateway side: plain socket standing in for the CS2
        let gateway = UdpSocket::bind("127.0.0.1:0").unwrap();
        let gateway_port = gateway.local_addr().unwrap().port();

        let mut transport = UdpTransport::open("127.0.0.1", gateway_port, 0).unwrap();
        let local_port = transport.local_addr().unwrap().port();

        assert!(transport.try_send(&CanFrame::new(0x0031_DF24, &[0xAA])));

        let mut buf = [0u8; 64];
        gateway
            .set_read_timeout(Some(Duration::from_secs(1)))
            .unwrap();
        let (len, _) = gateway.recv_from(&mut buf).unwrap();
        assert_eq!(len, CS2_FRAME_SIZE);
        assert_eq!(&buf[..6], &[0x00, 0x31, 0xDF, 0x24, 1, 0xAA]);

        // Echo it back to the transport's listen port
        gateway
            .send_to(&buf[..len], ("127.0.0.1", local_port))
            .unwrap();

        let mut received = None;
        for _ in 0..100 {
            received = transport.try_receive();
            if received.is_some() {
                break;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(received.map(|f| f.id), Some(0x0031_DF24));
    }

    #[test]
    fn test_unresolvable_host() {
        let result = UdpTransport::open("host.invalid", 15731, 0);
        assert!(matches!(result, Err(TrackError::ConfigValidation { .. })));
    }
}
