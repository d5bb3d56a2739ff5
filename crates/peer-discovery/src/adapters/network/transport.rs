use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{ToSocketAddrs, UdpSocket};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::ports::{NetworkError, PacketSender};
use crate::service::Discovery;
use crate::wire::MAX_PACKET_LEN;

/// Receive buffer; larger than any valid packet so oversize datagrams are
/// seen whole and rejected by the codec.
const RECV_BUFFER: usize = 2048;

/// UDP socket shared by the discovery sender and the receive loop.
///
/// Sends go through `try_send_to` and never wait on the socket.
#[derive(Debug, Clone)]
pub struct UdpTransport {
    socket: Arc<UdpSocket>,
}

impl UdpTransport {
    /// Bind to a local address (e.g. "0.0.0.0:8483").
    ///
    /// # Errors
    ///
    /// Returns error if socket binding fails.
    pub async fn bind<A: ToSocketAddrs>(addr: A) -> io::Result<Self> {
        let socket = UdpSocket::bind(addr).await?;
        Ok(Self {
            socket: Arc::new(socket),
        })
    }

    /// Get the local address the socket is bound to.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Feed every inbound datagram to `discovery` until `shutdown` fires.
    pub async fn run(self, discovery: Arc<Discovery>, mut shutdown: watch::Receiver<bool>) {
        let mut buf = vec![0u8; RECV_BUFFER];
        info!(addr = ?self.local_addr().ok(), "discovery transport listening");

        loop {
            tokio::select! {
                received = self.socket.recv_from(&mut buf) => match received {
                    Ok((len, origin)) => discovery.handle_packet(origin, &buf[..len]),
                    Err(e) => warn!(error = %e, "udp receive failed"),
                },
                _ = shutdown.changed() => {
                    info!("discovery transport stopped");
                    break;
                }
            }
        }
    }
}

impl PacketSender for UdpTransport {
    fn send_packet(&self, to: SocketAddr, packet: &[u8]) -> Result<(), NetworkError> {
        if packet.len() > MAX_PACKET_LEN {
            return Err(NetworkError::MessageTooLarge);
        }
        match self.socket.try_send_to(packet, to) {
            Ok(_) => Ok(()),
            Err(e) => {
                debug!(%to, error = %e, "udp send failed");
                Err(match e.kind() {
                    io::ErrorKind::WouldBlock => NetworkError::WouldBlock,
                    io::ErrorKind::InvalidInput | io::ErrorKind::AddrNotAvailable => {
                        NetworkError::InvalidAddress
                    }
                    _ => NetworkError::Io(e.to_string()),
                })
            }
        }
    }
}
