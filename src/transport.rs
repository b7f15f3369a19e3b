use crate::error::ResolveError;
use crate::protocol::MAX_RESPONSE_SIZE;
use async_trait::async_trait;
use std::{
    io,
    net::{IpAddr, SocketAddr},
    time::Duration,
};
use tokio::{net::UdpSocket, time::timeout};
use tracing::{debug, trace};

pub const DNS_PORT: u16 = 53;

pub const RECEIVE_TIMEOUT: Duration = Duration::from_secs(5);

/// The socket operations the transport needs, as a seam so tests can swap in
/// a scripted double.
#[async_trait]
pub trait Socket {
    async fn send_to(&self, buf: &[u8], target: SocketAddr) -> io::Result<usize>;
    async fn recv(&self, buf: &mut [u8]) -> io::Result<usize>;
}

#[async_trait]
impl Socket for UdpSocket {
    #[inline]
    async fn send_to(&self, buf: &[u8], target: SocketAddr) -> io::Result<usize> {
        UdpSocket::send_to(self, buf, target).await
    }

    #[inline]
    async fn recv(&self, buf: &mut [u8]) -> io::Result<usize> {
        let (size, _origin) = self.recv_from(buf).await?;
        Ok(size)
    }
}

/// One UDP socket shared by every query in the session.
///
/// Queries are strictly sequential, so no correlation of replies to requests
/// happens here: the next datagram is taken as the reply. A receive that
/// produces nothing within the timeout triggers exactly one resend of the
/// same payload; a second silence is a failure.
pub struct Transport<S = UdpSocket> {
    socket: S,
    timeout: Duration,
}

impl Transport<UdpSocket> {
    /// Binds to an ephemeral local port.
    pub async fn bind() -> io::Result<Transport<UdpSocket>> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        Ok(Transport {
            socket,
            timeout: RECEIVE_TIMEOUT,
        })
    }
}

impl<S: Socket + Send + Sync> Transport<S> {
    pub fn with_socket(socket: S, timeout: Duration) -> Transport<S> {
        Transport { socket, timeout }
    }

    /// Sends `payload` to `server` on the DNS port and returns the next
    /// datagram that arrives.
    pub async fn exchange(&self, payload: &[u8], server: IpAddr) -> Result<Vec<u8>, ResolveError> {
        let target = SocketAddr::new(server, DNS_PORT);
        let mut buf = [0u8; MAX_RESPONSE_SIZE];

        self.socket.send_to(payload, target).await?;

        match timeout(self.timeout, self.socket.recv(&mut buf)).await {
            Ok(received) => {
                let size = received?;
                trace!(%server, size, "Received response");
                Ok(buf[0..size].to_vec())
            }
            Err(_elapsed) => {
                // One retransmission of the identical payload
                debug!(%server, "Receive timed out, resending query");
                self.socket.send_to(payload, target).await?;

                match timeout(self.timeout, self.socket.recv(&mut buf)).await {
                    Ok(received) => {
                        let size = received?;
                        trace!(%server, size, "Received response after resend");
                        Ok(buf[0..size].to_vec())
                    }
                    Err(_elapsed) => Err(ResolveError::Timeout {
                        server,
                        attempts: 2,
                    }),
                }
            }
        }
    }
}
