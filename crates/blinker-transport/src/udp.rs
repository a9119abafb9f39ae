//! Datagram transport over a connected `tokio::net::UdpSocket`.

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};

use async_trait::async_trait;
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;

use crate::{Connection, ConnectionId, TransportError};

/// A UDP [`Connection`]: one `send` is one datagram.
pub struct UdpConnection {
    id: ConnectionId,
    peer: SocketAddr,
    socket: UdpSocket,
    closed: CancellationToken,
}

impl UdpConnection {
    /// Binds an ephemeral local port of the same IP version as `addr`
    /// and connects the socket to it.
    pub async fn connect(addr: SocketAddr) -> Result<Self, TransportError> {
        let local: SocketAddr = if addr.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let socket = UdpSocket::bind(local)
            .await
            .map_err(TransportError::Dial)?;
        socket.connect(addr).await.map_err(TransportError::Dial)?;
        Ok(Self::from_socket(socket, addr))
    }

    /// Wraps a socket that is already connected to `peer`.
    pub fn from_socket(socket: UdpSocket, peer: SocketAddr) -> Self {
        Self {
            id: ConnectionId::next(),
            peer,
            socket,
            closed: CancellationToken::new(),
        }
    }

    /// The local address the socket is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }
}

#[async_trait]
impl Connection for UdpConnection {
    async fn send(&self, data: &[u8]) -> Result<(), TransportError> {
        tokio::select! {
            biased;
            _ = self.closed.cancelled() => Err(TransportError::Closed),
            res = self.socket.send(data) => res
                .map(|_| ())
                .map_err(TransportError::SendFailed),
        }
    }

    async fn recv(&self, buf: &mut [u8]) -> Result<usize, TransportError> {
        tokio::select! {
            biased;
            _ = self.closed.cancelled() => Err(TransportError::Closed),
            res = self.socket.recv(buf) => res.map_err(TransportError::ReceiveFailed),
        }
    }

    fn close(&self) {
        if !self.closed.is_cancelled() {
            tracing::debug!(conn_id = %self.id, peer = %self.peer, "closing udp connection");
            self.closed.cancel();
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    fn id(&self) -> ConnectionId {
        self.id
    }

    fn peer(&self) -> String {
        format!("udp://{}", self.peer)
    }
}
