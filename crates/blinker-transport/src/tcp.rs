//! Stream transport over `tokio::net::TcpStream`.

use std::io;
use std::net::SocketAddr;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::{Connection, ConnectionId, TransportError};

/// A TCP [`Connection`].
///
/// The stream is split so a blocked `recv` never holds up a `send`.
/// `close` fires an internal token that both halves race against.
pub struct TcpConnection {
    id: ConnectionId,
    peer: SocketAddr,
    reader: Mutex<OwnedReadHalf>,
    writer: Mutex<OwnedWriteHalf>,
    closed: CancellationToken,
}

impl TcpConnection {
    /// Dials `addr`.
    pub async fn connect(addr: SocketAddr) -> Result<Self, TransportError> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(TransportError::Dial)?;
        Self::from_stream(stream).map_err(TransportError::Dial)
    }

    /// Wraps an already connected stream.
    pub fn from_stream(stream: TcpStream) -> io::Result<Self> {
        let peer = stream.peer_addr()?;
        stream.set_nodelay(true)?;
        let (reader, writer) = stream.into_split();
        Ok(Self {
            id: ConnectionId::next(),
            peer,
            reader: Mutex::new(reader),
            writer: Mutex::new(writer),
            closed: CancellationToken::new(),
        })
    }

    /// The remote socket address.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }
}

#[async_trait]
impl Connection for TcpConnection {
    async fn send(&self, data: &[u8]) -> Result<(), TransportError> {
        tokio::select! {
            biased;
            _ = self.closed.cancelled() => Err(TransportError::Closed),
            res = async {
                let mut writer = self.writer.lock().await;
                writer.write_all(data).await
            } => res.map_err(TransportError::SendFailed),
        }
    }

    async fn recv(&self, buf: &mut [u8]) -> Result<usize, TransportError> {
        let capacity = buf.len();
        tokio::select! {
            biased;
            _ = self.closed.cancelled() => Err(TransportError::Closed),
            res = async {
                let mut reader = self.reader.lock().await;
                reader.read(buf).await
            } => match res {
                Ok(0) if capacity > 0 => Err(TransportError::ConnectionClosed(
                    format!("{} sent EOF", self.peer),
                )),
                Ok(n) => Ok(n),
                Err(e) => Err(TransportError::ReceiveFailed(e)),
            },
        }
    }

    fn close(&self) {
        if !self.closed.is_cancelled() {
            tracing::debug!(conn_id = %self.id, peer = %self.peer, "closing tcp connection");
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
        format!("tcp://{}", self.peer)
    }
}
