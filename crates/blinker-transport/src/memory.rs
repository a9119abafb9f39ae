//! In-process connection pair.
//!
//! Useful as an injected connection when the bytes come from somewhere
//! other than a socket, and as the server side of tests: every `send`
//! on one end is delivered as exactly one `recv` on the other.

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;

use crate::{Connection, ConnectionId, TransportError};

/// One end of a [`MemoryConnection::pair`].
pub struct MemoryConnection {
    id: ConnectionId,
    tx: mpsc::UnboundedSender<Vec<u8>>,
    rx: Mutex<mpsc::UnboundedReceiver<Vec<u8>>>,
    closed: CancellationToken,
    peer_closed: CancellationToken,
}

impl MemoryConnection {
    /// Creates two connected ends.
    pub fn pair() -> (Self, Self) {
        let (a_tx, b_rx) = mpsc::unbounded_channel();
        let (b_tx, a_rx) = mpsc::unbounded_channel();
        let a_closed = CancellationToken::new();
        let b_closed = CancellationToken::new();

        let a = Self {
            id: ConnectionId::next(),
            tx: a_tx,
            rx: Mutex::new(a_rx),
            closed: a_closed.clone(),
            peer_closed: b_closed.clone(),
        };
        let b = Self {
            id: ConnectionId::next(),
            tx: b_tx,
            rx: Mutex::new(b_rx),
            closed: b_closed,
            peer_closed: a_closed,
        };
        (a, b)
    }
}

#[async_trait]
impl Connection for MemoryConnection {
    async fn send(&self, data: &[u8]) -> Result<(), TransportError> {
        if self.closed.is_cancelled() {
            return Err(TransportError::Closed);
        }
        if self.peer_closed.is_cancelled() {
            return Err(TransportError::ConnectionClosed("peer closed".into()));
        }
        self.tx
            .send(data.to_vec())
            .map_err(|_| TransportError::ConnectionClosed("peer dropped".into()))
    }

    async fn recv(&self, buf: &mut [u8]) -> Result<usize, TransportError> {
        let mut rx = tokio::select! {
            biased;
            _ = self.closed.cancelled() => return Err(TransportError::Closed),
            rx = self.rx.lock() => rx,
        };

        // Messages already queued are still delivered after the peer
        // closes; only an empty queue reports the close.
        tokio::select! {
            biased;
            _ = self.closed.cancelled() => Err(TransportError::Closed),
            msg = rx.recv() => match msg {
                Some(data) => {
                    let n = data.len().min(buf.len());
                    buf[..n].copy_from_slice(&data[..n]);
                    Ok(n)
                }
                None => Err(TransportError::ConnectionClosed("peer dropped".into())),
            },
            _ = self.peer_closed.cancelled() => {
                Err(TransportError::ConnectionClosed("peer closed".into()))
            }
        }
    }

    fn close(&self) {
        self.closed.cancel();
    }

    fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    fn id(&self) -> ConnectionId {
        self.id
    }

    fn peer(&self) -> String {
        "memory".to_string()
    }
}

impl Drop for MemoryConnection {
    fn drop(&mut self) {
        self.closed.cancel();
    }
}
