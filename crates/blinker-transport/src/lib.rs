//! Transport abstraction layer for Blinker.
//!
//! Provides the [`Connection`] trait the session layer talks to, the
//! [`Network`] family selector, address resolution and dialing, and
//! three implementations:
//!
//! - [`TcpConnection`]: stream transport (`tcp`, `tcp4`, `tcp6`)
//! - [`UdpConnection`]: datagram transport (`udp`, `udp4`, `udp6`)
//! - [`MemoryConnection`]: in-process pair, for injected connections
//!   and tests
//!
//! # Framing
//!
//! The device protocol has no length prefix: one `send` is expected to
//! arrive as one `recv`. That holds for datagrams and for the memory
//! pair. Over TCP a frame may be split or coalesced by the network; the
//! stream transport does not try to correct for it.

mod error;
mod memory;
mod network;
mod tcp;
mod udp;

pub use error::TransportError;
pub use memory::MemoryConnection;
pub use network::{Network, UnknownNetwork, connect, resolve};
pub use tcp::TcpConnection;
pub use udp::UdpConnection;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Allocates the next process-wide unique id.
    pub(crate) fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// A single live connection that can send and receive bytes.
///
/// ## Trait bounds explained
///
/// - `Send + Sync` → the connection is shared between the protocol task
///   and whichever task calls `Session::close`, and Tokio may run either
///   of them on any worker thread.
/// - `'static` → the connection owns its socket and buffers. It is
///   stored in a long-lived spawned task, so it can't borrow anything
///   temporary.
///
/// ## Why `#[async_trait]`
///
/// A session holds whichever transport it was given as
/// `Arc<dyn Connection>`, so the trait has to be object safe. Native
/// `async fn` in traits returns an opaque future per implementation,
/// which rules out `dyn`. `#[async_trait]` rewrites each method to
/// return `Pin<Box<dyn Future + Send>>` instead: one allocation per call
/// in exchange for a single concrete trait object type.
///
/// ## Why everything takes `&self`
///
/// The protocol task sits in `recv` while another task calls
/// [`close`](Connection::close) to unblock it. With `&mut self` those
/// two could never overlap, so each implementation keeps interior
/// state instead: a cancellation token that doubles as the closed flag.
#[async_trait]
pub trait Connection: Send + Sync + 'static {
    /// Writes one message to the remote peer.
    async fn send(&self, data: &[u8]) -> Result<(), TransportError>;

    /// Reads the next message into `buf`, returning the number of bytes.
    ///
    /// Read deadlines are applied by the caller with
    /// `tokio::time::timeout_at`. A peer that has gone away yields
    /// [`TransportError::ConnectionClosed`].
    async fn recv(&self, buf: &mut [u8]) -> Result<usize, TransportError>;

    /// Closes the connection.
    ///
    /// Idempotent. A `recv` or `send` in progress on another task fails
    /// with [`TransportError::Closed`] right away.
    fn close(&self);

    /// Returns `true` once [`close`](Connection::close) has been called.
    fn is_closed(&self) -> bool;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;

    /// Human-readable description of the remote end, for logs.
    fn peer(&self) -> String;
}
