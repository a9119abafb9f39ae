//! Network families, address resolution and dialing.

use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{Connection, TcpConnection, TransportError, UdpConnection};

/// The transport family a session dials.
///
/// The unsuffixed names accept either IP version; the `4`/`6` variants
/// restrict resolution to that version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Tcp,
    Tcp4,
    Tcp6,
    Udp,
    Udp4,
    Udp6,
}

impl Network {
    /// Returns `true` for the stream (TCP) families.
    pub fn is_stream(self) -> bool {
        matches!(self, Self::Tcp | Self::Tcp4 | Self::Tcp6)
    }

    /// Returns `true` for the datagram (UDP) families.
    pub fn is_datagram(self) -> bool {
        !self.is_stream()
    }

    /// Returns `true` if `addr` is usable for this family.
    pub fn accepts(self, addr: &SocketAddr) -> bool {
        match self {
            Self::Tcp | Self::Udp => true,
            Self::Tcp4 | Self::Udp4 => addr.is_ipv4(),
            Self::Tcp6 | Self::Udp6 => addr.is_ipv6(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tcp => "tcp",
            Self::Tcp4 => "tcp4",
            Self::Tcp6 => "tcp6",
            Self::Udp => "udp",
            Self::Udp4 => "udp4",
            Self::Udp6 => "udp6",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unrecognized network name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown network: {0}")]
pub struct UnknownNetwork(pub String);

impl FromStr for Network {
    type Err = UnknownNetwork;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tcp" => Ok(Self::Tcp),
            "tcp4" => Ok(Self::Tcp4),
            "tcp6" => Ok(Self::Tcp6),
            "udp" => Ok(Self::Udp),
            "udp4" => Ok(Self::Udp4),
            "udp6" => Ok(Self::Udp6),
            other => Err(UnknownNetwork(other.to_string())),
        }
    }
}

/// Resolves `address` (`host:port`) to the first socket address that
/// matches `network`.
///
/// # Errors
/// Returns [`TransportError::Resolve`] if the lookup fails or yields no
/// address of the requested IP version.
pub async fn resolve(
    network: Network,
    address: &str,
) -> Result<SocketAddr, TransportError> {
    let resolve_err = |source| TransportError::Resolve {
        network,
        address: address.to_string(),
        source,
    };

    let mut addrs = tokio::net::lookup_host(address)
        .await
        .map_err(resolve_err)?;

    addrs.find(|addr| network.accepts(addr)).ok_or_else(|| {
        resolve_err(io::Error::new(
            io::ErrorKind::AddrNotAvailable,
            "no address of the requested family",
        ))
    })
}

/// Dials `addr` using the transport implied by `network`.
///
/// # Errors
/// Returns [`TransportError::Dial`] if the connection can't be set up.
pub async fn connect(
    network: Network,
    addr: SocketAddr,
) -> Result<Arc<dyn Connection>, TransportError> {
    let conn: Arc<dyn Connection> = if network.is_stream() {
        Arc::new(TcpConnection::connect(addr).await?)
    } else {
        Arc::new(UdpConnection::connect(addr).await?)
    };
    tracing::debug!(conn_id = %conn.id(), %network, %addr, "dialed");
    Ok(conn)
}
