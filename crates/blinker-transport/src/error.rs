use crate::Network;

/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The address could not be resolved for the requested network.
    #[error("resolve {network} {address} failed: {source}")]
    Resolve {
        network: Network,
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// Establishing the connection failed.
    #[error("dial failed: {0}")]
    Dial(#[source] std::io::Error),

    /// Sending data failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Receiving data failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// The remote peer closed the connection.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// The connection was closed locally.
    #[error("use of closed connection")]
    Closed,
}
