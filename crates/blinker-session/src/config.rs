//! Session configuration.

use std::time::Duration;

use blinker_transport::Network;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Default heartbeat timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Smallest accepted timeout.
pub const MIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Largest accepted timeout.
pub const MAX_TIMEOUT: Duration = Duration::from_secs(180);

/// Where the connector dials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerAddress {
    pub network: Network,
    /// `host:port`; resolved again on every connection attempt.
    pub address: String,
}

/// Configuration for a [`Session`](crate::Session).
///
/// Usually assembled through [`SessionBuilder`](crate::SessionBuilder);
/// it derives serde so a host program can also keep it in its own config
/// file and pass it in with
/// [`SessionBuilder::config`](crate::SessionBuilder::config).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Read timeout for the protocol loop. Heartbeats are sent five
    /// seconds before it would elapse.
    pub timeout: Duration,

    /// Server to dial. Ignored when a connection is injected.
    pub server: Option<ServerAddress>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            server: None,
        }
    }
}

impl SessionConfig {
    /// Replaces any out-of-range value with its default.
    ///
    /// A timeout outside [`MIN_TIMEOUT`]`..=`[`MAX_TIMEOUT`] falls back
    /// to [`DEFAULT_TIMEOUT`].
    pub fn validated(mut self) -> Self {
        if !(MIN_TIMEOUT..=MAX_TIMEOUT).contains(&self.timeout) {
            warn!(
                timeout = ?self.timeout,
                default = ?DEFAULT_TIMEOUT,
                "timeout out of range, using default"
            );
            self.timeout = DEFAULT_TIMEOUT;
        }
        self
    }
}
