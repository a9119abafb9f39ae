//! Option set for building a [`Session`].

use std::sync::Arc;
use std::time::Duration;

use blinker_transport::{Connection, Network};
use tracing::level_filters::LevelFilter;

use crate::session::Session;
use crate::{ServerAddress, SessionConfig};

/// Called with the network and address whenever resolution fails.
pub type ResolveFailFn = Arc<dyn Fn(Network, &str) + Send + Sync>;

/// Called with the requested power state when a `powerset` arrives.
pub type PowerSetFn = Arc<dyn Fn(bool) + Send + Sync>;

/// Called whenever a status report is sent; returns the current state.
pub type UpdateFn = Arc<dyn Fn() -> bool + Send + Sync>;

/// The three optional hooks a session calls into.
///
/// All of them run synchronously on the session's task, so they should
/// return quickly.
#[derive(Clone, Default)]
pub(crate) struct Callbacks {
    pub(crate) resolve_fail: Option<ResolveFailFn>,
    pub(crate) power_set: Option<PowerSetFn>,
    pub(crate) update: Option<UpdateFn>,
}

impl Callbacks {
    pub(crate) fn resolve_failed(&self, network: Network, address: &str) {
        if let Some(cb) = &self.resolve_fail {
            cb(network, address);
        }
    }

    pub(crate) fn power_set(&self, value: bool) {
        if let Some(cb) = &self.power_set {
            cb(value);
        }
    }

    /// The state to report; `false` when no hook is installed.
    pub(crate) fn status(&self) -> bool {
        self.update.as_ref().is_some_and(|cb| cb())
    }
}

/// Builder for a [`Session`].
///
/// Every setter overrides any earlier call for the same field. Values
/// that can't be used are ignored rather than rejected: an unknown
/// network name leaves the address unset, and an out-of-range timeout
/// falls back to the default when [`build`](Self::build) validates the
/// configuration.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicBool, Ordering};
/// use std::time::Duration;
///
/// use blinker_session::SessionBuilder;
///
/// let power = Arc::new(AtomicBool::new(false));
/// let (set, get) = (Arc::clone(&power), Arc::clone(&power));
///
/// let session = SessionBuilder::new()
///     .server_address("tcp", "device.example.com:8181")
///     .timeout(Duration::from_secs(30))
///     .on_power_set(move |on| set.store(on, Ordering::Relaxed))
///     .on_update(move || get.load(Ordering::Relaxed))
///     .build();
///
/// assert!(!session.is_running());
/// ```
pub struct SessionBuilder {
    config: SessionConfig,
    connection: Option<Arc<dyn Connection>>,
    log_level: LevelFilter,
    callbacks: Callbacks,
}

impl SessionBuilder {
    /// Creates a builder with default settings: 60s timeout, no server,
    /// no hooks, no extra log filtering.
    pub fn new() -> Self {
        Self {
            config: SessionConfig::default(),
            connection: None,
            log_level: LevelFilter::TRACE,
            callbacks: Callbacks::default(),
        }
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the protocol loop's read timeout (5s..=180s).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Sets the server to dial.
    ///
    /// `network` is one of `tcp`, `tcp4`, `tcp6`, `udp`, `udp4`, `udp6`.
    /// Anything else, or an empty address, is ignored.
    pub fn server_address(mut self, network: &str, address: &str) -> Self {
        if address.is_empty() {
            return self;
        }
        match network.parse::<Network>() {
            Ok(network) => {
                self.config.server = Some(ServerAddress {
                    network,
                    address: address.to_string(),
                });
            }
            Err(e) => tracing::debug!(error = %e, "ignoring server address"),
        }
        self
    }

    /// Uses an already established connection instead of dialing.
    ///
    /// The session runs one protocol loop on it and goes idle when that
    /// loop ends; it never redials.
    pub fn connection(mut self, conn: Arc<dyn Connection>) -> Self {
        self.connection = Some(conn);
        self
    }

    /// Minimum level for the session's own log events.
    ///
    /// Events still pass through the installed `tracing` subscriber;
    /// this only filters further. `LevelFilter::OFF` silences the session.
    pub fn log_level(mut self, level: LevelFilter) -> Self {
        self.log_level = level;
        self
    }

    /// Hook for failed address resolution.
    pub fn on_resolve_fail(
        mut self,
        f: impl Fn(Network, &str) + Send + Sync + 'static,
    ) -> Self {
        self.callbacks.resolve_fail = Some(Arc::new(f));
        self
    }

    /// Hook for `powerset` commands.
    pub fn on_power_set(mut self, f: impl Fn(bool) + Send + Sync + 'static) -> Self {
        self.callbacks.power_set = Some(Arc::new(f));
        self
    }

    /// Hook supplying the state for status reports.
    pub fn on_update(mut self, f: impl Fn() -> bool + Send + Sync + 'static) -> Self {
        self.callbacks.update = Some(Arc::new(f));
        self
    }

    /// Validates the configuration and creates an idle session.
    pub fn build(self) -> Session {
        Session::new(
            self.config.validated(),
            self.connection,
            self.log_level,
            self.callbacks,
        )
    }
}

impl Default for SessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}
