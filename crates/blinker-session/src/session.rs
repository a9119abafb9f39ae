//! The session handle and the state it shares with its background task.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use blinker_protocol::WireCodec;
use blinker_transport::Connection;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::level_filters::LevelFilter;

use crate::builder::Callbacks;
use crate::state::AtomicRunState;
use crate::{
    RunState, ServerAddress, SessionBuilder, SessionConfig, SessionError, connector, protocol,
};

/// State shared between [`Session`] handles and the background task.
pub(crate) struct Shared {
    pub(crate) config: SessionConfig,
    pub(crate) state: AtomicRunState,
    /// Fired by `close`, replaced by `reset`. Holding this lock also
    /// serializes `start` against `reset`, so the token a run clones is
    /// the one a later `close` fires.
    pub(crate) cancel: Mutex<CancellationToken>,
    /// The live (or injected, not yet used) connection. `close` takes it
    /// out and closes it, so the lock is shared with the task.
    pub(crate) conn: Mutex<Option<Arc<dyn Connection>>>,
    pub(crate) callbacks: Callbacks,
    pub(crate) log_level: LevelFilter,
    pub(crate) codec: WireCodec,
    idle: Notify,
}

impl Shared {
    pub(crate) fn log_enabled(&self, level: tracing::Level) -> bool {
        level <= self.log_level
    }
}

/// Returns the session to `Idle` when the background task ends, however
/// it ends, and wakes anyone in [`Session::wait_done`].
struct IdleGuard(Arc<Shared>);

impl Drop for IdleGuard {
    fn drop(&mut self) {
        self.0.state.store(RunState::Idle);
        self.0.idle.notify_waiters();
    }
}

/// What a started session drives.
enum Target {
    Injected(Arc<dyn Connection>),
    Dial(ServerAddress),
}

/// A persistent session with the device-control server.
///
/// `Session` is a cheap handle: clones share the same session, so one
/// task can run it while others observe or close it.
///
/// ## Lifecycle
///
/// ```text
/// build() ──→ start(key) ──→ [Active ⇄ Connected] ──close()──→ [Idle]
///                ↑                                               │
///                └──────────────────── reset() ─────────────────┘
/// ```
///
/// `start` returns as soon as the background task is spawned. With a
/// server address the task dials, runs the protocol loop, and redials
/// with backoff until closed. With an injected connection it runs one
/// protocol loop and goes idle.
#[derive(Clone)]
pub struct Session {
    shared: Arc<Shared>,
}

impl Session {
    /// Shorthand for [`SessionBuilder::new`].
    pub fn builder() -> SessionBuilder {
        SessionBuilder::new()
    }

    pub(crate) fn new(
        config: SessionConfig,
        conn: Option<Arc<dyn Connection>>,
        log_level: LevelFilter,
        callbacks: Callbacks,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                state: AtomicRunState::default(),
                cancel: Mutex::new(CancellationToken::new()),
                conn: Mutex::new(conn),
                callbacks,
                log_level,
                codec: WireCodec::default(),
                idle: Notify::new(),
            }),
        }
    }

    /// Starts the session in the background with the shared `key`.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    /// - [`SessionError::InvalidArgument`]: `key` is empty, or there's
    ///   neither a server address nor an injected connection
    /// - [`SessionError::NoRuntime`]: called outside a Tokio runtime
    /// - [`SessionError::AlreadyRunning`]: the session isn't idle
    pub fn start(&self, key: &str) -> Result<(), SessionError> {
        if key.is_empty() {
            return Err(SessionError::InvalidArgument("key must not be empty"));
        }

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| SessionError::NoRuntime)?;

        let cancel_slot = self.shared.cancel.lock();

        let injected = self.shared.conn.lock().clone();
        let target = match (injected, self.shared.config.server.clone()) {
            (Some(conn), _) => Target::Injected(conn),
            (None, Some(server)) => Target::Dial(server),
            (None, None) => {
                return Err(SessionError::InvalidArgument(
                    "no server address or connection configured",
                ));
            }
        };

        self.shared.state.begin()?;
        let cancel = cancel_slot.clone();
        drop(cancel_slot);

        let guard = IdleGuard(Arc::clone(&self.shared));
        let key = key.to_string();

        match target {
            Target::Injected(conn) => {
                runtime.spawn(async move {
                    let shared = &guard.0;
                    if let Err(e) = protocol::run(shared, conn.as_ref(), &key).await {
                        log_event!(shared, WARN, conn_id = %conn.id(), error = %e, "connection ended");
                    }
                    shared.conn.lock().take();
                    drop(guard);
                });
            }
            Target::Dial(server) => {
                runtime.spawn(async move {
                    connector::run(&guard.0, &server, &key, &cancel).await;
                    drop(guard);
                });
            }
        }

        Ok(())
    }

    /// Stops the session.
    ///
    /// Fires the cancellation signal and force-closes the live
    /// connection, which unblocks a pending read. Returns without waiting
    /// for the background task; use [`wait_done`](Self::wait_done) for
    /// that. Calling it again, or on an idle session, does nothing.
    pub fn close(&self) {
        if !self.is_running() {
            return;
        }

        self.shared.cancel.lock().cancel();

        let conn = self.shared.conn.lock().take();
        if let Some(conn) = conn.filter(|c| !c.is_closed()) {
            log_event!(self.shared, DEBUG, conn_id = %conn.id(), "closing live connection");
            conn.close();
        }
    }

    /// Waits until the session is idle.
    ///
    /// Returns `true` once idle, or `false` if `timeout` elapsed first.
    /// Waiting doesn't cancel anything.
    pub async fn wait_done(&self, timeout: Option<Duration>) -> bool {
        let idle = async {
            loop {
                // Register before checking, so a transition in between
                // isn't missed.
                let notified = self.shared.idle.notified();
                if !self.is_running() {
                    return;
                }
                notified.await;
            }
        };

        match timeout {
            Some(timeout) => tokio::time::timeout(timeout, idle).await.is_ok(),
            None => {
                idle.await;
                true
            }
        }
    }

    /// Re-arms the session after a [`close`](Self::close) so it can be
    /// started again. Clears any stored connection. Does nothing unless
    /// idle.
    pub fn reset(&self) {
        let mut cancel = self.shared.cancel.lock();
        if self.is_running() {
            return;
        }
        *cancel = CancellationToken::new();
        self.shared.conn.lock().take();
    }

    /// `true` from a successful `start` until the session is idle again.
    pub fn is_running(&self) -> bool {
        self.state().is_running()
    }

    /// `true` while a protocol loop is running on a live connection.
    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    pub fn state(&self) -> RunState {
        self.shared.state.load()
    }

    /// The validated configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.shared.config
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state())
            .field("config", &self.shared.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
impl Session {
    pub(crate) fn shared(&self) -> &Arc<Shared> {
        &self.shared
    }
}
