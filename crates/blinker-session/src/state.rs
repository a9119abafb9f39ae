//! The session's run-state word.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

use crate::SessionError;

/// Coarse lifecycle state of a session.
///
/// ```text
///   Idle ──start()──→ Active ⇄ Connected
///    ↑                  │
///    └──(cancelled / injected connection done)
/// ```
///
/// - **Idle**: nothing running; `start` may be called.
/// - **Active**: the background task is running but no protocol loop is
///   (dialing, backing off, or between connections).
/// - **Connected**: a protocol loop is driving a live connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RunState {
    Idle = 0,
    Active = 1,
    Connected = 2,
}

impl RunState {
    /// Any state other than `Idle`.
    pub fn is_running(self) -> bool {
        !matches!(self, Self::Idle)
    }

    pub fn is_connected(self) -> bool {
        matches!(self, Self::Connected)
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Idle,
            1 => Self::Active,
            _ => Self::Connected,
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Active => write!(f, "Active"),
            Self::Connected => write!(f, "Connected"),
        }
    }
}

/// A [`RunState`] stored in a single atomic word, readable from any
/// thread without locking.
#[derive(Debug, Default)]
pub(crate) struct AtomicRunState(AtomicU8);

impl AtomicRunState {
    pub(crate) fn load(&self) -> RunState {
        RunState::from_u8(self.0.load(Ordering::Acquire))
    }

    pub(crate) fn store(&self, state: RunState) {
        self.0.store(state as u8, Ordering::Release);
    }

    /// Moves `Idle → Active`. At most one caller can win.
    pub(crate) fn begin(&self) -> Result<(), SessionError> {
        self.0
            .compare_exchange(
                RunState::Idle as u8,
                RunState::Active as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map(|_| ())
            .map_err(|_| SessionError::AlreadyRunning)
    }
}
