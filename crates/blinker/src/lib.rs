//! # Blinker
//!
//! Persistent-connection client for a Blinker device-control server.
//!
//! A device holds one [`Session`] to the server: it authenticates every
//! frame with a shared key, keeps the connection alive with heartbeats,
//! reports its power state, and hands `powerset` commands from the server
//! to a callback. The session redials on its own, with backoff, until it
//! is closed.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicBool, Ordering};
//!
//! use blinker::prelude::*;
//!
//! # async fn run() -> Result<(), BlinkerError> {
//! let power = Arc::new(AtomicBool::new(false));
//! let (set, get) = (Arc::clone(&power), Arc::clone(&power));
//!
//! let session = Session::builder()
//!     .server_address("tcp", "device.example.com:8181")
//!     .on_power_set(move |on| set.store(on, Ordering::Relaxed))
//!     .on_update(move || get.load(Ordering::Relaxed))
//!     .build();
//!
//! session.start("shared-secret")?;
//! // ... later
//! session.close();
//! session.wait_done(None).await;
//! # Ok(())
//! # }
//! ```

mod error;
pub mod logging;

pub use error::BlinkerError;

pub use blinker_protocol as protocol;
pub use blinker_session as session;
pub use blinker_transport as transport;

pub mod prelude {
    pub use crate::BlinkerError;
    pub use blinker_protocol::{Frame, PowerSetPayload, UpdatePayload};
    pub use blinker_session::{
        RunState, ServerAddress, Session, SessionBuilder, SessionConfig, SessionError,
    };
    pub use blinker_transport::{Connection, MemoryConnection, Network};
}
