//! The connector: dial, serve, back off, repeat until cancelled.

use std::sync::Arc;

use blinker_transport::{self as transport, Connection, TransportError};
use tokio_util::sync::CancellationToken;

use crate::backoff::Backoff;
use crate::session::Shared;
use crate::{ServerAddress, protocol};

/// Outcome of one resolve + dial attempt.
enum Attempt {
    Connected(Arc<dyn Connection>),
    ResolveFailed(TransportError),
    DialFailed(TransportError),
}

/// Keeps a connection to `server` alive until `cancel` fires.
///
/// Each iteration resolves the address afresh, dials, and hands a live
/// connection to the protocol loop. Per-connection errors end up here,
/// get logged, and lead to another attempt after the backoff delay.
pub(crate) async fn run(
    shared: &Shared,
    server: &ServerAddress,
    key: &str,
    cancel: &CancellationToken,
) {
    let mut backoff = Backoff::new();

    loop {
        let attempt = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            attempt = dial(server) => attempt,
        };

        let connected = match attempt {
            Attempt::Connected(conn) => {
                backoff.reset();
                serve(shared, conn, key, cancel).await;
                true
            }
            Attempt::ResolveFailed(e) => {
                log_event!(
                    shared, WARN,
                    network = %server.network, address = %server.address, error = %e,
                    "resolve failed"
                );
                shared
                    .callbacks
                    .resolve_failed(server.network, &server.address);
                false
            }
            Attempt::DialFailed(e) => {
                log_event!(
                    shared, WARN,
                    network = %server.network, address = %server.address, error = %e,
                    "dial failed"
                );
                false
            }
        };

        if cancel.is_cancelled() {
            break;
        }

        let delay = if connected { backoff.delay() } else { backoff.fail() };
        log_event!(
            shared, DEBUG,
            failures = backoff.failures(), delay = ?delay,
            "waiting before reconnect"
        );

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(delay) => {}
        }
    }

    log_event!(shared, DEBUG, network = %server.network, address = %server.address, "connector stopped");
}

async fn dial(server: &ServerAddress) -> Attempt {
    let addr = match transport::resolve(server.network, &server.address).await {
        Ok(addr) => addr,
        Err(e) => return Attempt::ResolveFailed(e),
    };
    match transport::connect(server.network, addr).await {
        Ok(conn) => Attempt::Connected(conn),
        Err(e) => Attempt::DialFailed(e),
    }
}

/// Publishes `conn` so `close` can reach it, runs the protocol loop,
/// then withdraws it.
async fn serve(
    shared: &Shared,
    conn: Arc<dyn Connection>,
    key: &str,
    cancel: &CancellationToken,
) {
    {
        let mut slot = shared.conn.lock();
        // `close` fires the token before taking the slot, so checking
        // under the lock catches a close that raced the dial.
        if cancel.is_cancelled() {
            conn.close();
            return;
        }
        *slot = Some(Arc::clone(&conn));
    }

    log_event!(shared, INFO, conn_id = %conn.id(), peer = %conn.peer(), "connected");

    if let Err(e) = protocol::run(shared, conn.as_ref(), key).await {
        log_event!(shared, WARN, conn_id = %conn.id(), error = %e, "connection ended");
    }

    shared.conn.lock().take();
}
