//! The per-connection protocol loop.
//!
//! One loop drives one connection: it sends heartbeats and periodic
//! status reports on schedule, reads with a deadline that never runs
//! past the next heartbeat, and applies `powerset` commands. It returns
//! only with an error: a hard read failure (including the connection
//! being closed under it) or the liveness limit.

use std::time::Duration;

use blinker_protocol::{Action, Codec, Frame, PowerSetPayload, ProtocolError, UpdatePayload, is_ack};
use blinker_transport::Connection;
use tokio::time::{Instant, timeout_at};

use crate::session::Shared;
use crate::{RunState, SessionError};

/// Longest the loop tolerates without receiving anything.
pub(crate) const LIVENESS_LIMIT: Duration = Duration::from_secs(5 * 60);

/// How often an unsolicited status report is sent.
pub(crate) const UPDATE_INTERVAL: Duration = Duration::from_secs(2 * 60);

/// Heartbeats go out this long before the configured timeout.
pub(crate) const HEARTBEAT_MARGIN: Duration = Duration::from_secs(5);

const READ_BUFFER: usize = 1024;

/// Time between heartbeats for a configured timeout.
pub(crate) fn heartbeat_interval(timeout: Duration) -> Duration {
    timeout
        .saturating_sub(HEARTBEAT_MARGIN)
        .max(Duration::from_secs(1))
}

/// Timestamps the loop schedules from. `None` means "never", which makes
/// the first heartbeat and the first update due on entry.
#[derive(Debug)]
struct Schedule {
    heartbeat_every: Duration,
    last_recv: Instant,
    last_heartbeat: Option<Instant>,
    last_update: Option<Instant>,
}

impl Schedule {
    fn new(now: Instant, heartbeat_every: Duration) -> Self {
        Self {
            heartbeat_every,
            last_recv: now,
            last_heartbeat: None,
            last_update: None,
        }
    }

    fn liveness_expired(&self, now: Instant) -> bool {
        now.duration_since(self.last_recv) >= LIVENESS_LIMIT
    }

    fn heartbeat_due(&self, now: Instant) -> bool {
        self.last_heartbeat
            .is_none_or(|t| now.duration_since(t) >= self.heartbeat_every)
    }

    fn update_due(&self, now: Instant) -> bool {
        self.last_update
            .is_none_or(|t| now.duration_since(t) >= UPDATE_INTERVAL)
    }

    /// When the pending read gives up: the next heartbeat, or the
    /// liveness limit if that comes first.
    fn read_deadline(&self, now: Instant) -> Instant {
        let next_heartbeat = self.last_heartbeat.unwrap_or(now) + self.heartbeat_every;
        next_heartbeat.min(self.last_recv + LIVENESS_LIMIT)
    }
}

/// Marks the session connected for as long as the loop runs.
///
/// On the way out, however the loop ends, the connection is closed and
/// the session drops back to `Active`.
struct ConnectedGuard<'a> {
    shared: &'a Shared,
    conn: &'a dyn Connection,
}

impl<'a> ConnectedGuard<'a> {
    fn enter(shared: &'a Shared, conn: &'a dyn Connection) -> Self {
        shared.state.store(RunState::Connected);
        Self { shared, conn }
    }
}

impl Drop for ConnectedGuard<'_> {
    fn drop(&mut self) {
        // `Session::close` may already have closed it.
        if !self.conn.is_closed() {
            self.conn.close();
        }
        self.shared.state.store(RunState::Active);
    }
}

/// Runs the protocol on `conn` until it fails.
///
/// Write failures and bad inbound frames are logged and skipped; only
/// a failed read or the liveness limit end the loop.
pub(crate) async fn run(
    shared: &Shared,
    conn: &dyn Connection,
    key: &str,
) -> Result<(), SessionError> {
    let keepalive = shared.codec.encode(&Frame::keepalive(key))?;
    let _connected = ConnectedGuard::enter(shared, conn);

    let mut schedule = Schedule::new(
        Instant::now(),
        heartbeat_interval(shared.config.timeout),
    );
    let mut buf = [0u8; READ_BUFFER];

    loop {
        let now = Instant::now();

        if schedule.liveness_expired(now) {
            return Err(SessionError::TimedOut(LIVENESS_LIMIT));
        }

        if schedule.heartbeat_due(now) {
            if let Err(e) = conn.send(&keepalive).await {
                log_event!(shared, WARN, conn_id = %conn.id(), error = %e, "failed to send heartbeat");
            }
            schedule.last_heartbeat = Some(now);
        }

        if schedule.update_due(now) && send_update(shared, conn, key, 0).await {
            schedule.last_update = Some(now);
        }

        let n = match timeout_at(schedule.read_deadline(now), conn.recv(&mut buf)).await {
            Err(_elapsed) => continue,
            Ok(Err(e)) => return Err(e.into()),
            Ok(Ok(n)) => n,
        };
        schedule.last_recv = Instant::now();

        let data = &buf[..n];
        log_event!(shared, INFO, conn_id = %conn.id(), len = n, data = %String::from_utf8_lossy(data), "recv");

        match decode_command(&shared.codec, key, data) {
            Ok(None) => {}
            Ok(Some(cmd)) => {
                log_event!(shared, DEBUG, value = cmd.value, confirm_id = cmd.confirm_id, "powerset");
                shared.callbacks.power_set(cmd.value);
                if send_update(shared, conn, key, cmd.confirm_id).await {
                    schedule.last_update = Some(Instant::now());
                }
            }
            Err(e) => {
                log_event!(shared, WARN, conn_id = %conn.id(), error = %e, "dropping inbound frame");
            }
        }
    }
}

/// Sends a status report. Returns whether it went out; failures are
/// logged here.
async fn send_update(shared: &Shared, conn: &dyn Connection, key: &str, confirm_id: i64) -> bool {
    let payload = UpdatePayload {
        status: shared.callbacks.status(),
        confirm_id,
    };
    let result = match shared.codec.encode(&Frame::update(key, payload)) {
        Ok(bytes) => conn.send(&bytes).await.map_err(SessionError::from),
        Err(e) => Err(e.into()),
    };
    match result {
        Ok(()) => true,
        Err(e) => {
            log_event!(shared, WARN, conn_id = %conn.id(), confirm_id, error = %e, "failed to send update");
            false
        }
    }
}

/// Interprets one inbound message.
///
/// `Ok(None)` is a bare acknowledgment. Anything that isn't a well-formed
/// `powerset` for `key` is an error describing why it was dropped.
fn decode_command<C: Codec>(
    codec: &C,
    key: &str,
    data: &[u8],
) -> Result<Option<PowerSetPayload>, ProtocolError> {
    if is_ack(data) {
        return Ok(None);
    }

    let frame: Frame = codec.decode(data)?;
    if frame.key != key {
        return Err(ProtocolError::InvalidMessage("key mismatch".into()));
    }

    match frame.action {
        Action::PowerSet => frame
            .payload_as::<PowerSetPayload>()
            .map(Some)
            .map_err(|e| ProtocolError::InvalidMessage(format!("bad powerset payload: {e}"))),
        other => Err(ProtocolError::InvalidMessage(format!(
            "unsupported action `{other}`"
        ))),
    }
}
