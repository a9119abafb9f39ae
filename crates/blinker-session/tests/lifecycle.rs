//! Start / close / wait / reset behavior of a session.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::time::Duration;

use async_trait::async_trait;
use blinker_session::{RunState, Session, SessionBuilder, SessionError};
use blinker_transport::{Connection, ConnectionId, MemoryConnection, TransportError};

/// An address nothing listens on, so the connector keeps retrying.
const UNREACHABLE: &str = "127.0.0.1:1";

async fn wait_until(mut cond: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

/// Counts how often the session closes the underlying connection.
struct CountingConnection {
    inner: MemoryConnection,
    closes: AtomicUsize,
}

#[async_trait]
impl Connection for CountingConnection {
    async fn send(&self, data: &[u8]) -> Result<(), TransportError> {
        self.inner.send(data).await
    }

    async fn recv(&self, buf: &mut [u8]) -> Result<usize, TransportError> {
        self.inner.recv(buf).await
    }

    fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
        self.inner.close();
    }

    fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }

    fn id(&self) -> ConnectionId {
        self.inner.id()
    }

    fn peer(&self) -> String {
        self.inner.peer()
    }
}

fn injected() -> (Session, MemoryConnection) {
    let (local, remote) = MemoryConnection::pair();
    let session = SessionBuilder::new().connection(Arc::new(local)).build();
    (session, remote)
}

#[tokio::test]
async fn test_start_empty_key_is_invalid_argument() {
    let (session, _remote) = injected();
    let err = session.start("").unwrap_err();
    assert!(matches!(err, SessionError::InvalidArgument(_)));
    assert_eq!(session.state(), RunState::Idle);
}

#[tokio::test]
async fn test_start_without_target_is_invalid_argument() {
    let session = SessionBuilder::new().build();
    let err = session.start("key").unwrap_err();
    assert!(matches!(err, SessionError::InvalidArgument(_)));
    assert!(!session.is_running());
}

#[test]
fn test_start_outside_runtime_is_no_runtime() {
    let session = SessionBuilder::new()
        .server_address("tcp", UNREACHABLE)
        .build();
    let err = session.start("key").unwrap_err();
    assert!(matches!(err, SessionError::NoRuntime));
    assert_eq!(session.state(), RunState::Idle);
}

#[tokio::test]
async fn test_start_twice_is_already_running() {
    let session = SessionBuilder::new()
        .server_address("tcp", UNREACHABLE)
        .build();

    session.start("key").unwrap();
    assert!(session.is_running());
    assert!(matches!(
        session.start("key"),
        Err(SessionError::AlreadyRunning)
    ));

    session.close();
    assert!(session.wait_done(Some(Duration::from_secs(5))).await);
    assert_eq!(session.state(), RunState::Idle);
}

#[tokio::test]
async fn test_close_on_idle_session_is_noop() {
    let session = SessionBuilder::new()
        .server_address("tcp", UNREACHABLE)
        .build();
    session.close();
    session.close();
    assert!(session.wait_done(Some(Duration::from_millis(10))).await);
}

#[tokio::test]
async fn test_close_concurrently_from_many_tasks() {
    let (local, remote) = MemoryConnection::pair();
    let conn = Arc::new(CountingConnection {
        inner: local,
        closes: AtomicUsize::new(0),
    });
    let session = SessionBuilder::new()
        .connection(Arc::clone(&conn) as Arc<dyn Connection>)
        .build();
    session.start("key").unwrap();
    wait_until(|| session.is_connected()).await;

    let closers: Vec<_> = (0..8)
        .map(|_| {
            let s = session.clone();
            tokio::spawn(async move { s.close() })
        })
        .collect();
    for closer in closers {
        closer.await.unwrap();
    }

    assert!(session.wait_done(Some(Duration::from_secs(5))).await);
    assert!(!session.is_running());
    assert!(conn.is_closed());
    assert_eq!(conn.closes.load(Ordering::SeqCst), 1);
    drop(remote);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_reset_racing_start_never_orphans_the_run() {
    for round in 0..200 {
        let session = SessionBuilder::new()
            .server_address("tcp", UNREACHABLE)
            .build();
        let barrier = Arc::new(Barrier::new(2));

        let (s, b) = (session.clone(), Arc::clone(&barrier));
        let resetter = tokio::task::spawn_blocking(move || {
            b.wait();
            s.reset();
        });
        let (s, b) = (session.clone(), Arc::clone(&barrier));
        let starter = tokio::task::spawn_blocking(move || {
            b.wait();
            s.start("key")
        });

        resetter.await.unwrap();
        starter.await.unwrap().unwrap();

        // Whatever the interleaving, close must reach the running task.
        session.close();
        assert!(
            session.wait_done(Some(Duration::from_secs(5))).await,
            "round {round}: session kept running after close"
        );
    }
}

#[tokio::test]
async fn test_wait_done_times_out_while_running() {
    let session = SessionBuilder::new()
        .server_address("tcp", UNREACHABLE)
        .build();
    session.start("key").unwrap();

    assert!(!session.wait_done(Some(Duration::from_millis(50))).await);
    assert!(session.is_running());

    session.close();
    assert!(session.wait_done(None).await);
}

#[tokio::test]
async fn test_reset_while_running_is_noop() {
    let session = SessionBuilder::new()
        .server_address("tcp", UNREACHABLE)
        .build();
    session.start("key").unwrap();

    session.reset();
    assert!(session.is_running());

    session.close();
    assert!(session.wait_done(Some(Duration::from_secs(5))).await);
}

#[tokio::test]
async fn test_start_after_close_without_reset_stops_immediately() {
    let session = SessionBuilder::new()
        .server_address("tcp", UNREACHABLE)
        .build();
    session.start("key").unwrap();
    session.close();
    assert!(session.wait_done(Some(Duration::from_secs(5))).await);

    // The cancellation signal is still fired, so the new run ends at
    // once.
    session.start("key").unwrap();
    assert!(session.wait_done(Some(Duration::from_secs(5))).await);
}

#[tokio::test]
async fn test_reset_after_close_allows_restart() {
    let session = SessionBuilder::new()
        .server_address("tcp", UNREACHABLE)
        .build();
    session.start("key").unwrap();
    session.close();
    assert!(session.wait_done(Some(Duration::from_secs(5))).await);

    session.reset();
    session.start("key").unwrap();
    assert!(!session.wait_done(Some(Duration::from_millis(100))).await);
    assert!(session.is_running());

    session.close();
    assert!(session.wait_done(Some(Duration::from_secs(5))).await);
}

#[tokio::test]
async fn test_is_connected_follows_protocol_loop() {
    let (session, remote) = injected();
    assert!(!session.is_connected());

    session.start("key").unwrap();
    wait_until(|| session.is_connected()).await;
    assert_eq!(session.state(), RunState::Connected);

    // The peer going away ends the loop; an injected connection isn't
    // redialed, so the session goes all the way back to idle.
    remote.close();
    assert!(session.wait_done(Some(Duration::from_secs(5))).await);
    assert!(!session.is_connected());
    assert_eq!(session.state(), RunState::Idle);
}

#[tokio::test]
async fn test_injected_connection_is_consumed() {
    let (session, remote) = injected();
    session.start("key").unwrap();
    wait_until(|| session.is_connected()).await;

    session.close();
    assert!(session.wait_done(Some(Duration::from_secs(5))).await);
    drop(remote);

    session.reset();
    assert!(matches!(
        session.start("key"),
        Err(SessionError::InvalidArgument(_))
    ));
}

#[tokio::test]
async fn test_close_closes_injected_connection() {
    let (local, remote) = MemoryConnection::pair();
    let local = Arc::new(local);
    let session = SessionBuilder::new()
        .connection(Arc::clone(&local) as Arc<dyn Connection>)
        .build();

    session.start("key").unwrap();
    wait_until(|| session.is_connected()).await;
    session.close();

    assert!(session.wait_done(Some(Duration::from_secs(5))).await);
    assert!(local.is_closed());
    drop(remote);
}
