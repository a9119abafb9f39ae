//! Integration tests for the socket transports.
//!
//! These spin up real listeners on `127.0.0.1:0` and dial them through
//! the public `resolve` + `connect` path a session uses.

use std::sync::Arc;
use std::time::Duration;

use blinker_transport::{Connection, Network, TransportError, connect, resolve};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, UdpSocket};

#[tokio::test]
async fn test_tcp_connect_send_and_receive() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();

    let server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 64];
        let n = stream.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"hello from client");
        stream.write_all(b"ok").await.unwrap();
        // Keep the socket open until the client has read the reply.
        tokio::time::sleep(Duration::from_millis(50)).await;
    });

    let resolved = resolve(Network::Tcp, &addr).await.expect("should resolve");
    let conn = connect(Network::Tcp, resolved).await.expect("should dial");
    assert!(conn.peer().starts_with("tcp://127.0.0.1:"));

    conn.send(b"hello from client").await.expect("send should succeed");

    let mut buf = [0u8; 64];
    let n = conn.recv(&mut buf).await.expect("recv should succeed");
    assert_eq!(&buf[..n], b"ok");

    server.await.unwrap();
}

#[tokio::test]
async fn test_tcp_recv_reports_peer_close() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        drop(stream);
    });

    let conn = connect(Network::Tcp4, addr).await.expect("should dial");
    server.await.unwrap();

    let mut buf = [0u8; 16];
    let err = conn.recv(&mut buf).await.expect_err("peer closed");
    assert!(matches!(err, TransportError::ConnectionClosed(_)));
}

#[tokio::test]
async fn test_tcp_close_unblocks_pending_recv() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        // Hold the stream open without writing.
        tokio::time::sleep(Duration::from_secs(2)).await;
        drop(stream);
    });

    let conn: Arc<dyn Connection> = connect(Network::Tcp, addr).await.unwrap();
    let reader = Arc::clone(&conn);
    let pending = tokio::spawn(async move {
        let mut buf = [0u8; 16];
        reader.recv(&mut buf).await
    });

    tokio::time::sleep(Duration::from_millis(20)).await;
    conn.close();

    let result = tokio::time::timeout(Duration::from_secs(1), pending)
        .await
        .expect("close must unblock recv promptly")
        .unwrap();
    assert!(matches!(result, Err(TransportError::Closed)));
    assert!(matches!(conn.send(b"x").await, Err(TransportError::Closed)));

    server.abort();
}

#[tokio::test]
async fn test_tcp_connect_refused_returns_dial_error() {
    // Bind then drop to get a port with nothing listening.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = connect(Network::Tcp, addr).await.err().expect("nothing listening");
    assert!(matches!(err, TransportError::Dial(_)));
}

#[tokio::test]
async fn test_udp_datagram_round_trip() {
    let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = server.local_addr().unwrap();

    let conn = connect(Network::Udp, addr).await.expect("udp connect");
    conn.send(b"ping").await.unwrap();

    let mut buf = [0u8; 32];
    let (n, from) = server.recv_from(&mut buf).await.unwrap();
    assert_eq!(&buf[..n], b"ping");
    server.send_to(b"pong", from).await.unwrap();

    let n = conn.recv(&mut buf).await.unwrap();
    assert_eq!(&buf[..n], b"pong");
    assert!(conn.peer().starts_with("udp://"));
}
