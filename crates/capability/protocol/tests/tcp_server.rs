use async_trait::async_trait;
use fleet_protocol::{Ack, PacketHandler, TcpServer, TcpServerConfig};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::oneshot;

#[derive(Default)]
struct CountingHandler {
    handled: AtomicUsize,
}

#[async_trait]
impl PacketHandler for CountingHandler {
    async fn handle(&self, _packet: &[u8]) -> Ack {
        self.handled.fetch_add(1, Ordering::SeqCst);
        Ack::Ok
    }
}

fn config(max_connections: usize) -> TcpServerConfig {
    TcpServerConfig {
        listen_addr: "127.0.0.1:0".to_string(),
        max_connections,
        shutdown_grace_secs: 2,
        ..TcpServerConfig::default()
    }
}

#[tokio::test]
async fn connections_beyond_capacity_are_closed() {
    let server = TcpServer::bind(config(1)).await.expect("bind");
    let addr = server.local_addr().expect("addr");
    let handler = Arc::new(CountingHandler::default());
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let task = tokio::spawn(server.run(handler.clone(), async move {
        let _ = stop_rx.await;
    }));

    let first = TcpStream::connect(addr).await.expect("connect");
    let (read_half, mut write_half) = first.into_split();
    let mut lines = BufReader::new(read_half).lines();
    write_half.write_all(b"AB123,1,2\n").await.expect("write");
    assert_eq!(lines.next_line().await.expect("read").as_deref(), Some("ACK"));

    let mut second = TcpStream::connect(addr).await.expect("connect");
    let mut buf = [0u8; 16];
    let read = tokio::time::timeout(Duration::from_secs(2), second.read(&mut buf))
        .await
        .expect("rejected connection is closed promptly");
    assert!(matches!(read, Ok(0) | Err(_)));

    // 已建立的连接不受影响
    write_half.write_all(b"AB123,3,4\n").await.expect("write");
    assert_eq!(lines.next_line().await.expect("read").as_deref(), Some("ACK"));
    assert_eq!(handler.handled.load(Ordering::SeqCst), 2);

    stop_tx.send(()).expect("stop");
    task.await.expect("join").expect("run");
}

#[tokio::test]
async fn shutdown_closes_open_connections() {
    let server = TcpServer::bind(config(8)).await.expect("bind");
    let addr = server.local_addr().expect("addr");
    let handler = Arc::new(CountingHandler::default());
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let task = tokio::spawn(server.run(handler, async move {
        let _ = stop_rx.await;
    }));

    let mut client = TcpStream::connect(addr).await.expect("connect");
    client.write_all(b"AB123,1,2\n").await.expect("write");
    let mut ack = [0u8; 4];
    client.read_exact(&mut ack).await.expect("ack");
    assert_eq!(&ack, b"ACK\n");

    stop_tx.send(()).expect("stop");
    tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("listener stops within grace")
        .expect("join")
        .expect("run");

    let mut rest = Vec::new();
    let read = client.read_to_end(&mut rest).await;
    assert!(matches!(read, Ok(0) | Err(_)));
    assert!(TcpStream::connect(addr).await.is_err());
}
