use fleet_pipeline::{DeviceLookup, StateReconciler, TelemetryPipeline};
use fleet_protocol::{TcpServer, TcpServerConfig};
use fleet_storage::{HistoryQuery, InMemoryFleetStore, TrackingReader};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

struct Harness {
    store: Arc<InMemoryFleetStore>,
    addr: SocketAddr,
    stop: oneshot::Sender<()>,
    task: JoinHandle<Result<(), fleet_protocol::ProtocolError>>,
}

async fn start() -> Harness {
    let store = Arc::new(InMemoryFleetStore::new());
    store.register_vehicle("AB123", Some("ABC-1234")).expect("register");
    let pipeline = Arc::new(TelemetryPipeline::new(
        DeviceLookup::new(store.clone()),
        StateReconciler::new(store.clone()),
    ));

    let server = TcpServer::bind(TcpServerConfig {
        listen_addr: "127.0.0.1:0".to_string(),
        shutdown_grace_secs: 2,
        ..TcpServerConfig::default()
    })
    .await
    .expect("bind");
    let addr = server.local_addr().expect("addr");
    let (stop, stop_rx) = oneshot::channel::<()>();
    let task = tokio::spawn(server.run(pipeline, async move {
        let _ = stop_rx.await;
    }));
    Harness {
        store,
        addr,
        stop,
        task,
    }
}

impl Harness {
    async fn stop(self) -> Arc<InMemoryFleetStore> {
        self.stop.send(()).expect("stop");
        tokio::time::timeout(Duration::from_secs(5), self.task)
            .await
            .expect("listener stops")
            .expect("join")
            .expect("run");
        self.store
    }
}

async fn connect(addr: SocketAddr) -> (tokio::io::Lines<BufReader<OwnedReadHalf>>, OwnedWriteHalf) {
    let stream = TcpStream::connect(addr).await.expect("connect");
    let (read_half, write_half) = stream.into_split();
    (BufReader::new(read_half).lines(), write_half)
}

async fn next_ack(lines: &mut tokio::io::Lines<BufReader<OwnedReadHalf>>) -> String {
    lines
        .next_line()
        .await
        .expect("read")
        .expect("ack line")
}

#[tokio::test]
async fn packet_split_across_writes_is_acked_once() {
    let harness = start().await;
    let (mut lines, mut writer) = connect(harness.addr).await;

    writer.write_all(b"AB123,10.3").await.expect("write");
    writer.flush().await.expect("flush");
    tokio::time::sleep(Duration::from_millis(50)).await;
    writer.write_all(b"1,123.88,42.5,87\n").await.expect("write");
    assert_eq!(next_ack(&mut lines).await, "ACK");

    drop(writer);
    let store = harness.stop().await;
    let live = store.list_live_positions().await.expect("live");
    assert_eq!(live.len(), 1);
    assert_eq!(live[0].latitude, Some(10.31));
    assert_eq!(live[0].battery_level, Some(87.0));
}

#[tokio::test]
async fn mixed_stream_gets_one_ack_per_packet_in_order() {
    let harness = start().await;
    let (mut lines, mut writer) = connect(harness.addr).await;

    writer
        .write_all(b"AB123,1.0,2.0,10,50\r\n\nAB123\nZZ999,10.31,123.88,5\nAB123,3.0,4.0,20,49\n")
        .await
        .expect("write");
    assert_eq!(next_ack(&mut lines).await, "ACK");
    assert_eq!(next_ack(&mut lines).await, "ERROR");
    assert_eq!(next_ack(&mut lines).await, "ERROR_UNREGISTERED");
    assert_eq!(next_ack(&mut lines).await, "ACK");

    drop(writer);
    let store = harness.stop().await;
    let vehicle_id = store.list_live_positions().await.expect("live")[0].vehicle_id;
    let history = store
        .vehicle_history(vehicle_id, HistoryQuery::default())
        .await
        .expect("history");
    let latitudes: Vec<f64> = history.iter().map(|entry| entry.latitude).collect();
    assert_eq!(latitudes, vec![1.0, 3.0]);

    let state = store
        .find_vehicle_state(vehicle_id)
        .await
        .expect("state")
        .expect("vehicle");
    assert_eq!(state.latitude, Some(3.0));
    assert_eq!(state.battery_level, Some(49.0));
}

#[tokio::test]
async fn replaying_a_stream_keeps_final_state_and_grows_history() {
    let harness = start().await;
    let stream = b"AB123,1.0,2.0,10,50\nAB123,3.0,4.0,20,49\n";

    for _ in 0..2 {
        let (mut lines, mut writer) = connect(harness.addr).await;
        writer.write_all(stream).await.expect("write");
        assert_eq!(next_ack(&mut lines).await, "ACK");
        assert_eq!(next_ack(&mut lines).await, "ACK");
    }

    let store = harness.stop().await;
    assert_eq!(store.history_len(), 4);
    let vehicle_id = store.list_live_positions().await.expect("live")[0].vehicle_id;
    let state = store
        .find_vehicle_state(vehicle_id)
        .await
        .expect("state")
        .expect("vehicle");
    assert_eq!(state.latitude, Some(3.0));
    assert_eq!(state.longitude, Some(4.0));
    assert_eq!(state.speed, Some(20.0));
}

#[tokio::test]
async fn concurrent_connections_for_one_vehicle_stay_consistent() {
    let harness = start().await;
    let per_connection: u32 = 25;

    let mut clients = Vec::new();
    for offset in [0.0_f64, 50.0] {
        let addr = harness.addr;
        clients.push(tokio::spawn(async move {
            let (mut lines, mut writer) = connect(addr).await;
            let mut acked: u32 = 0;
            for i in 0..per_connection {
                let step = f64::from(i);
                let packet = format!("AB123,{},{},{i},80\n", offset + step, 100.0 + step);
                writer.write_all(packet.as_bytes()).await.expect("write");
                if next_ack(&mut lines).await == "ACK" {
                    acked += 1;
                }
            }
            acked
        }));
    }
    let mut acked = 0;
    for client in clients {
        acked += client.await.expect("client");
    }
    assert_eq!(acked, 2 * per_connection);

    let store = harness.stop().await;
    let vehicle_id = store.list_live_positions().await.expect("live")[0].vehicle_id;
    let history = store
        .vehicle_history(vehicle_id, HistoryQuery::default())
        .await
        .expect("history");
    assert_eq!(history.len(), acked as usize);

    // 状态必须等于最后写入的那条轨迹
    let last = history
        .iter()
        .max_by_key(|entry| entry.id)
        .expect("last entry");
    let state = store
        .find_vehicle_state(vehicle_id)
        .await
        .expect("state")
        .expect("vehicle");
    assert_eq!(state.latitude, Some(last.latitude));
    assert_eq!(state.longitude, Some(last.longitude));
    assert_eq!(state.speed, Some(last.speed));
    assert_eq!(state.updated_at_ms, Some(last.created_at_ms));
}
