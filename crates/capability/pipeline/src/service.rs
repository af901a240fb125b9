//! 单条报文处理链路
//!
//! 解码 → 登记查询 → 状态归并，任一环节失败只影响当前报文。
//! 实现 `PacketHandler`，把结果折叠成设备可见的三种应答。

use crate::lookup::{DeviceLookup, Resolution};
use crate::reconciler::StateReconciler;
use async_trait::async_trait;
use fleet_protocol::{Ack, DecodeError, PacketHandler, decode};
use fleet_telemetry::{
    record_lookup_failure, record_packet_acked, record_packet_received,
    record_reconcile_latency_ms, record_rejected_invalid_coordinates, record_rejected_malformed,
    record_rejected_unsupported, record_storage_failure, record_unregistered,
};
use std::time::Instant;
use tracing::{debug, info, warn};

/// 采集流水线
#[derive(Clone)]
pub struct TelemetryPipeline {
    lookup: DeviceLookup,
    reconciler: StateReconciler,
}

impl TelemetryPipeline {
    pub fn new(lookup: DeviceLookup, reconciler: StateReconciler) -> Self {
        Self { lookup, reconciler }
    }
}

#[async_trait]
impl PacketHandler for TelemetryPipeline {
    async fn handle(&self, packet: &[u8]) -> Ack {
        record_packet_received();

        // 1. 解码
        let reading = match decode(packet) {
            Ok(reading) => reading,
            Err(err) => {
                match err {
                    DecodeError::Malformed => record_rejected_malformed(),
                    DecodeError::UnsupportedProtocol => record_rejected_unsupported(),
                    DecodeError::InvalidCoordinates => record_rejected_invalid_coordinates(),
                }
                warn!(
                    target: "fleet.ingest",
                    reason = err.reason(),
                    packet = %String::from_utf8_lossy(packet),
                    "packet_rejected"
                );
                return Ack::Error;
            }
        };
        debug!(
            target: "fleet.ingest",
            device_id = %reading.device_id,
            protocol = %reading.protocol_tag,
            "packet_decoded"
        );

        // 2. 登记查询
        let vehicle = match self.lookup.resolve(&reading.device_id).await {
            Ok(Resolution::Found(vehicle)) => vehicle,
            Ok(Resolution::NotFound) => {
                record_unregistered();
                warn!(target: "fleet.ingest", device_id = %reading.device_id, "device_unregistered");
                return Ack::Unregistered;
            }
            Err(err) => {
                record_lookup_failure();
                warn!(
                    target: "fleet.ingest",
                    device_id = %reading.device_id,
                    error = %err,
                    "device_lookup_failed"
                );
                return Ack::Error;
            }
        };

        // 3. 状态归并
        let started_at = Instant::now();
        match self.reconciler.reconcile(&vehicle, &reading).await {
            Ok(reconciled) => {
                record_reconcile_latency_ms(started_at.elapsed().as_millis() as u64);
                record_packet_acked();
                info!(
                    target: "fleet.ingest",
                    device_id = %reading.device_id,
                    vehicle_id = reconciled.vehicle.vehicle_id,
                    latitude = reading.latitude,
                    longitude = reading.longitude,
                    speed = reading.speed,
                    battery_level = ?reading.battery_level,
                    ingested_at_ms = reconciled.ingested_at_ms,
                    "reading_reconciled"
                );
                Ack::Ok
            }
            Err(err) => {
                record_storage_failure();
                warn!(
                    target: "fleet.ingest",
                    device_id = %reading.device_id,
                    vehicle_id = vehicle.vehicle_id,
                    error = %err,
                    "reconcile_failed"
                );
                Ack::Error
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconciler::Clock;
    use domain::VehicleStatus;
    use fleet_storage::{
        HistoryQuery, InMemoryFleetStore, StorageError, TelemetryStore, TelemetryWrite,
        TrackingReader,
    };
    use std::sync::Arc;
    use std::sync::atomic::{AtomicI64, Ordering};

    /// 每次调用前进 1ms 的时钟
    #[derive(Default)]
    struct TickingClock(AtomicI64);

    impl Clock for TickingClock {
        fn now_ms(&self) -> i64 {
            self.0.fetch_add(1, Ordering::SeqCst) + 1
        }
    }

    struct FailingStore;

    #[async_trait]
    impl TelemetryStore for FailingStore {
        async fn apply_reading(&self, _write: &TelemetryWrite) -> Result<(), StorageError> {
            Err(StorageError::new("deadlock detected"))
        }
    }

    fn pipeline_with(store: &Arc<InMemoryFleetStore>) -> TelemetryPipeline {
        TelemetryPipeline::new(
            DeviceLookup::new(store.clone()),
            StateReconciler::with_clock(store.clone(), Arc::new(TickingClock::default())),
        )
    }

    fn registered_store() -> (Arc<InMemoryFleetStore>, i64) {
        let store = Arc::new(InMemoryFleetStore::new());
        let vehicle = store.register_vehicle("AB123", Some("ABC-1234")).expect("register");
        (store, vehicle.vehicle_id)
    }

    #[tokio::test]
    async fn legacy_packet_updates_state_without_battery() {
        let (store, vehicle_id) = registered_store();
        let pipeline = pipeline_with(&store);

        assert_eq!(pipeline.handle(b"AB123,10.31,123.88").await, Ack::Ok);

        let state = store
            .find_vehicle_state(vehicle_id)
            .await
            .expect("state")
            .expect("vehicle");
        assert_eq!(state.latitude, Some(10.31));
        assert_eq!(state.longitude, Some(123.88));
        assert_eq!(state.speed, Some(0.0));
        assert_eq!(state.battery_level, None);
        assert_eq!(state.status, VehicleStatus::Online);
        assert_eq!(store.history_len(), 1);
    }

    #[tokio::test]
    async fn v2_packet_carries_speed_and_battery() {
        let (store, vehicle_id) = registered_store();
        let pipeline = pipeline_with(&store);

        assert_eq!(pipeline.handle(b"AB123,10.31,123.88,42.5,87").await, Ack::Ok);

        let state = store
            .find_vehicle_state(vehicle_id)
            .await
            .expect("state")
            .expect("vehicle");
        assert_eq!(state.speed, Some(42.5));
        assert_eq!(state.battery_level, Some(87.0));
    }

    #[tokio::test]
    async fn malformed_packet_writes_nothing() {
        let (store, vehicle_id) = registered_store();
        let pipeline = pipeline_with(&store);

        assert_eq!(pipeline.handle(b"AB123").await, Ack::Error);
        assert_eq!(pipeline.handle(b"$GPRMC").await, Ack::Error);
        assert_eq!(pipeline.handle(b"AB123,999,1").await, Ack::Error);

        assert_eq!(store.history_len(), 0);
        let state = store
            .find_vehicle_state(vehicle_id)
            .await
            .expect("state")
            .expect("vehicle");
        assert_eq!(state.status, VehicleStatus::Offline);
        assert_eq!(state.latitude, None);
    }

    #[tokio::test]
    async fn unregistered_device_is_never_reconciled() {
        let (store, _) = registered_store();
        let pipeline = pipeline_with(&store);

        assert_eq!(
            pipeline.handle(b"ZZ999,10.31,123.88,5").await,
            Ack::Unregistered
        );
        assert_eq!(store.history_len(), 0);
    }

    #[tokio::test]
    async fn back_to_back_packets_keep_arrival_order() {
        let (store, vehicle_id) = registered_store();
        let pipeline = pipeline_with(&store);

        assert_eq!(pipeline.handle(b"AB123,1.0,2.0,10,50").await, Ack::Ok);
        assert_eq!(pipeline.handle(b"AB123,3.0,4.0,20,49").await, Ack::Ok);

        let history = store
            .vehicle_history(vehicle_id, HistoryQuery::default())
            .await
            .expect("history");
        let positions: Vec<(f64, f64)> = history
            .iter()
            .map(|entry| (entry.latitude, entry.longitude))
            .collect();
        assert_eq!(positions, vec![(1.0, 2.0), (3.0, 4.0)]);

        let state = store
            .find_vehicle_state(vehicle_id)
            .await
            .expect("state")
            .expect("vehicle");
        assert_eq!(state.latitude, Some(3.0));
        assert_eq!(state.speed, Some(20.0));
        assert_eq!(state.battery_level, Some(49.0));
        assert_eq!(state.updated_at_ms, Some(history[1].created_at_ms));
    }

    #[tokio::test]
    async fn storage_failure_acks_error_and_keeps_prior_state() {
        let (store, vehicle_id) = registered_store();
        assert_eq!(pipeline_with(&store).handle(b"AB123,1.0,2.0").await, Ack::Ok);

        let failing = TelemetryPipeline::new(
            DeviceLookup::new(store.clone()),
            StateReconciler::new(Arc::new(FailingStore)),
        );
        assert_eq!(failing.handle(b"AB123,5.0,6.0").await, Ack::Error);

        let state = store
            .find_vehicle_state(vehicle_id)
            .await
            .expect("state")
            .expect("vehicle");
        assert_eq!(state.latitude, Some(1.0));
        assert_eq!(store.history_len(), 1);
    }
}
