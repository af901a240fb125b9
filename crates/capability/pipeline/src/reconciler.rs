//! 状态归并
//!
//! 一条读数同时产生两次写入：追加轨迹、覆盖车辆状态。两次写入共用
//! 同一个接收时间戳，由 `TelemetryStore::apply_reading` 在一个事务内完成。

use domain::{Reading, VehicleRef};
use fleet_storage::{StorageError, TelemetryStore, TelemetryWrite};
use std::sync::Arc;

/// 接收时间来源。
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

/// 系统时钟（epoch 毫秒）。
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        let duration = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default();
        duration.as_millis() as i64
    }
}

/// 归并结果。
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled {
    pub vehicle: VehicleRef,
    pub ingested_at_ms: i64,
}

/// 归并错误；不重试。
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("reconcile failed: {0}")]
    Storage(#[from] StorageError),
}

#[derive(Clone)]
pub struct StateReconciler {
    store: Arc<dyn TelemetryStore>,
    clock: Arc<dyn Clock>,
}

impl StateReconciler {
    pub fn new(store: Arc<dyn TelemetryStore>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    pub fn with_clock(store: Arc<dyn TelemetryStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub async fn reconcile(
        &self,
        vehicle: &VehicleRef,
        reading: &Reading,
    ) -> Result<Reconciled, ReconcileError> {
        let ingested_at_ms = self.clock.now_ms();
        let write = TelemetryWrite {
            vehicle_id: vehicle.vehicle_id,
            latitude: reading.latitude,
            longitude: reading.longitude,
            speed: reading.speed,
            battery_level: reading.battery_level,
            ingested_at_ms,
        };
        self.store.apply_reading(&write).await?;
        Ok(Reconciled {
            vehicle: vehicle.clone(),
            ingested_at_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{ProtocolTag, VehicleStatus};
    use fleet_storage::{HistoryQuery, InMemoryFleetStore, StorageErrorKind, TrackingReader};

    struct FixedClock(i64);

    impl Clock for FixedClock {
        fn now_ms(&self) -> i64 {
            self.0
        }
    }

    fn reading(latitude: f64, longitude: f64) -> Reading {
        Reading {
            device_id: "AB123".to_string(),
            latitude,
            longitude,
            speed: 42.5,
            battery_level: Some(87.0),
            protocol_tag: ProtocolTag::CsvV2,
        }
    }

    #[tokio::test]
    async fn state_and_history_share_one_timestamp() {
        let store = Arc::new(InMemoryFleetStore::new());
        let vehicle = store.register_vehicle("AB123", None).expect("register");
        let reconciler = StateReconciler::with_clock(store.clone(), Arc::new(FixedClock(1_000)));

        let reconciled = reconciler
            .reconcile(&vehicle, &reading(10.31, 123.88))
            .await
            .expect("reconcile");
        assert_eq!(reconciled.ingested_at_ms, 1_000);

        let state = store
            .find_vehicle_state(vehicle.vehicle_id)
            .await
            .expect("state")
            .expect("vehicle");
        assert_eq!(state.status, VehicleStatus::Online);
        assert_eq!(state.latitude, Some(10.31));
        assert_eq!(state.battery_level, Some(87.0));
        assert_eq!(state.updated_at_ms, Some(1_000));

        let history = store
            .vehicle_history(vehicle.vehicle_id, HistoryQuery::default())
            .await
            .expect("history");
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].created_at_ms, 1_000);
    }

    #[tokio::test]
    async fn missing_vehicle_writes_nothing() {
        let store = Arc::new(InMemoryFleetStore::new());
        let reconciler = StateReconciler::with_clock(store.clone(), Arc::new(FixedClock(1)));
        let ghost = VehicleRef::new(77, "GHOST");

        let err = reconciler
            .reconcile(&ghost, &reading(1.0, 2.0))
            .await
            .unwrap_err();
        let ReconcileError::Storage(storage) = err;
        assert_eq!(storage.kind(), StorageErrorKind::VehicleNotFound);
        assert_eq!(store.history_len(), 0);
    }
}
