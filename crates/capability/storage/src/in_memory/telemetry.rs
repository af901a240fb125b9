//! 归并写入内存实现

use super::InMemoryFleetStore;
use crate::error::StorageError;
use crate::models::{HistoryRecord, TelemetryWrite};
use crate::traits::TelemetryStore;
use domain::VehicleStatus;

#[async_trait::async_trait]
impl TelemetryStore for InMemoryFleetStore {
    async fn apply_reading(&self, write: &TelemetryWrite) -> Result<(), StorageError> {
        let mut guard = self.write()?;
        let state = &mut *guard;
        // 先确认车辆存在，再动任何一边
        let Some(vehicle) = state.vehicles.get_mut(&write.vehicle_id) else {
            return Err(StorageError::vehicle_not_found(write.vehicle_id));
        };

        state.next_log_id += 1;
        state.logs.push(HistoryRecord {
            id: state.next_log_id,
            vehicle_id: write.vehicle_id,
            latitude: write.latitude,
            longitude: write.longitude,
            speed: write.speed,
            battery_level: write.battery_level,
            created_at_ms: write.ingested_at_ms,
        });

        vehicle.latitude = Some(write.latitude);
        vehicle.longitude = Some(write.longitude);
        vehicle.speed = Some(write.speed);
        vehicle.battery_level = write.battery_level;
        vehicle.status = VehicleStatus::Online;
        vehicle.updated_at_ms = Some(write.ingested_at_ms);
        Ok(())
    }
}
