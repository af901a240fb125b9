//! 地图 / 回放读接口内存实现

use super::InMemoryFleetStore;
use crate::error::StorageError;
use crate::models::{HistoryQuery, HistoryRecord, LivePositionRecord, VehicleStateRecord};
use crate::traits::TrackingReader;
use domain::VehicleId;
use std::cmp::Reverse;

#[async_trait::async_trait]
impl TrackingReader for InMemoryFleetStore {
    async fn list_live_positions(&self) -> Result<Vec<LivePositionRecord>, StorageError> {
        let state = self.read()?;
        let mut items: Vec<LivePositionRecord> = state
            .vehicles
            .values()
            .map(|vehicle| {
                let latest = state
                    .logs
                    .iter()
                    .filter(|log| log.vehicle_id == vehicle.vehicle_id)
                    .max_by_key(|log| (log.created_at_ms, log.id));
                LivePositionRecord {
                    vehicle_id: vehicle.vehicle_id,
                    imei: vehicle.imei.clone(),
                    plate_number: vehicle.plate_number.clone(),
                    status: vehicle.status,
                    latitude: latest.map(|log| log.latitude),
                    longitude: latest.map(|log| log.longitude),
                    speed: latest.map(|log| log.speed),
                    battery_level: latest.and_then(|log| log.battery_level),
                    last_seen_at_ms: latest.map(|log| log.created_at_ms),
                }
            })
            .collect();
        items.sort_by_key(|item| item.vehicle_id);
        Ok(items)
    }

    async fn vehicle_history(
        &self,
        vehicle_id: VehicleId,
        query: HistoryQuery,
    ) -> Result<Vec<HistoryRecord>, StorageError> {
        let state = self.read()?;
        let mut items: Vec<HistoryRecord> = state
            .logs
            .iter()
            .filter(|log| log.vehicle_id == vehicle_id && query.contains(log.created_at_ms))
            .cloned()
            .collect();
        items.sort_by_key(|log| (log.created_at_ms, log.id));
        if let Some(limit) = query.limit {
            items.truncate(usize::try_from(limit.max(0)).unwrap_or(0));
        }
        Ok(items)
    }

    async fn recent_history(&self, limit: i64) -> Result<Vec<HistoryRecord>, StorageError> {
        let limit = usize::try_from(limit.max(0)).unwrap_or(0);
        let state = self.read()?;
        let mut items = state.logs.clone();
        items.sort_by_key(|log| Reverse((log.created_at_ms, log.id)));
        items.truncate(limit);
        Ok(items)
    }

    async fn find_vehicle_state(
        &self,
        vehicle_id: VehicleId,
    ) -> Result<Option<VehicleStateRecord>, StorageError> {
        let state = self.read()?;
        Ok(state.vehicles.get(&vehicle_id).cloned())
    }
}
