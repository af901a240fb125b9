//! 内存存储实现模块
//!
//! 仅用于本地演示和测试。
//!
//! `InMemoryFleetStore` 同时实现：
//! - VehicleRegistry
//! - TelemetryStore
//! - TrackingReader
//! - StorageHealth
//!
//! vehicles 与 gps_logs 放在同一把 `RwLock` 下，归并写入在一个
//! 不含 `.await` 的临界区内完成，读者不会看到只写了一半的结果。

mod registry;
mod telemetry;
mod tracking;

use crate::error::StorageError;
use crate::models::{HistoryRecord, VehicleStateRecord};
use domain::{VehicleId, VehicleRef, VehicleStatus};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Default)]
struct FleetState {
    next_vehicle_id: VehicleId,
    next_log_id: i64,
    vehicles: HashMap<VehicleId, VehicleStateRecord>,
    imei_index: HashMap<String, VehicleId>,
    logs: Vec<HistoryRecord>,
}

/// 车队内存存储
pub struct InMemoryFleetStore {
    state: RwLock<FleetState>,
}

impl InMemoryFleetStore {
    /// 创建空存储
    pub fn new() -> Self {
        Self {
            state: RwLock::new(FleetState::default()),
        }
    }

    /// 登记车辆（模拟外部仪表盘的登记操作，用于测试与演示）
    pub fn register_vehicle(
        &self,
        imei: &str,
        plate_number: Option<&str>,
    ) -> Result<VehicleRef, StorageError> {
        let mut state = self.write()?;
        if state.imei_index.contains_key(imei) {
            return Err(StorageError::with_kind(
                crate::error::StorageErrorKind::Conflict,
                "imei exists",
            ));
        }
        state.next_vehicle_id += 1;
        let vehicle_id = state.next_vehicle_id;
        state.vehicles.insert(
            vehicle_id,
            VehicleStateRecord {
                vehicle_id,
                imei: imei.to_string(),
                plate_number: plate_number.map(str::to_string),
                latitude: None,
                longitude: None,
                speed: None,
                battery_level: None,
                status: VehicleStatus::Offline,
                updated_at_ms: None,
            },
        );
        state.imei_index.insert(imei.to_string(), vehicle_id);
        Ok(VehicleRef::new(vehicle_id, imei))
    }

    /// 历史记录总数（用于测试）
    pub fn history_len(&self) -> usize {
        self.state.read().map(|state| state.logs.len()).unwrap_or(0)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, FleetState>, StorageError> {
        self.state
            .read()
            .map_err(|_| StorageError::new("lock failed"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, FleetState>, StorageError> {
        self.state
            .write()
            .map_err(|_| StorageError::new("lock failed"))
    }
}

impl Default for InMemoryFleetStore {
    fn default() -> Self {
        Self::new()
    }
}
