pub mod data;

pub use data::{ProtocolTag, Reading, VehicleStatus};

/// 车辆内部标识（vehicles.id）。
pub type VehicleId = i64;

/// 登记表查找结果：设备 IMEI 对应的车辆身份。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VehicleRef {
    pub vehicle_id: VehicleId,
    pub imei: String,
}

impl VehicleRef {
    pub fn new(vehicle_id: VehicleId, imei: impl Into<String>) -> Self {
        Self {
            vehicle_id,
            imei: imei.into(),
        }
    }
}
