//! 设备登记查询
//!
//! 每条报文查询一次，不缓存、不重试，也不在查询与归并之间持有锁。

use domain::VehicleRef;
use fleet_storage::{StorageError, VehicleRegistry};
use std::sync::Arc;

/// 查询结果：未登记不是错误。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found(VehicleRef),
    NotFound,
}

/// 登记查询错误。
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("registry unavailable: {0}")]
    Storage(#[from] StorageError),
}

/// IMEI → 车辆身份
#[derive(Clone)]
pub struct DeviceLookup {
    registry: Arc<dyn VehicleRegistry>,
}

impl DeviceLookup {
    pub fn new(registry: Arc<dyn VehicleRegistry>) -> Self {
        Self { registry }
    }

    pub async fn resolve(&self, device_id: &str) -> Result<Resolution, LookupError> {
        let found = self.registry.find_by_imei(device_id).await?;
        Ok(found.map_or(Resolution::NotFound, Resolution::Found))
    }
}
