//! 存储接口 Trait 定义
//!
//! - VehicleRegistry：车辆登记只读查询（登记写入由外部仪表盘完成）
//! - TelemetryStore：状态更新 + 历史追加（原子）
//! - TrackingReader：对外暴露的地图 / 回放读接口
//! - StorageHealth：启动前连通性检查
//!
//! 设计原则：
//! - 所有接口返回 StorageError
//! - 使用 async_trait 支持动态分发

use crate::error::StorageError;
use crate::models::{
    HistoryQuery, HistoryRecord, LivePositionRecord, TelemetryWrite, VehicleStateRecord,
};
use async_trait::async_trait;
use domain::{VehicleId, VehicleRef};

/// 车辆登记查询接口
#[async_trait]
pub trait VehicleRegistry: Send + Sync {
    /// 根据 IMEI 查找车辆；未登记返回 None（不是错误）
    async fn find_by_imei(&self, imei: &str) -> Result<Option<VehicleRef>, StorageError>;
}

/// 采集写入接口
///
/// `apply_reading` 必须在同一事务作用域内完成两次写入：
/// 追加 gps_logs 记录，并把车辆状态更新为该读数（status = online）。
/// 失败时两者都不可见，已有状态保持不变。
#[async_trait]
pub trait TelemetryStore: Send + Sync {
    async fn apply_reading(&self, write: &TelemetryWrite) -> Result<(), StorageError>;
}

/// 地图与轨迹回放读接口
#[async_trait]
pub trait TrackingReader: Send + Sync {
    /// 所有登记车辆及其最近一条轨迹（实时地图）
    async fn list_live_positions(&self) -> Result<Vec<LivePositionRecord>, StorageError>;

    /// 指定车辆在时间区间内的轨迹，按 created_at 升序（轨迹回放）
    async fn vehicle_history(
        &self,
        vehicle_id: VehicleId,
        query: HistoryQuery,
    ) -> Result<Vec<HistoryRecord>, StorageError>;

    /// 全部车辆最近的轨迹记录，按 created_at 降序
    async fn recent_history(&self, limit: i64) -> Result<Vec<HistoryRecord>, StorageError>;

    /// 车辆当前状态
    async fn find_vehicle_state(
        &self,
        vehicle_id: VehicleId,
    ) -> Result<Option<VehicleStateRecord>, StorageError>;
}

/// 存储连通性检查
#[async_trait]
pub trait StorageHealth: Send + Sync {
    async fn ping(&self) -> Result<(), StorageError>;
}
