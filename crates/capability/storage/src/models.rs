//! 数据模型
//!
//! - 车辆当前状态：VehicleStateRecord（vehicles 表，登记由外部完成）
//! - 轨迹历史：HistoryRecord（gps_logs 表，只追加）
//! - 归并写入输入：TelemetryWrite
//! - 地图读模型：LivePositionRecord
//! - 回放查询参数：HistoryQuery

use domain::{VehicleId, VehicleStatus};
use serde::{Serialize, Serializer};

fn serialize_status<S: Serializer>(status: &VehicleStatus, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(status.as_str())
}

/// 车辆当前状态（每个 IMEI 至多一条）。
///
/// 位置相关字段在车辆首次上报前为空。
#[derive(Debug, Clone, Serialize)]
pub struct VehicleStateRecord {
    pub vehicle_id: VehicleId,
    pub imei: String,
    pub plate_number: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub speed: Option<f64>,
    pub battery_level: Option<f64>,
    #[serde(serialize_with = "serialize_status")]
    pub status: VehicleStatus,
    pub updated_at_ms: Option<i64>,
}

/// 轨迹历史记录（写入后不可变）。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryRecord {
    /// 插入序号，同一毫秒内的排序依据
    pub id: i64,
    pub vehicle_id: VehicleId,
    pub latitude: f64,
    pub longitude: f64,
    pub speed: f64,
    pub battery_level: Option<f64>,
    /// 服务端接收时间（毫秒）
    pub created_at_ms: i64,
}

/// 一次归并写入：状态更新与历史追加共用同一个接收时间。
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryWrite {
    pub vehicle_id: VehicleId,
    pub latitude: f64,
    pub longitude: f64,
    pub speed: f64,
    pub battery_level: Option<f64>,
    pub ingested_at_ms: i64,
}

/// 实时地图行：车辆状态 + 最近一条历史记录。
#[derive(Debug, Clone, Serialize)]
pub struct LivePositionRecord {
    pub vehicle_id: VehicleId,
    pub imei: String,
    pub plate_number: Option<String>,
    #[serde(serialize_with = "serialize_status")]
    pub status: VehicleStatus,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub speed: Option<f64>,
    pub battery_level: Option<f64>,
    pub last_seen_at_ms: Option<i64>,
}

/// 轨迹回放查询参数（时间区间闭区间，升序返回）。
#[derive(Debug, Clone, Copy, Default)]
pub struct HistoryQuery {
    pub from_ms: Option<i64>,
    pub to_ms: Option<i64>,
    pub limit: Option<i64>,
}

impl HistoryQuery {
    pub fn between(from_ms: i64, to_ms: i64) -> Self {
        Self {
            from_ms: Some(from_ms),
            to_ms: Some(to_ms),
            limit: None,
        }
    }

    pub fn contains(&self, ts_ms: i64) -> bool {
        self.from_ms.is_none_or(|from| ts_ms >= from) && self.to_ms.is_none_or(|to| ts_ms <= to)
    }
}
