//! # 采集流水线
//!
//! 把协议层交来的一行报文变成一次车辆状态更新：
//!
//! - `lookup`：IMEI → 车辆身份（只读，每条报文一次）
//! - `reconciler`：状态覆盖 + 轨迹追加（同一事务、同一时间戳）
//! - `service`：`TelemetryPipeline`，串起解码、查询、归并并产出应答

pub mod lookup;
pub mod reconciler;
pub mod service;

pub use lookup::{DeviceLookup, LookupError, Resolution};
pub use reconciler::{Clock, ReconcileError, Reconciled, StateReconciler, SystemClock};
pub use service::TelemetryPipeline;
