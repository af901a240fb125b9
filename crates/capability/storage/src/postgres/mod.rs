//! # PostgreSQL 存储实现模块
//!
//! 生产环境使用。表结构见 `migrations/0001_fleet_tracking.sql`，
//! 由仪表盘部署负责建表，监听服务从不执行 DDL。
//!
//! ## 包含的实现
//!
//! - **VehicleRegistry** (`registry.rs`)：按 IMEI 查找车辆，附带 `StorageHealth`
//! - **TelemetryStore** (`telemetry.rs`)：事务内追加 gps_logs 并更新 vehicles
//! - **TrackingReader** (`tracking.rs`)：实时地图、轨迹回放、最近记录
//!
//! ## 表
//!
//! - `vehicles`：车辆登记与当前状态（id, imei, plate_number, latitude, longitude,
//!   speed, battery_level, status, updated_at）
//! - `gps_logs`：轨迹历史（id, vehicle_id, latitude, longitude, speed,
//!   battery_level, created_at），索引 `(vehicle_id, created_at)`
//!
//! ## 事务
//!
//! 归并写入使用 `pool.begin()` + `select ... for update`，锁粒度为单个车辆行，
//! 不同车辆之间互不阻塞。
//!
//! ## 时间
//!
//! Rust 侧统一使用毫秒时间戳（i64），SQL 侧通过 `to_timestamp($n / 1000.0)`
//! 与 `extract(epoch from ..) * 1000` 转换。

pub mod registry;
pub mod telemetry;
pub mod tracking;

pub use registry::*;
pub use telemetry::*;
pub use tracking::*;
