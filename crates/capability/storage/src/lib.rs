//! # Fleet Storage 模块
//!
//! GPS 采集链路的存储抽象层。
//!
//! ## 架构设计
//!
//! 1. **接口抽象层** (`traits.rs`)：登记查询、归并写入、地图/回放读取、健康检查
//! 2. **数据模型层** (`models.rs`)：车辆状态、轨迹历史、写入输入、读模型
//! 3. **错误处理层** (`error.rs`)：统一的存储错误类型
//! 4. **连接管理层** (`connection.rs`)：数据库连接池管理
//! 5. **实现层**：
//!    - `in_memory/`：内存存储实现（用于测试和演示）
//!    - `postgres/`：PostgreSQL 存储实现（生产环境使用）
//!
//! ## 一致性约束
//!
//! - 车辆状态（vehicles）是最新投影，轨迹（gps_logs）是只追加的事件流
//! - 一次读数要么同时体现在两者中，要么都不体现
//! - 同一车辆的归并写入串行化；不同车辆之间没有全局锁
//! - 采集链路只读登记表，从不新增或删除车辆
//!
//! ## 使用示例
//!
//! ```rust,ignore
//! use fleet_storage::{InMemoryFleetStore, VehicleRegistry};
//!
//! let store = InMemoryFleetStore::new();
//! store.register_vehicle("AB123", Some("ABC-1234"))?;
//! let vehicle = store.find_by_imei("AB123").await?;
//! ```

pub mod connection;
pub mod error;
pub mod in_memory;
pub mod models;
pub mod postgres;
pub mod traits;

pub use connection::*;
pub use error::*;
pub use models::*;
pub use traits::*;

pub use in_memory::InMemoryFleetStore;
pub use postgres::{PgTelemetryStore, PgTrackingReader, PgVehicleRegistry};
