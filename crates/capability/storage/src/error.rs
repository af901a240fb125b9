//! 存储层错误类型
//!
//! 封装底层错误，调用方只依赖 `kind()` 做分支：
//! - 后端执行错误（SQL、连接池）
//! - 目标车辆不存在（登记已被外部删除）
//! - 唯一约束冲突（IMEI 重复登记）

/// 存储错误分类。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageErrorKind {
    Backend,
    VehicleNotFound,
    Conflict,
}

#[derive(Debug)]
pub struct StorageError {
    kind: StorageErrorKind,
    message: String,
}

impl StorageError {
    pub fn new(message: impl Into<String>) -> Self {
        Self::with_kind(StorageErrorKind::Backend, message)
    }

    pub fn with_kind(kind: StorageErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn vehicle_not_found(vehicle_id: domain::VehicleId) -> Self {
        Self::with_kind(
            StorageErrorKind::VehicleNotFound,
            format!("vehicle {vehicle_id} not found"),
        )
    }

    pub fn kind(&self) -> StorageErrorKind {
        self.kind
    }
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for StorageError {}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        let kind = match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => StorageErrorKind::Conflict,
            _ => StorageErrorKind::Backend,
        };
        Self::with_kind(kind, err.to_string())
    }
}
