//! Postgres 归并写入实现
//!
//! 单个事务内：
//! 1. `select ... for update` 锁住该车辆行（同一车辆的并发写入串行化）
//! 2. 追加 gps_logs
//! 3. 更新 vehicles 当前状态
//!
//! 任一步失败时事务随 `tx` 一起丢弃（回滚），原状态不变。

use crate::error::StorageError;
use crate::models::TelemetryWrite;
use crate::traits::TelemetryStore;
use sqlx::PgPool;

pub struct PgTelemetryStore {
    pub pool: PgPool,
}

impl PgTelemetryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl TelemetryStore for PgTelemetryStore {
    async fn apply_reading(&self, write: &TelemetryWrite) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await?;

        let locked = sqlx::query("select id from vehicles where id = $1 for update")
            .bind(write.vehicle_id)
            .fetch_optional(&mut *tx)
            .await?;
        if locked.is_none() {
            return Err(StorageError::vehicle_not_found(write.vehicle_id));
        }

        sqlx::query(
            "insert into gps_logs (vehicle_id, latitude, longitude, speed, battery_level, created_at) \
             values ($1, $2, $3, $4, $5, to_timestamp($6 / 1000.0))",
        )
        .bind(write.vehicle_id)
        .bind(write.latitude)
        .bind(write.longitude)
        .bind(write.speed)
        .bind(write.battery_level)
        .bind(write.ingested_at_ms as f64)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "update vehicles set \
             latitude = $1, \
             longitude = $2, \
             speed = $3, \
             battery_level = $4, \
             status = 'online', \
             updated_at = to_timestamp($5 / 1000.0) \
             where id = $6",
        )
        .bind(write.latitude)
        .bind(write.longitude)
        .bind(write.speed)
        .bind(write.battery_level)
        .bind(write.ingested_at_ms as f64)
        .bind(write.vehicle_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }
}
