//! Postgres 车辆登记查询
//!
//! 只读：登记、改绑 IMEI 由外部仪表盘完成。

use crate::error::StorageError;
use crate::traits::{StorageHealth, VehicleRegistry};
use domain::VehicleRef;
use sqlx::{PgPool, Row};

pub struct PgVehicleRegistry {
    pub pool: PgPool,
}

impl PgVehicleRegistry {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl VehicleRegistry for PgVehicleRegistry {
    async fn find_by_imei(&self, imei: &str) -> Result<Option<VehicleRef>, StorageError> {
        let row = sqlx::query("select id, imei from vehicles where imei = $1")
            .bind(imei)
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some(VehicleRef {
            vehicle_id: row.try_get("id")?,
            imei: row.try_get("imei")?,
        }))
    }
}

#[async_trait::async_trait]
impl StorageHealth for PgVehicleRegistry {
    async fn ping(&self) -> Result<(), StorageError> {
        sqlx::query("select 1").execute(&self.pool).await?;
        Ok(())
    }
}
