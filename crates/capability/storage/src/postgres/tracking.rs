//! Postgres 地图 / 回放查询

use crate::error::StorageError;
use crate::models::{HistoryQuery, HistoryRecord, LivePositionRecord, VehicleStateRecord};
use crate::traits::TrackingReader;
use domain::{VehicleId, VehicleStatus};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

pub struct PgTrackingReader {
    pub pool: PgPool,
}

impl PgTrackingReader {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const HISTORY_COLUMNS: &str = "id, vehicle_id, latitude, longitude, speed, battery_level, \
     (extract(epoch from created_at) * 1000)::bigint as created_at_ms";

fn history_from_row(row: &PgRow) -> Result<HistoryRecord, StorageError> {
    Ok(HistoryRecord {
        id: row.try_get("id")?,
        vehicle_id: row.try_get("vehicle_id")?,
        latitude: row.try_get("latitude")?,
        longitude: row.try_get("longitude")?,
        speed: row.try_get("speed")?,
        battery_level: row.try_get("battery_level")?,
        created_at_ms: row.try_get("created_at_ms")?,
    })
}

#[async_trait::async_trait]
impl TrackingReader for PgTrackingReader {
    async fn list_live_positions(&self) -> Result<Vec<LivePositionRecord>, StorageError> {
        let rows = sqlx::query(
            "select v.id as vehicle_id, v.imei, v.plate_number, v.status, \
             g.latitude, g.longitude, g.speed, g.battery_level, \
             (extract(epoch from g.created_at) * 1000)::bigint as last_seen_at_ms \
             from vehicles v \
             left join lateral ( \
                select latitude, longitude, speed, battery_level, created_at \
                from gps_logs \
                where vehicle_id = v.id \
                order by created_at desc, id desc \
                limit 1 \
             ) g on true \
             order by v.id",
        )
        .fetch_all(&self.pool)
        .await?;
        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            let status: String = row.try_get("status")?;
            items.push(LivePositionRecord {
                vehicle_id: row.try_get("vehicle_id")?,
                imei: row.try_get("imei")?,
                plate_number: row.try_get("plate_number")?,
                status: VehicleStatus::parse(&status),
                latitude: row.try_get("latitude")?,
                longitude: row.try_get("longitude")?,
                speed: row.try_get("speed")?,
                battery_level: row.try_get("battery_level")?,
                last_seen_at_ms: row.try_get("last_seen_at_ms")?,
            });
        }
        Ok(items)
    }

    async fn vehicle_history(
        &self,
        vehicle_id: VehicleId,
        query: HistoryQuery,
    ) -> Result<Vec<HistoryRecord>, StorageError> {
        let sql = format!(
            "select {HISTORY_COLUMNS} \
             from gps_logs \
             where vehicle_id = $1 \
             and ($2::bigint is null or created_at >= to_timestamp($2::bigint / 1000.0)) \
             and ($3::bigint is null or created_at <= to_timestamp($3::bigint / 1000.0)) \
             order by created_at asc, id asc \
             limit $4"
        );
        let rows = sqlx::query(&sql)
            .bind(vehicle_id)
            .bind(query.from_ms)
            .bind(query.to_ms)
            .bind(query.limit)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(history_from_row).collect()
    }

    async fn recent_history(&self, limit: i64) -> Result<Vec<HistoryRecord>, StorageError> {
        let limit = limit.max(0);
        if limit == 0 {
            return Ok(Vec::new());
        }
        let sql = format!(
            "select {HISTORY_COLUMNS} from gps_logs order by created_at desc, id desc limit $1"
        );
        let rows = sqlx::query(&sql).bind(limit).fetch_all(&self.pool).await?;
        rows.iter().map(history_from_row).collect()
    }

    async fn find_vehicle_state(
        &self,
        vehicle_id: VehicleId,
    ) -> Result<Option<VehicleStateRecord>, StorageError> {
        let row = sqlx::query(
            "select id, imei, plate_number, latitude, longitude, speed, battery_level, status, \
             (extract(epoch from updated_at) * 1000)::bigint as updated_at_ms \
             from vehicles where id = $1",
        )
        .bind(vehicle_id)
        .fetch_optional(&self.pool)
        .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let status: String = row.try_get("status")?;
        Ok(Some(VehicleStateRecord {
            vehicle_id: row.try_get("id")?,
            imei: row.try_get("imei")?,
            plate_number: row.try_get("plate_number")?,
            latitude: row.try_get("latitude")?,
            longitude: row.try_get("longitude")?,
            speed: row.try_get("speed")?,
            battery_level: row.try_get("battery_level")?,
            status: VehicleStatus::parse(&status),
            updated_at_ms: row.try_get("updated_at_ms")?,
        }))
    }
}
