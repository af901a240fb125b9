//! 采集链路装配模块
//!
//! 把存储实现、设备查找、状态归并组装成协议层可调用的 `PacketHandler`，
//! 并把运行配置折算成监听器参数。

use fleet_config::AppConfig;
use fleet_pipeline::{DeviceLookup, StateReconciler, TelemetryPipeline};
use fleet_protocol::{PacketHandler, TcpServerConfig};
use fleet_storage::{PgTelemetryStore, PgVehicleRegistry, TelemetryStore, VehicleRegistry};
use sqlx::PgPool;
use std::sync::Arc;

/// 基于 Postgres 连接池构建采集流水线
pub fn build_pipeline(pool: PgPool) -> Arc<dyn PacketHandler> {
    let registry: Arc<dyn VehicleRegistry> = Arc::new(PgVehicleRegistry::new(pool.clone()));
    let store: Arc<dyn TelemetryStore> = Arc::new(PgTelemetryStore::new(pool));
    wire(registry, store)
}

/// 组装流水线（存储实现可替换，测试中使用内存存储）
pub fn wire(
    registry: Arc<dyn VehicleRegistry>,
    store: Arc<dyn TelemetryStore>,
) -> Arc<dyn PacketHandler> {
    Arc::new(TelemetryPipeline::new(
        DeviceLookup::new(registry),
        StateReconciler::new(store),
    ))
}

/// 运行配置 → 监听器配置
pub fn listener_config(config: &AppConfig) -> TcpServerConfig {
    TcpServerConfig {
        listen_addr: config.gps_addr.clone(),
        max_connections: config.max_connections,
        idle_timeout_secs: config.idle_timeout_seconds,
        write_timeout_secs: config.write_timeout_seconds,
        max_line_bytes: config.max_line_bytes,
        shutdown_grace_secs: config.shutdown_grace_seconds,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_protocol::Ack;
    use fleet_storage::InMemoryFleetStore;

    fn config() -> AppConfig {
        AppConfig {
            database_url: "postgres://localhost/fleet".to_string(),
            db_max_connections: 4,
            gps_addr: "127.0.0.1:3001".to_string(),
            max_connections: 32,
            idle_timeout_seconds: 60,
            write_timeout_seconds: 5,
            max_line_bytes: 256,
            shutdown_grace_seconds: 3,
        }
    }

    #[test]
    fn listener_config_follows_app_config() {
        let listener = listener_config(&config());
        assert_eq!(listener.listen_addr, "127.0.0.1:3001");
        assert_eq!(listener.max_connections, 32);
        assert_eq!(listener.idle_timeout_secs, 60);
        assert_eq!(listener.write_timeout_secs, 5);
        assert_eq!(listener.max_line_bytes, 256);
        assert_eq!(listener.shutdown_grace_secs, 3);
    }

    #[tokio::test]
    async fn wired_pipeline_acks_registered_devices() {
        let store = Arc::new(InMemoryFleetStore::new());
        store.register_vehicle("AB123", None).expect("register");
        let handler = wire(store.clone(), store.clone());

        assert_eq!(handler.handle(b"AB123,10.31,123.88").await, Ack::Ok);
        assert_eq!(handler.handle(b"ZZ999,10.31,123.88").await, Ack::Unregistered);
        assert_eq!(store.history_len(), 1);
    }
}
