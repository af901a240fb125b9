//! GPS 采集监听服务入口。
//!
//! 启动顺序：配置 → 日志 → 存储连通性检查 → 绑定端口 → 接入循环；
//! Ctrl-C 后停止接入并排空在途连接。

mod ingest;

use fleet_config::AppConfig;
use fleet_protocol::TcpServer;
use fleet_storage::{PgVehicleRegistry, StorageHealth, connect_pool};
use fleet_telemetry::{init_tracing, metrics};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 加载本地 .env（如存在），便于直接 cargo run 启动
    dotenvy::dotenv().ok();
    // 从环境变量加载运行配置
    let config = AppConfig::from_env()?;
    // 初始化结构化日志
    init_tracing();

    // 存储可用后才开始接入设备（需先执行 migrations）
    let pool = connect_pool(&config.database_url, config.db_max_connections).await?;
    PgVehicleRegistry::new(pool.clone()).ping().await?;
    info!(target: "fleet.listener", "storage_ready");

    let handler = ingest::build_pipeline(pool.clone());
    let server = TcpServer::bind(ingest::listener_config(&config)).await?;
    server.run(handler, shutdown_signal()).await?;

    let snapshot = metrics().snapshot();
    info!(
        target: "fleet.listener",
        packets_received = snapshot.packets_received,
        packets_acked = snapshot.packets_acked,
        connections_opened = snapshot.connections_opened,
        connections_rejected = snapshot.connections_rejected,
        "ingest_summary"
    );
    pool.close().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(target: "fleet.listener", error = %err, "shutdown_signal_failed");
        // 无法监听信号时保持运行，避免立即退出
        std::future::pending::<()>().await;
    }
    info!(target: "fleet.listener", "shutdown_requested");
}
