//! TCP 监听器
//!
//! 绑定 GPS 端口，每个接入连接派生一个任务处理。
//!
//! ## 使用示例
//!
//! ```rust,ignore
//! let config = TcpServerConfig::from_json(r#"{"listen_addr": "0.0.0.0:3001"}"#)?;
//! let server = TcpServer::bind(config).await?;
//! server.run(handler, async { let _ = tokio::signal::ctrl_c().await; }).await?;
//! ```
//!
//! ## 准入与停机
//!
//! - 同时在线连接数受 `max_connections` 限制，超出的连接直接关闭
//! - 停机时先停止 accept，再通知所有连接；连接写完当前报文的应答后退出，
//!   超过 `shutdown_grace_secs` 仍未退出的连接被强制中止

use crate::connection::{ConnectionSettings, serve_connection};
use crate::error::ProtocolError;
use crate::types::PacketHandler;
use fleet_telemetry::record_connection_rejected;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{Semaphore, watch};
use tokio::task::JoinSet;
use tracing::{error, info, warn};

/// accept 失败后的退避间隔
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// TCP 监听配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TcpServerConfig {
    /// 监听地址
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    /// 最大并发连接数
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// 空闲读超时（秒）
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
    /// 应答写超时（秒）
    #[serde(default = "default_write_timeout")]
    pub write_timeout_secs: u64,
    /// 单行报文上限（字节）
    #[serde(default = "default_max_line_bytes")]
    pub max_line_bytes: usize,
    /// 停机排空窗口（秒）
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_secs: u64,
}

fn default_listen_addr() -> String {
    "0.0.0.0:3001".to_string()
}

fn default_max_connections() -> usize {
    1024
}

fn default_idle_timeout() -> u64 {
    300
}

fn default_write_timeout() -> u64 {
    10
}

fn default_max_line_bytes() -> usize {
    512
}

fn default_shutdown_grace() -> u64 {
    10
}

impl Default for TcpServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            max_connections: default_max_connections(),
            idle_timeout_secs: default_idle_timeout(),
            write_timeout_secs: default_write_timeout(),
            max_line_bytes: default_max_line_bytes(),
            shutdown_grace_secs: default_shutdown_grace(),
        }
    }
}

impl TcpServerConfig {
    /// 从 JSON 配置字符串解析
    pub fn from_json(json: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(json).map_err(|e| ProtocolError::ConfigParse(e.to_string()))
    }
}

/// GPS TCP 监听器
pub struct TcpServer {
    config: TcpServerConfig,
    listener: TcpListener,
}

impl TcpServer {
    /// 绑定端口；失败是监听器唯一的致命错误
    pub async fn bind(config: TcpServerConfig) -> Result<Self, ProtocolError> {
        let listener = TcpListener::bind(&config.listen_addr)
            .await
            .map_err(|source| ProtocolError::Bind {
                addr: config.listen_addr.clone(),
                source,
            })?;
        Ok(Self { config, listener })
    }

    /// 实际绑定地址（端口为 0 时由系统分配）
    pub fn local_addr(&self) -> Result<SocketAddr, ProtocolError> {
        Ok(self.listener.local_addr()?)
    }

    /// 运行 accept 循环，直到 `shutdown` 完成后排空连接
    pub async fn run<F>(self, handler: Arc<dyn PacketHandler>, shutdown: F) -> Result<(), ProtocolError>
    where
        F: Future<Output = ()> + Send,
    {
        let TcpServer { config, listener } = self;
        let addr = listener.local_addr()?;
        let settings = ConnectionSettings::from(&config);
        let permits = Arc::new(Semaphore::new(config.max_connections.max(1)));
        let (stop_tx, stop_rx) = watch::channel(false);
        let mut connections = JoinSet::new();

        info!(
            target: "fleet.listener",
            addr = %addr,
            max_connections = config.max_connections,
            "gps_listener_started"
        );

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                Some(joined) = connections.join_next(), if !connections.is_empty() => {
                    if let Err(err) = joined {
                        if err.is_panic() {
                            error!(target: "fleet.listener", error = %err, "connection_task_panicked");
                        }
                    }
                }
                accepted = listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(pair) => pair,
                        Err(err) => {
                            error!(target: "fleet.listener", error = %err, "accept_failed");
                            if accept_backoff(shutdown.as_mut(), ACCEPT_BACKOFF).await {
                                break;
                            }
                            continue;
                        }
                    };
                    let Ok(permit) = Arc::clone(&permits).try_acquire_owned() else {
                        record_connection_rejected();
                        warn!(target: "fleet.listener", peer = %peer, "connection_rejected_capacity");
                        drop(stream);
                        continue;
                    };
                    if let Err(err) = stream.set_nodelay(true) {
                        warn!(target: "fleet.listener", peer = %peer, error = %err, "set_nodelay_failed");
                    }
                    let handler = Arc::clone(&handler);
                    let stop_rx = stop_rx.clone();
                    connections.spawn(async move {
                        let _permit = permit;
                        let _ = serve_connection(stream, peer.to_string(), handler, settings, stop_rx).await;
                    });
                }
            }
        }

        // 停止接入，通知在途连接
        drop(listener);
        let _ = stop_tx.send(true);
        let active = connections.len();
        info!(target: "fleet.listener", active, "gps_listener_draining");

        let grace = Duration::from_secs(config.shutdown_grace_secs);
        let drained = tokio::time::timeout(grace, async {
            while connections.join_next().await.is_some() {}
        })
        .await;
        if drained.is_err() {
            warn!(
                target: "fleet.listener",
                remaining = connections.len(),
                "connection_drain_timeout"
            );
            connections.abort_all();
        }
        info!(target: "fleet.listener", "gps_listener_stopped");
        Ok(())
    }
}

/// 退避期间收到停机信号时返回 true
async fn accept_backoff<F>(shutdown: Pin<&mut F>, delay: Duration) -> bool
where
    F: Future<Output = ()>,
{
    tokio::select! {
        _ = shutdown => true,
        _ = tokio::time::sleep(delay) => false,
    }
}
