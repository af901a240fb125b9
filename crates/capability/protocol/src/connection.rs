//! 单连接处理
//!
//! 状态机：`Connected → Reading → Connected … → Disconnected`。
//!
//! - 读到的字节交给 `LineFramer` 分帧，半行跨读取缓存
//! - 每个完整报文调用一次 `PacketHandler`，应答写回后才处理下一条
//! - 空闲读超时、应答写超时、套接字错误、对端关闭都只结束本连接
//! - 收到停机信号后，正在处理的报文写完应答再关闭

use crate::error::ConnectionError;
use crate::framing::{Frame, LineFramer};
use crate::tcp_server::TcpServerConfig;
use crate::types::{Ack, PacketHandler};
use fleet_telemetry::{
    new_connection_id, record_connection_closed, record_connection_opened, record_idle_timeout,
    record_rejected_oversized,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::watch;
use tokio::time::timeout;
use tracing::{Instrument, debug, info, warn};

const READ_CHUNK: usize = 1024;

/// 连接级参数
#[derive(Debug, Clone, Copy)]
pub struct ConnectionSettings {
    pub idle_timeout: Duration,
    pub write_timeout: Duration,
    pub max_line_bytes: usize,
}

impl From<&TcpServerConfig> for ConnectionSettings {
    fn from(config: &TcpServerConfig) -> Self {
        Self {
            idle_timeout: Duration::from_secs(config.idle_timeout_secs.max(1)),
            write_timeout: Duration::from_secs(config.write_timeout_secs.max(1)),
            max_line_bytes: config.max_line_bytes,
        }
    }
}

/// 正常结束原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disconnect {
    PeerClosed,
    Shutdown,
}

impl Disconnect {
    fn as_str(&self) -> &'static str {
        match self {
            Self::PeerClosed => "peer_closed",
            Self::Shutdown => "shutdown",
        }
    }
}

/// 处理一个设备连接直到断开
///
/// 所有错误在这里记录并吞掉，不会传播到监听器或其他连接。
pub async fn serve_connection<S>(
    stream: S,
    peer: String,
    handler: Arc<dyn PacketHandler>,
    settings: ConnectionSettings,
    mut shutdown: watch::Receiver<bool>,
) -> Result<Disconnect, ConnectionError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    let connection_id = new_connection_id();
    let span = tracing::info_span!("connection", connection_id = %connection_id, peer = %peer);

    async move {
        record_connection_opened();
        info!(target: "fleet.listener", "connection_opened");

        let result = drive(stream, handler.as_ref(), settings, &mut shutdown).await;
        match &result {
            Ok(reason) => {
                info!(target: "fleet.listener", reason = reason.as_str(), "connection_closed");
            }
            Err(ConnectionError::Timeout(idle)) => {
                record_idle_timeout();
                warn!(target: "fleet.listener", idle = ?idle, "connection_idle_timeout");
            }
            Err(err) => {
                warn!(target: "fleet.listener", error = %err, "connection_failed");
            }
        }
        record_connection_closed();
        result
    }
    .instrument(span)
    .await
}

async fn drive<S>(
    mut stream: S,
    handler: &dyn PacketHandler,
    settings: ConnectionSettings,
    shutdown: &mut watch::Receiver<bool>,
) -> Result<Disconnect, ConnectionError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    let mut framer = LineFramer::new(settings.max_line_bytes);
    let mut buf = vec![0u8; READ_CHUNK];

    loop {
        while let Some(frame) = framer.next_frame() {
            let ack = process_frame(handler, frame).await;
            write_ack(&mut stream, ack, settings.write_timeout).await?;
            if *shutdown.borrow() {
                return Ok(Disconnect::Shutdown);
            }
        }

        let read = tokio::select! {
            biased;
            _ = shutdown.changed() => return Ok(Disconnect::Shutdown),
            read = timeout(settings.idle_timeout, stream.read(&mut buf)) => read,
        };

        let n = match read {
            Ok(Ok(n)) => n,
            Ok(Err(err)) => return Err(ConnectionError::Io(err)),
            Err(_) => return Err(ConnectionError::Timeout(settings.idle_timeout)),
        };

        if n == 0 {
            // 对端半关闭前发出的最后一行可能没有换行
            if let Some(frame) = framer.finish() {
                let ack = process_frame(handler, frame).await;
                if let Err(err) = write_ack(&mut stream, ack, settings.write_timeout).await {
                    debug!(target: "fleet.listener", error = %err, "final_ack_not_delivered");
                }
            }
            return Ok(Disconnect::PeerClosed);
        }
        framer.push(&buf[..n]);
    }
}

async fn process_frame(handler: &dyn PacketHandler, frame: Frame) -> Ack {
    match frame {
        Frame::Line(line) => handler.handle(&line).await,
        Frame::Oversized => {
            record_rejected_oversized();
            warn!(target: "fleet.listener", "packet_oversized");
            Ack::Error
        }
    }
}

async fn write_ack<S>(stream: &mut S, ack: Ack, limit: Duration) -> Result<(), ConnectionError>
where
    S: AsyncWrite + Unpin,
{
    let write = async {
        stream.write_all(ack.line().as_bytes()).await?;
        stream.flush().await
    };
    match timeout(limit, write).await {
        Ok(result) => result.map_err(ConnectionError::Io),
        Err(_) => Err(ConnectionError::WriteTimeout(limit)),
    }
}
